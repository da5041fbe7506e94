//! A simple CLI tool for verifying SecureVote bulletin boards offline.
//! This uses the internal server verification implementation, and is by definition
//! compatible with the output of our API endpoints.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use securevote_backend::model::bulletin::{verify_chain, BulletinEntry, EntryType};

const PROGRAM_NAME: &str = "verify-bulletin";

const ABOUT_TEXT: &str = "Verify the integrity of a SecureVote bulletin board.

EXIT CODES:
     0: Verification succeeded.
   255: Ran successfully, but verification failed.
 Other: Error.";

const CHAIN_PATH: &str = "CHAIN_PATH";

const CHAIN_PATH_HELP: &str = "The path to a JSON dump of an election's bulletin board,\n\
as returned by `GET /api/bulletin/<election_id>/chain`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(CHAIN_PATH)
            .help(CHAIN_PATH_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// Verification failed for the contained reason.
    Verification(String),
}

/// How many entries of one type a verified chain holds.
#[derive(Debug, Eq, PartialEq)]
struct EntryCount {
    pub entry_type: EntryType,
    pub count: usize,
}

impl Display for EntryCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} entr{}",
            self.entry_type,
            self.count,
            if self.count != 1 { "ies" } else { "y" }
        )
    }
}

/// Load and verify a chain dump, summarising its contents on success.
fn verify(path: &str) -> Result<Vec<EntryCount>, Error> {
    let file = File::open(path).map_err(|err| Error::IO(err.to_string()))?;
    let entries: Vec<BulletinEntry> = serde_json::from_reader(BufReader::new(file))
        .map_err(|err| Error::Format(err.to_string()))?;

    let verification = verify_chain(&entries);
    if !verification.valid {
        return Err(Error::Verification(
            verification
                .message
                .unwrap_or_else(|| "unknown failure".to_string()),
        ));
    }

    Ok(EntryType::ALL
        .iter()
        .map(|&entry_type| EntryCount {
            entry_type,
            count: entries.iter().filter(|e| e.entry_type == entry_type).count(),
        })
        .filter(|c| c.count > 0)
        .collect())
}

/// Run verification, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(CHAIN_PATH).unwrap(); // Required argument is guaranteed to be present.
    match verify(path) {
        Ok(counts) => {
            let total: usize = counts.iter().map(|c| c.count).sum();
            println!("Verification succeeded: {total} entries, hash chain intact.");
            for count in counts {
                println!("{}", count);
            }
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {}", msg);
            1
        }
        Err(Error::Verification(msg)) => {
            println!("Verification failed: {}", msg);
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
