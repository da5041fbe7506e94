use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use data_encoding::HEXLOWER;
use rocket::serde::json::{serde_json, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kinds of bulletin board entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    ElectionCreated,
    ElectionUpdated,
    StatusChanged,
    ElectionClosed,
    CandidateAdded,
    CandidatesReordered,
    TrusteeAdded,
    TrusteeRemoved,
    KeyGenerated,
    BallotCast,
    TrusteeShare,
    ResultPublished,
}

impl EntryType {
    pub const ALL: [EntryType; 12] = [
        EntryType::ElectionCreated,
        EntryType::ElectionUpdated,
        EntryType::StatusChanged,
        EntryType::ElectionClosed,
        EntryType::CandidateAdded,
        EntryType::CandidatesReordered,
        EntryType::TrusteeAdded,
        EntryType::TrusteeRemoved,
        EntryType::KeyGenerated,
        EntryType::BallotCast,
        EntryType::TrusteeShare,
        EntryType::ResultPublished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElectionCreated => "ELECTION_CREATED",
            Self::ElectionUpdated => "ELECTION_UPDATED",
            Self::StatusChanged => "STATUS_CHANGED",
            Self::ElectionClosed => "ELECTION_CLOSED",
            Self::CandidateAdded => "CANDIDATE_ADDED",
            Self::CandidatesReordered => "CANDIDATES_REORDERED",
            Self::TrusteeAdded => "TRUSTEE_ADDED",
            Self::TrusteeRemoved => "TRUSTEE_REMOVED",
            Self::KeyGenerated => "KEY_GENERATED",
            Self::BallotCast => "BALLOT_CAST",
            Self::TrusteeShare => "TRUSTEE_SHARE",
            Self::ResultPublished => "RESULT_PUBLISHED",
        }
    }

    /// May collaborators outside the coordinator append entries of this type?
    pub fn is_external(&self) -> bool {
        *self == Self::BallotCast
    }
}

impl Display for EntryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|entry_type| entry_type.as_str() == s)
            .ok_or_else(|| format!("Unknown entry type '{s}'"))
    }
}

/// An event waiting to be sealed onto the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletinEvent {
    pub entry_type: EntryType,
    pub data: Value,
}

impl BulletinEvent {
    pub fn new(entry_type: EntryType, data: Value) -> Self {
        Self { entry_type, data }
    }
}

/// A single sealed entry on an election's bulletin board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletinEntry {
    /// Position in the chain, starting at 1.
    pub seq: u64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Lowercase hex SHA-256 of the canonical form of this entry.
    pub hash: String,
    /// Hash of the preceding entry, `None` for the first.
    pub prev: Option<String>,
    /// Opaque event payload.
    pub data: Value,
    pub time: DateTime<Utc>,
}

impl BulletinEntry {
    /// Recompute this entry's hash from its own fields.
    pub fn recompute_hash(&self) -> String {
        compute_hash(
            self.seq,
            self.entry_type,
            &self.data,
            self.prev.as_deref(),
            &self.time,
        )
    }
}

/// The canonical string hashed for an entry.
///
/// Fields appear in a fixed order, object keys inside `data` are sorted at
/// every depth, and `time` is rendered as RFC 3339 UTC with milliseconds.
pub fn canonical_json(
    seq: u64,
    entry_type: EntryType,
    data: &Value,
    prev: Option<&str>,
    time: &DateTime<Utc>,
) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("{\"seq\":");
    out.push_str(&seq.to_string());
    out.push_str(",\"type\":");
    push_string(&mut out, entry_type.as_str());
    out.push_str(",\"data\":");
    push_sorted(&mut out, data);
    out.push_str(",\"prev\":");
    match prev {
        Some(prev) => push_string(&mut out, prev),
        None => out.push_str("null"),
    }
    out.push_str(",\"time\":");
    push_string(&mut out, &time.to_rfc3339_opts(SecondsFormat::Millis, true));
    out.push('}');
    out
}

/// SHA-256 over [`canonical_json`], as lowercase hex.
pub fn compute_hash(
    seq: u64,
    entry_type: EntryType,
    data: &Value,
    prev: Option<&str>,
    time: &DateTime<Utc>,
) -> String {
    let canonical = canonical_json(seq, entry_type, data, prev, time);
    HEXLOWER.encode(&Sha256::digest(canonical.as_bytes()))
}

fn push_string(out: &mut String, s: &str) {
    // Serialising a `str` cannot fail.
    out.push_str(&Value::String(s.to_owned()).to_string());
}

fn push_sorted(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_string(out, key);
                out.push(':');
                push_sorted(out, &map[key.as_str()]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_sorted(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar).unwrap_or_default()),
    }
}
