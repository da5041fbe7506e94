use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::Conflict;

/// States in the Election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Under construction; details, candidates and trustees are editable.
    Draft,
    /// Open for voting.
    Active,
    /// Voting has ended, awaiting decryption shares and the tally.
    Closed,
    /// Results have been computed and published. Terminal.
    Tallied,
}

impl ElectionStatus {
    pub const ALL: [ElectionStatus; 4] = [
        ElectionStatus::Draft,
        ElectionStatus::Active,
        ElectionStatus::Closed,
        ElectionStatus::Tallied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Closed => "CLOSED",
            Self::Tallied => "TALLIED",
        }
    }

    /// Is this status terminal, i.e. can nothing ever leave it?
    pub fn is_terminal(&self) -> bool {
        *self == Self::Tallied
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is asking for a status change.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Initiator {
    /// An administrator via `setStatus`.
    Admin,
    /// The tally orchestrator, after a successful tally.
    Tally,
}

/// One cell of the transition table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Rule {
    /// Same status; never a legal transition.
    NoOp,
    /// Always legal.
    Allow,
    /// Legal only while no key material has been generated.
    AllowBeforeKeys,
    /// Only the tally orchestrator may take this edge.
    TallyOnly,
    /// Never legal.
    Deny,
}

/// The transition table, indexed by `[from][to]` in `ElectionStatus::ALL` order.
///
/// Backward moves to DRAFT are blocked once trustees hold key shares, and
/// nothing leaves TALLIED.
const TRANSITIONS: [[Rule; 4]; 4] = {
    use Rule::*;
    [
        // to:   DRAFT            ACTIVE  CLOSED  TALLIED
        /* DRAFT   */ [NoOp, Allow, Allow, TallyOnly],
        /* ACTIVE  */ [AllowBeforeKeys, NoOp, Allow, TallyOnly],
        /* CLOSED  */ [AllowBeforeKeys, Allow, NoOp, TallyOnly],
        /* TALLIED */ [Deny, Deny, Deny, NoOp],
    ]
};

fn index(status: ElectionStatus) -> usize {
    match status {
        ElectionStatus::Draft => 0,
        ElectionStatus::Active => 1,
        ElectionStatus::Closed => 2,
        ElectionStatus::Tallied => 3,
    }
}

/// Check whether `from -> to` is legal for the given initiator.
pub fn check_transition(
    from: ElectionStatus,
    to: ElectionStatus,
    initiator: Initiator,
    keys_generated: bool,
) -> Result<(), Conflict> {
    let illegal = || Conflict::IllegalTransition { from, to };
    match TRANSITIONS[index(from)][index(to)] {
        Rule::NoOp => Err(Conflict::NoOpTransition(from)),
        Rule::Allow => Ok(()),
        Rule::AllowBeforeKeys if !keys_generated => Ok(()),
        Rule::AllowBeforeKeys => Err(illegal()),
        Rule::TallyOnly if initiator == Initiator::Tally => Ok(()),
        Rule::TallyOnly | Rule::Deny => Err(illegal()),
    }
}

/// Mutating operations gated on the election status.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    EditElection,
    EditCandidates,
    EditRoster,
    KeyCeremony,
    SubmitShare,
    RecordBallot,
    Tally,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EditElection => "edit election",
            Self::EditCandidates => "edit candidates",
            Self::EditRoster => "edit trustee roster",
            Self::KeyCeremony => "run key ceremony",
            Self::SubmitShare => "submit decryption share",
            Self::RecordBallot => "record ballot",
            Self::Tally => "tally",
        };
        f.write_str(name)
    }
}

impl Operation {
    /// Statuses in which this operation may run.
    fn permitted_in(&self, status: ElectionStatus) -> bool {
        use ElectionStatus::*;
        match self {
            Self::EditElection => status == Draft,
            Self::EditCandidates => matches!(status, Draft | Active),
            Self::RecordBallot => status == Active,
            // Decryption only once voting has ended.
            Self::SubmitShare | Self::Tally => status == Closed,
            Self::EditRoster | Self::KeyCeremony => !status.is_terminal(),
        }
    }
}

/// Check that `operation` may run while the election is in `status`.
///
/// Operations refused on a tallied election report `AlreadyTallied`.
pub fn ensure_permitted(operation: Operation, status: ElectionStatus) -> Result<(), Conflict> {
    if operation.permitted_in(status) {
        Ok(())
    } else if status.is_terminal() {
        Err(Conflict::AlreadyTallied)
    } else {
        Err(Conflict::NotPermitted { operation, status })
    }
}
