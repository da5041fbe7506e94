mod status;

pub use status::{check_transition, ensure_permitted, ElectionStatus, Initiator, Operation};

/// Our election IDs are [`crate::model::mongodb::Id`]s.
pub type ElectionId = crate::model::mongodb::Id;
/// Our trustee IDs are [`crate::model::mongodb::Id`]s.
pub type TrusteeId = crate::model::mongodb::Id;
/// Our candidate IDs are [`crate::model::mongodb::Id`]s.
pub type CandidateId = crate::model::mongodb::Id;
