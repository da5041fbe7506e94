pub use db::ElectionRecord;
pub use election_core::{Candidate, Election};
pub use spec::{ElectionSpec, ElectionUpdate};

mod db;
mod election_core;
mod spec;
