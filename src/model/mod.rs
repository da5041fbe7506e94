pub mod api;
pub mod bulletin;
pub mod common;
pub mod election;
pub mod mongodb;
pub mod tally;
pub mod trustee;
