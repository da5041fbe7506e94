//! The tamper-evident, hash-linked event log.

pub use chain::{verify_chain, ChainCursor, ChainVerification};
pub use db::BulletinDoc;
pub use entry::{canonical_json, compute_hash, BulletinEntry, BulletinEvent, EntryType};

mod chain;
mod db;
mod entry;
