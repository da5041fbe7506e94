//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.

pub mod bulletin;
pub mod election;
pub mod trustee;

mod id;

pub use id::ApiId;
