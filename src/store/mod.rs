//! Durable storage for election aggregates and their bulletin chains.

use crate::error::Result;
use crate::model::{bulletin::BulletinEntry, common::election::ElectionId, election::ElectionRecord};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

mod memory;
mod mongo;

/// A stored election together with the last entry of its chain.
pub type StoredElection = (ElectionRecord, Option<BulletinEntry>);

#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Every stored election, with its chain tail.
    async fn load(&self) -> Result<Vec<StoredElection>>;

    /// Atomically persist `record` together with the next entry of its chain.
    ///
    /// Fails without side effects if `entry` does not directly follow the stored chain tail.
    async fn commit(&self, record: &ElectionRecord, entry: &BulletinEntry) -> Result<()>;

    /// The election's chain, ordered by sequence number.
    async fn read_chain(&self, election_id: ElectionId) -> Result<Vec<BulletinEntry>>;
}
