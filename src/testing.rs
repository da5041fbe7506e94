//! Shared fixtures for unit and API tests.

use std::sync::Arc;
use std::time::Duration;

use rocket::serde::json::json;

use crate::coordinator::Coordinator;
use crate::crypto::DevCryptography;
use crate::error::{Error, Result};
use crate::model::{
    bulletin::BulletinEntry,
    common::election::{CandidateId, ElectionId, ElectionStatus},
    election::{ElectionRecord, ElectionSpec},
    trustee::Trustee,
};
use crate::store::MemoryStore;

/// A coordinator over an in-memory store and the development cryptography
/// provider, with handles on both for steering and inspection.
#[derive(Clone)]
pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub store: Arc<MemoryStore>,
    pub crypto: Arc<DevCryptography>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(crypto_timeout: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let crypto = Arc::new(DevCryptography::new());
        let coordinator = Coordinator::new(store.clone(), crypto.clone(), crypto_timeout);
        Self {
            coordinator: Arc::new(coordinator),
            store,
            crypto,
        }
    }

    /// A fresh 2-of-3 draft election.
    pub async fn election(&self) -> ElectionRecord {
        self.coordinator
            .create_election(ElectionSpec::example())
            .await
            .unwrap()
    }

    /// A 2-of-3 draft election with a full roster.
    pub async fn staffed_election(&self) -> ElectionRecord {
        let election = self.election().await;
        for user in ["alice", "bob", "carol"] {
            self.coordinator
                .add_trustee(election.id, user.to_string())
                .await
                .unwrap();
        }
        election
    }

    /// A 2-of-3 draft election whose key ceremony has run.
    pub async fn keyed_election(&self) -> ElectionRecord {
        let election = self.staffed_election().await;
        self.coordinator.run_key_ceremony(election.id).await.unwrap();
        election
    }

    /// A keyed election with two candidates, taken through voting and closed.
    pub async fn closed_election(&self) -> ElectionRecord {
        let election = self.keyed_election().await;
        for name in ["Amy", "Bob"] {
            self.coordinator
                .add_candidate(election.id, name.to_string(), None)
                .await
                .unwrap();
        }
        for status in [ElectionStatus::Active, ElectionStatus::Closed] {
            self.coordinator
                .set_status(election.id, status)
                .await
                .unwrap();
        }
        election
    }

    /// A closed election with enough shares to tally.
    pub async fn ready_to_tally(&self) -> ElectionRecord {
        let election = self.closed_election().await;
        let trustees = self.coordinator.list_trustees(election.id).await.unwrap();
        for trustee in &trustees[..2] {
            self.submit_share(election.id, trustee).await.unwrap();
        }
        election
    }

    /// Submit the share the last ceremony actually issued to `trustee`.
    pub async fn submit_share(&self, election_id: ElectionId, trustee: &Trustee) -> Result<Trustee> {
        let share = trustee
            .share_index
            .and_then(|index| self.crypto.issued_share(election_id, index))
            .ok_or_else(|| Error::Validation("trustee holds no issued share".to_string()))?;
        self.coordinator.submit_share(trustee.id, share).await
    }

    /// Cast a ballot for `candidate` the way the vote service would.
    pub async fn cast_ballot(
        &self,
        election_id: ElectionId,
        candidate: CandidateId,
    ) -> Result<BulletinEntry> {
        let ballot_hash = self.crypto.seal_ballot(election_id, candidate);
        self.coordinator
            .append(election_id, "BALLOT_CAST", json!({ "ballot_hash": ballot_hash }))
            .await
    }
}
