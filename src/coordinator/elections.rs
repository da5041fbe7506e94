use std::sync::Arc;

use log::{info, warn};
use rocket::tokio::sync::Mutex;

use crate::error::Result;
use crate::model::{
    bulletin::ChainCursor,
    common::election::{CandidateId, ElectionId, ElectionStatus},
    election::{Candidate, ElectionRecord, ElectionSpec, ElectionUpdate},
};

use super::{now, Coordinator, Slot};

impl Coordinator {
    /// Create a new draft election, starting its bulletin board.
    pub async fn create_election(&self, spec: ElectionSpec) -> Result<ElectionRecord> {
        let (record, event) = ElectionRecord::create(spec, now())?;
        let mut slot = Slot {
            record: record.clone(),
            cursor: ChainCursor::default(),
        };
        self.commit(&mut slot, record.clone(), event).await?;

        self.elections
            .write()
            .await
            .insert(record.id, Arc::new(Mutex::new(slot)));
        info!(
            "Created election {} \"{}\" ({}-of-{})",
            record.id, record.election.title, record.election.threshold, record.election.total_trustees
        );
        Ok(record)
    }

    pub async fn update_election(
        &self,
        election_id: ElectionId,
        update: ElectionUpdate,
    ) -> Result<ElectionRecord> {
        let (record, _) = self
            .mutate(election_id, |record, now| {
                let event = record.update(update, now)?;
                Ok((record.clone(), event))
            })
            .await?;
        info!("Updated election {election_id}");
        Ok(record)
    }

    /// Every election, newest first.
    pub async fn list_elections(&self) -> Vec<ElectionRecord> {
        let slots: Vec<_> = self.elections.read().await.values().cloned().collect();
        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            records.push(slot.lock().await.record.clone());
        }
        records.sort_by(|a, b| b.election.created_at.cmp(&a.election.created_at));
        records
    }

    pub async fn get_election(&self, election_id: ElectionId) -> Result<ElectionRecord> {
        self.snapshot(election_id).await
    }

    /// Move an election to a new status on an administrator's request.
    pub async fn set_status(
        &self,
        election_id: ElectionId,
        status: ElectionStatus,
    ) -> Result<ElectionRecord> {
        let result = self
            .mutate(election_id, |record, now| {
                let event = record.set_status(status, now)?;
                Ok((record.clone(), event))
            })
            .await;
        match result {
            Ok((record, _)) => {
                info!("Election {election_id} is now {status}");
                Ok(record)
            }
            Err(err) => {
                warn!("Refused to move election {election_id} to {status}: {err}");
                Err(err)
            }
        }
    }

    pub async fn add_candidate(
        &self,
        election_id: ElectionId,
        name: String,
        party: Option<String>,
    ) -> Result<Candidate> {
        let (candidate, _) = self
            .mutate(election_id, |record, now| {
                record.add_candidate(name, party, now)
            })
            .await?;
        info!(
            "Added candidate {} \"{}\" to election {election_id}",
            candidate.id, candidate.name
        );
        Ok(candidate)
    }

    /// Reorder an election's candidates, returning them in their new order.
    pub async fn reorder_candidates(
        &self,
        election_id: ElectionId,
        order: Vec<CandidateId>,
    ) -> Result<Vec<Candidate>> {
        let (candidates, _) = self
            .mutate(election_id, |record, now| {
                let event = record.reorder_candidates(&order, now)?;
                Ok((record.election.candidates.clone(), event))
            })
            .await?;
        Ok(candidates)
    }
}
