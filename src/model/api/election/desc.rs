use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::ApiId,
    common::election::{ElectionId, ElectionStatus},
    election::{Candidate, ElectionRecord},
};

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub election_id: ApiId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ElectionStatus,
    pub threshold_t: u32,
    pub total_trustees_n: u32,
    /// Present once the key ceremony has run.
    pub public_key: Option<String>,
    /// Candidates in display order.
    pub candidates: Vec<CandidateDescription>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub candidate_id: ApiId,
    pub election_id: ApiId,
    pub name: String,
    pub party: Option<String>,
    pub display_order: u32,
}

impl CandidateDescription {
    pub fn new(election_id: ElectionId, candidate: &Candidate) -> Self {
        Self {
            candidate_id: candidate.id.into(),
            election_id: election_id.into(),
            name: candidate.name.clone(),
            party: candidate.party.clone(),
            display_order: candidate.display_order,
        }
    }
}

impl From<&ElectionRecord> for ElectionDescription {
    fn from(record: &ElectionRecord) -> Self {
        let election = &record.election;
        Self {
            election_id: record.id.into(),
            title: election.title.clone(),
            description: election.description.clone(),
            start_time: election.start_time,
            end_time: election.end_time,
            status: election.status,
            threshold_t: election.threshold,
            total_trustees_n: election.total_trustees,
            public_key: election.public_key.clone(),
            candidates: election
                .candidates
                .iter()
                .map(|c| CandidateDescription::new(record.id, c))
                .collect(),
            created_at: election.created_at,
            updated_at: election.updated_at,
        }
    }
}
