use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::ApiId,
    common::election::ElectionStatus,
    election::ElectionRecord,
    tally::{CandidateResult, ElectionResult},
};

/// The response to a successful tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySummary {
    pub total_votes: u64,
    pub trustees_used: u32,
    pub threshold_required: u32,
}

impl From<&ElectionResult> for TallySummary {
    fn from(result: &ElectionResult) -> Self {
        Self {
            total_votes: result.total_votes,
            trustees_used: result.trustees_used,
            threshold_required: result.threshold_required,
        }
    }
}

/// Published results, ranked by vote count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ApiId,
    pub election_title: String,
    pub status: ElectionStatus,
    pub results: Vec<CandidateResultDescription>,
    pub total_votes: u64,
    pub verified: bool,
    pub trustees_used: u32,
    pub threshold_required: u32,
    pub tallied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResultDescription {
    pub candidate_id: ApiId,
    pub name: String,
    pub party: Option<String>,
    pub vote_count: u64,
    pub percentage: f64,
}

impl From<&CandidateResult> for CandidateResultDescription {
    fn from(result: &CandidateResult) -> Self {
        Self {
            candidate_id: result.candidate_id.into(),
            name: result.name.clone(),
            party: result.party.clone(),
            vote_count: result.vote_count,
            percentage: result.percentage,
        }
    }
}

impl ElectionResults {
    pub fn new(record: &ElectionRecord, result: &ElectionResult) -> Self {
        Self {
            election_id: record.id.into(),
            election_title: record.election.title.clone(),
            status: record.election.status,
            results: result.ranked().into_iter().map(Into::into).collect(),
            total_votes: result.total_votes,
            verified: result.verified,
            trustees_used: result.trustees_used,
            threshold_required: result.threshold_required,
            tallied_at: result.tallied_at,
        }
    }
}
