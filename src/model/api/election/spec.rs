use serde::{Deserialize, Serialize};

use crate::model::{api::ApiId, common::election::ElectionStatus};

/// A requested status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ElectionStatus,
}

/// A new candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub election_id: ApiId,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
}

/// A complete ordering of an election's candidates, first to last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateOrder {
    pub candidate_ids: Vec<ApiId>,
}
