use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::ApiId,
    trustee::{Trustee, TrusteeState},
};

/// A request to put a user on an election's trustee roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrusteeRequest {
    pub election_id: ApiId,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyCeremonyRequest {
    pub election_id: ApiId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCeremonyOutcome {
    pub trustees_updated: u32,
}

/// A trustee's partial decryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareSubmission {
    pub share: String,
}

/// An API-friendly trustee description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrusteeDescription {
    pub trustee_id: ApiId,
    pub election_id: ApiId,
    pub user_id: String,
    pub has_key_share: bool,
    pub shares_submitted: bool,
    pub share_index: Option<u32>,
    pub state: TrusteeState,
    pub created_at: DateTime<Utc>,
}

impl From<&Trustee> for TrusteeDescription {
    fn from(trustee: &Trustee) -> Self {
        Self {
            trustee_id: trustee.id.into(),
            election_id: trustee.election_id.into(),
            user_id: trustee.user_id.clone(),
            has_key_share: trustee.has_key_share,
            shares_submitted: trustee.shares_submitted,
            share_index: trustee.share_index,
            state: trustee.state(),
            created_at: trustee.created_at,
        }
    }
}
