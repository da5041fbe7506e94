use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::election::{ElectionId, TrusteeId};

/// A member of an election's (t, n) trustee roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trustee {
    pub id: TrusteeId,
    pub election_id: ElectionId,
    /// Opaque reference into the user directory.
    pub user_id: String,
    pub has_key_share: bool,
    pub shares_submitted: bool,
    /// 1-based share index, allocated by the key ceremony.
    pub share_index: Option<u32>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Trustee {
    pub fn new(election_id: ElectionId, user_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TrusteeId::new(),
            election_id,
            user_id,
            has_key_share: false,
            shares_submitted: false,
            share_index: None,
            created_at,
        }
    }

    pub fn state(&self) -> TrusteeState {
        if self.shares_submitted {
            TrusteeState::ShareSubmitted
        } else if self.has_key_share {
            TrusteeState::KeyDistributed
        } else {
            TrusteeState::Assigned
        }
    }
}

/// Where a user stands in an election's trustee protocol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrusteeState {
    /// Not on the roster.
    Unassigned,
    /// On the roster, awaiting the key ceremony.
    Assigned,
    /// Holds a key share.
    KeyDistributed,
    /// Has submitted a decryption share.
    ShareSubmitted,
}

/// Progress towards the decryption threshold. Always derived, never stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionStatus {
    pub threshold: u32,
    pub trustees_submitted: u32,
    pub trustees_needed: u32,
    pub can_decrypt: bool,
}

impl DecryptionStatus {
    pub fn new(threshold: u32, submitted: u32) -> Self {
        Self {
            threshold,
            trustees_submitted: submitted,
            trustees_needed: threshold.saturating_sub(submitted),
            can_decrypt: submitted >= threshold,
        }
    }
}

/// A verified decryption share, held until the tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedShare {
    pub trustee_id: TrusteeId,
    pub index: u32,
    pub share: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
}
