use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::election::{CandidateId, ElectionStatus};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    pub status: ElectionStatus,
    /// Decryption threshold `t`.
    pub threshold: u32,
    /// Roster size `n`.
    pub total_trustees: u32,
    /// Candidates, kept sorted by display order.
    pub candidates: Vec<Candidate>,
    /// Published once the key ceremony has run.
    pub public_key: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// A choice on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub party: Option<String>,
    /// 1-based position on the ballot, unique per election.
    pub display_order: u32,
}

impl Election {
    /// The next free display order slot.
    pub fn next_display_order(&self) -> u32 {
        self.candidates
            .iter()
            .map(|c| c.display_order)
            .max()
            .unwrap_or(0)
            + 1
    }
}
