use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

use crate::model::common::election::ElectionId;

use super::entry::{BulletinEntry, EntryType};

/// A bulletin entry as stored in the database, keyed by election and sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinDoc {
    pub election_id: ElectionId,
    pub seq: u64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub hash: String,
    pub prev: Option<String>,
    pub data: Value,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub time: DateTime<Utc>,
}

impl BulletinDoc {
    pub fn new(election_id: ElectionId, entry: BulletinEntry) -> Self {
        Self {
            election_id,
            seq: entry.seq,
            entry_type: entry.entry_type,
            hash: entry.hash,
            prev: entry.prev,
            data: entry.data,
            time: entry.time,
        }
    }
}

impl From<BulletinDoc> for BulletinEntry {
    fn from(doc: BulletinDoc) -> Self {
        Self {
            seq: doc.seq,
            entry_type: doc.entry_type,
            hash: doc.hash,
            prev: doc.prev,
            data: doc.data,
            time: doc.time,
        }
    }
}
