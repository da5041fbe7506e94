use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::{compute_hash, BulletinEntry, BulletinEvent};

/// The tail of an election's chain: everything needed to seal the next entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainCursor {
    pub last_seq: u64,
    pub last_hash: Option<String>,
}

impl ChainCursor {
    /// The cursor positioned just after `entry`.
    pub fn after(entry: &BulletinEntry) -> Self {
        Self {
            last_seq: entry.seq,
            last_hash: Some(entry.hash.clone()),
        }
    }

    /// Seal a new entry that follows this cursor.
    ///
    /// The cursor itself is left untouched; callers advance it with
    /// [`ChainCursor::after`] once the entry is durably stored.
    pub fn seal(&self, event: BulletinEvent, time: DateTime<Utc>) -> BulletinEntry {
        let BulletinEvent { entry_type, data } = event;
        let seq = self.last_seq + 1;
        let hash = compute_hash(seq, entry_type, &data, self.last_hash.as_deref(), &time);
        BulletinEntry {
            seq,
            entry_type,
            hash,
            prev: self.last_hash.clone(),
            data,
            time,
        }
    }
}

/// Outcome of walking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub total_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChainVerification {
    fn valid(total_entries: usize) -> Self {
        Self {
            valid: true,
            total_entries,
            message: None,
        }
    }

    fn broken(total_entries: usize, message: String) -> Self {
        Self {
            valid: false,
            total_entries,
            message: Some(message),
        }
    }
}

/// Verify a chain given in storage order.
///
/// Stops at the first entry that is out of sequence, does not link to its
/// predecessor, or whose stored hash differs from the recomputed one.
pub fn verify_chain(entries: &[BulletinEntry]) -> ChainVerification {
    let total = entries.len();
    let mut expected = ChainCursor::default();
    for entry in entries {
        let seq = entry.seq;
        if seq != expected.last_seq + 1 {
            return ChainVerification::broken(
                total,
                format!(
                    "Entry {seq}: sequence break, expected {}",
                    expected.last_seq + 1
                ),
            );
        }
        if entry.prev != expected.last_hash {
            return ChainVerification::broken(
                total,
                format!("Entry {seq}: previous hash does not match entry {}", seq - 1),
            );
        }
        if entry.recompute_hash() != entry.hash {
            return ChainVerification::broken(
                total,
                format!("Entry {seq}: stored hash does not match contents"),
            );
        }
        expected = ChainCursor::after(entry);
    }
    ChainVerification::valid(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use rocket::serde::json::json;

    use crate::model::bulletin::EntryType;

    fn chain(len: u64) -> Vec<BulletinEntry> {
        let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut cursor = ChainCursor::default();
        (1..=len)
            .map(|i| {
                let event = BulletinEvent::new(EntryType::BallotCast, json!({"ballot": i}));
                let entry = cursor.seal(event, start + Duration::seconds(i as i64));
                cursor = ChainCursor::after(&entry);
                entry
            })
            .collect()
    }

    #[test]
    fn empty_chain_is_valid() {
        assert_eq!(verify_chain(&[]), ChainVerification::valid(0));
    }

    #[test]
    fn sealed_chain_links_and_verifies() {
        let entries = chain(5);
        assert_eq!(entries[0].seq, 1);
        assert_eq!(entries[0].prev, None);
        for pair in entries.windows(2) {
            assert_eq!(pair[1].seq, pair[0].seq + 1);
            assert_eq!(pair[1].prev.as_deref(), Some(pair[0].hash.as_str()));
        }
        assert_eq!(verify_chain(&entries), ChainVerification::valid(5));
    }

    #[test]
    fn tampered_payload_is_reported_at_its_seq() {
        let mut entries = chain(5);
        entries[2].data = json!({"ballot": 99});
        let report = verify_chain(&entries);
        assert!(!report.valid);
        assert_eq!(report.total_entries, 5);
        assert!(report.message.unwrap().starts_with("Entry 3:"));
    }

    #[test]
    fn rehashed_entry_breaks_the_next_link() {
        let mut entries = chain(4);
        entries[1].data = json!({"ballot": 42});
        entries[1].hash = entries[1].recompute_hash();
        let report = verify_chain(&entries);
        assert!(!report.valid);
        assert!(report.message.unwrap().starts_with("Entry 3:"));
    }

    #[test]
    fn gaps_and_reordering_are_detected() {
        let mut entries = chain(4);
        entries.remove(1);
        let report = verify_chain(&entries);
        assert_eq!(
            report.message.as_deref(),
            Some("Entry 3: sequence break, expected 2")
        );

        let mut entries = chain(3);
        entries.swap(0, 1);
        assert!(!verify_chain(&entries).valid);
    }

    #[test]
    fn tampered_time_is_detected() {
        let mut entries = chain(2);
        entries[0].time = entries[0].time + Duration::milliseconds(1);
        let report = verify_chain(&entries);
        assert!(report.message.unwrap().starts_with("Entry 1:"));
    }

    #[test]
    fn report_omits_message_when_valid() {
        let json = rocket::serde::json::serde_json::to_value(verify_chain(&chain(1))).unwrap();
        assert_eq!(json, json!({"valid": true, "total_entries": 1}));
    }
}
