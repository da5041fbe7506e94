use std::collections::HashMap;

use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{bulletin::BulletinEntry, common::election::ElectionId, election::ElectionRecord};

use super::{Store, StoredElection};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<ElectionId, ElectionRecord>,
    chains: HashMap<ElectionId, Vec<BulletinEntry>>,
    fail_commits: bool,
}

/// An in-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Make every commit fail until reset.
    pub async fn fail_commits(&self, fail: bool) {
        self.inner.lock().await.fail_commits = fail;
    }

    /// Overwrite a stored entry's payload without rehashing it.
    pub async fn tamper(
        &self,
        election_id: ElectionId,
        seq: u64,
        data: rocket::serde::json::Value,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .chains
            .get_mut(&election_id)
            .and_then(|chain| chain.iter_mut().find(|e| e.seq == seq));
        match entry {
            Some(entry) => {
                entry.data = data;
                true
            }
            None => false,
        }
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> Result<Vec<StoredElection>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .records
            .values()
            .map(|record| {
                let tail = inner
                    .chains
                    .get(&record.id)
                    .and_then(|chain| chain.last())
                    .cloned();
                (record.clone(), tail)
            })
            .collect())
    }

    async fn commit(&self, record: &ElectionRecord, entry: &BulletinEntry) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_commits {
            return Err(Error::Store("commits disabled".to_string()));
        }

        let last_seq = inner
            .chains
            .get(&record.id)
            .and_then(|chain| chain.last())
            .map_or(0, |e| e.seq);
        if entry.seq != last_seq + 1 {
            return Err(Error::Store(format!(
                "bulletin entry {} does not follow stored entry {last_seq}",
                entry.seq
            )));
        }

        inner.records.insert(record.id, record.clone());
        inner
            .chains
            .entry(record.id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn read_chain(&self, election_id: ElectionId) -> Result<Vec<BulletinEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner.chains.get(&election_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use rocket::serde::json::json;

    use crate::model::{
        bulletin::{BulletinEvent, ChainCursor, EntryType},
        election::ElectionSpec,
    };

    #[rocket::async_test]
    async fn commits_must_extend_the_chain() {
        let store = MemoryStore::new();
        let (record, event) = ElectionRecord::create(ElectionSpec::example(), Utc::now()).unwrap();
        let first = ChainCursor::default().seal(event, Utc::now());
        store.commit(&record, &first).await.unwrap();

        // Replaying the same sequence number is refused.
        assert!(store.commit(&record, &first).await.is_err());

        let second = ChainCursor::after(&first).seal(
            BulletinEvent::new(EntryType::StatusChanged, json!({})),
            Utc::now(),
        );
        store.commit(&record, &second).await.unwrap();

        let chain = store.read_chain(record.id).await.unwrap();
        assert_eq!(chain, vec![first, second.clone()]);
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, vec![(record, Some(second))]);
    }

    #[rocket::async_test]
    async fn unknown_elections_have_empty_chains() {
        let store = MemoryStore::new();
        assert!(store.read_chain(ElectionId::new()).await.unwrap().is_empty());
    }
}
