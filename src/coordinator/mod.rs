//! The coordination core: every election lives in its own locked slot, and every
//! change to it is committed to the store together with exactly one bulletin entry
//! before it becomes visible.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::{
        sync::{Mutex, RwLock},
        time::timeout,
    },
    Build, Rocket,
};

use crate::config::Config;
use crate::crypto::{CryptoError, Cryptography};
use crate::error::{Error, Result};
use crate::model::{
    bulletin::{BulletinEntry, BulletinEvent, ChainCursor},
    common::election::{ElectionId, TrusteeId},
    election::ElectionRecord,
};
use crate::store::Store;

mod bulletin;
mod elections;
mod tally;
mod trustees;

/// An election and the tail of its chain, as last committed.
#[derive(Debug)]
struct Slot {
    record: ElectionRecord,
    cursor: ChainCursor,
}

type SlotRef = Arc<Mutex<Slot>>;

/// Coordinates elections, their trustees, tallies and bulletin boards.
pub struct Coordinator {
    elections: RwLock<HashMap<ElectionId, SlotRef>>,
    /// Which election each trustee belongs to.
    trustees: RwLock<HashMap<TrusteeId, ElectionId>>,
    store: Arc<dyn Store>,
    crypto: Arc<dyn Cryptography>,
    crypto_timeout: Duration,
}

/// The current time, at the millisecond precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    mongodb::bson::DateTime::now().to_chrono()
}

impl Coordinator {
    /// A coordinator with no elections.
    pub fn new(store: Arc<dyn Store>, crypto: Arc<dyn Cryptography>, crypto_timeout: Duration) -> Self {
        Self {
            elections: RwLock::default(),
            trustees: RwLock::default(),
            store,
            crypto,
            crypto_timeout,
        }
    }

    /// Rebuild the coordinator from whatever the store holds.
    ///
    /// Chain cursors are taken from the last stored entry as-is; a damaged chain is
    /// left for `verify` to report.
    pub async fn restore(
        store: Arc<dyn Store>,
        crypto: Arc<dyn Cryptography>,
        crypto_timeout: Duration,
    ) -> Result<Self> {
        let mut elections = HashMap::new();
        let mut trustees = HashMap::new();
        for (record, tail) in store.load().await? {
            let cursor = tail.as_ref().map(ChainCursor::after).unwrap_or_default();
            for trustee in &record.trustees {
                trustees.insert(trustee.id, record.id);
            }
            elections.insert(record.id, Arc::new(Mutex::new(Slot { record, cursor })));
        }
        info!("Restored {} elections", elections.len());

        Ok(Self {
            elections: RwLock::new(elections),
            trustees: RwLock::new(trustees),
            store,
            crypto,
            crypto_timeout,
        })
    }

    async fn slot(&self, election_id: ElectionId) -> Result<SlotRef> {
        self.elections
            .read()
            .await
            .get(&election_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("election {election_id}")))
    }

    async fn election_of(&self, trustee_id: TrusteeId) -> Result<ElectionId> {
        self.trustees
            .read()
            .await
            .get(&trustee_id)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("trustee {trustee_id}")))
    }

    /// A consistent snapshot of one election.
    async fn snapshot(&self, election_id: ElectionId) -> Result<ElectionRecord> {
        let slot = self.slot(election_id).await?;
        let slot = slot.lock().await;
        Ok(slot.record.clone())
    }

    /// Seal `event` after the slot's cursor, persist it with `record`, and only then
    /// make both current. On failure the slot is untouched.
    async fn commit(
        &self,
        slot: &mut Slot,
        record: ElectionRecord,
        event: BulletinEvent,
    ) -> Result<BulletinEntry> {
        let entry = slot.cursor.seal(event, now());
        if let Err(err) = self.store.commit(&record, &entry).await {
            error!(
                "Failed to commit {} for election {}: {err}",
                entry.entry_type, record.id
            );
            return Err(err);
        }
        slot.cursor = ChainCursor::after(&entry);
        slot.record = record;
        Ok(entry)
    }

    /// Apply a synchronous change to a copy of the election and commit it.
    async fn mutate<T, F>(&self, election_id: ElectionId, change: F) -> Result<(T, BulletinEntry)>
    where
        F: FnOnce(&mut ElectionRecord, DateTime<Utc>) -> Result<(T, BulletinEvent)>,
    {
        let slot = self.slot(election_id).await?;
        let mut slot = slot.lock().await;
        self.apply(&mut slot, change).await
    }

    /// As [`Coordinator::mutate`], for a slot the caller already holds.
    async fn apply<T, F>(&self, slot: &mut Slot, change: F) -> Result<(T, BulletinEntry)>
    where
        F: FnOnce(&mut ElectionRecord, DateTime<Utc>) -> Result<(T, BulletinEvent)>,
    {
        let mut record = slot.record.clone();
        let (value, event) = change(&mut record, now())?;
        let entry = self.commit(slot, record, event).await?;
        Ok((value, entry))
    }

    /// Await a collaborator call, giving up after the configured timeout.
    async fn bounded<T, F>(&self, what: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, CryptoError>>,
    {
        match timeout(self.crypto_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                error!("Cryptography service failed during {what}: {err}");
                Err(err.into())
            }
            Err(_) => {
                error!(
                    "Cryptography service timed out after {:?} during {what}",
                    self.crypto_timeout
                );
                Err(Error::Timeout(what))
            }
        }
    }
}

/// Run an idempotent call, retrying once if it fails for upstream reasons.
async fn retry_once<T, F, Fut>(what: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match call().await {
        Err(err) if err.is_transient() => {
            warn!("{what} failed ({err}), retrying once");
            call().await
        }
        result => result,
    }
}

/// A fairing that restores the coordinator from the store and places it into
/// managed state. This fairing depends on `Config` and the store being
/// available in managed state, and so must be attached after the fairings
/// responsible for those.
pub struct CoordinatorFairing;

#[rocket::async_trait]
impl Fairing for CoordinatorFairing {
    fn info(&self) -> Info {
        Info {
            name: "Coordinator",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        info!("Restoring elections...");
        let (store, crypto, crypto_timeout) = match (
            rocket.state::<Arc<dyn Store>>(),
            rocket.state::<Config>(),
        ) {
            (Some(store), Some(config)) => {
                (store.clone(), config.cryptography(), config.crypto_timeout())
            }
            _ => {
                error!("Config and store must be available before the coordinator");
                return Err(rocket);
            }
        };
        let coordinator = match Coordinator::restore(store, crypto, crypto_timeout).await {
            Ok(coordinator) => coordinator,
            Err(e) => {
                error!("Failed to restore elections: {e}");
                return Err(rocket);
            }
        };
        info!("...elections restored!");

        Ok(rocket.manage(Arc::new(coordinator)))
    }
}
