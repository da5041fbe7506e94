use log::{debug, warn};
use rocket::serde::json::Value;

use crate::error::{Error, Result};
use crate::model::{
    bulletin::{self, BulletinEntry, ChainVerification, EntryType},
    common::election::ElectionId,
};

use super::{retry_once, Coordinator};

impl Coordinator {
    /// Append an entry on behalf of an external collaborator.
    ///
    /// Only ballots may be recorded this way; every other entry type is written
    /// by the coordinator itself as a side effect of the change it describes.
    pub async fn append(
        &self,
        election_id: ElectionId,
        entry_type: &str,
        data: Value,
    ) -> Result<BulletinEntry> {
        let entry_type: EntryType = entry_type.parse().map_err(Error::Validation)?;
        if !entry_type.is_external() {
            warn!("Refused external {entry_type} entry for election {election_id}");
            return Err(Error::Validation(format!(
                "{entry_type} entries cannot be appended directly"
            )));
        }

        let ((), entry) = self
            .mutate(election_id, |record, _| Ok(((), record.record_ballot(data)?)))
            .await?;
        debug!("Appended {entry_type} #{} to election {election_id}", entry.seq);
        Ok(entry)
    }

    /// The election's bulletin board, oldest entry first.
    pub async fn read_chain(&self, election_id: ElectionId) -> Result<Vec<BulletinEntry>> {
        self.slot(election_id).await?;
        retry_once("Bulletin read", || self.store.read_chain(election_id)).await
    }

    /// Check the stored chain for breaks and tampering.
    pub async fn verify_chain(&self, election_id: ElectionId) -> Result<ChainVerification> {
        let entries = self.read_chain(election_id).await?;
        let verification = bulletin::verify_chain(&entries);
        if let Some(message) = &verification.message {
            warn!("Bulletin verification failed for election {election_id}: {message}");
        }
        Ok(verification)
    }
}
