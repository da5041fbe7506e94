use log::{info, warn};

use crate::crypto::DecryptionShare;
use crate::error::{Error, Result};
use crate::model::{
    common::election::{ElectionId, TrusteeId},
    trustee::{DecryptionStatus, Trustee},
};

use super::{now, retry_once, Coordinator};

impl Coordinator {
    pub async fn add_trustee(&self, election_id: ElectionId, user_id: String) -> Result<Trustee> {
        let slot = self.slot(election_id).await?;
        let mut slot = slot.lock().await;
        let (trustee, _) = self
            .apply(&mut slot, |record, now| record.add_trustee(user_id, now))
            .await?;
        // Indexed before the election is unlocked, so a listed trustee is always addressable.
        self.trustees
            .write()
            .await
            .insert(trustee.id, election_id);
        info!(
            "Assigned {} as trustee {} of election {election_id}",
            trustee.user_id, trustee.id
        );
        Ok(trustee)
    }

    pub async fn remove_trustee(&self, trustee_id: TrusteeId) -> Result<Trustee> {
        let election_id = self.election_of(trustee_id).await?;
        let slot = self.slot(election_id).await?;
        let mut slot = slot.lock().await;
        let (trustee, _) = self
            .apply(&mut slot, |record, now| record.remove_trustee(trustee_id, now))
            .await?;
        self.trustees.write().await.remove(&trustee_id);
        info!("Removed trustee {trustee_id} from election {election_id}");
        Ok(trustee)
    }

    /// The roster, in the order trustees were assigned.
    pub async fn list_trustees(&self, election_id: ElectionId) -> Result<Vec<Trustee>> {
        Ok(self.snapshot(election_id).await?.trustees)
    }

    /// Generate the election key and hand every trustee its share.
    ///
    /// The election stays locked for the whole ceremony, so a concurrent
    /// ceremony for the same election sees the result of this one. Nothing is
    /// recorded unless key generation succeeds.
    pub async fn run_key_ceremony(&self, election_id: ElectionId) -> Result<u32> {
        let slot = self.slot(election_id).await?;
        let mut slot = slot.lock().await;
        slot.record.check_ceremony()?;

        let election = &slot.record.election;
        let (threshold, total) = (election.threshold, election.total_trustees);
        info!("Running {threshold}-of-{total} key ceremony for election {election_id}");
        let key = self
            .bounded(
                "key generation",
                self.crypto.generate_key(election_id, threshold, total),
            )
            .await?;

        let mut record = slot.record.clone();
        let (updated, event) = record.apply_key_material(key, now())?;
        self.commit(&mut slot, record, event).await?;
        info!("Distributed {updated} key shares for election {election_id}");
        Ok(updated)
    }

    /// Verify and record a trustee's decryption share.
    pub async fn submit_share(&self, trustee_id: TrusteeId, share: String) -> Result<Trustee> {
        if share.trim().is_empty() {
            return Err(Error::Validation("Share must not be empty".to_string()));
        }
        let election_id = self.election_of(trustee_id).await?;
        let slot = self.slot(election_id).await?;
        let mut slot = slot.lock().await;

        let (key, index) = slot.record.check_share(trustee_id)?;
        let share = DecryptionShare { index, share };
        let valid = retry_once("Share verification", || {
            self.bounded("share verification", self.crypto.verify_share(key, &share))
        })
        .await?;
        if !valid {
            warn!("Rejected invalid decryption share from trustee {trustee_id}");
            return Err(Error::InvalidShare(trustee_id));
        }

        let mut record = slot.record.clone();
        let (trustee, event) = record.accept_share(trustee_id, share.share, now())?;
        let entry = self.commit(&mut slot, record, event).await?;
        info!(
            "Accepted decryption share from trustee {trustee_id} ({} so far)",
            entry.data["share_count"]
        );
        Ok(trustee)
    }

    pub async fn decryption_status(&self, election_id: ElectionId) -> Result<DecryptionStatus> {
        let slot = self.slot(election_id).await?;
        let status = slot.lock().await.record.decryption_status();
        Ok(status)
    }
}
