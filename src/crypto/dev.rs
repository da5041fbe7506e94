use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use data_encoding::HEXLOWER;
use log::debug;
#[cfg(test)]
use log::warn;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::model::common::election::{CandidateId, ElectionId};

use super::{CombineRequest, CryptoError, Cryptography, DecryptionShare, KeyMaterial};

/// An in-process stand-in for the cryptography service.
///
/// Shares are random secrets committed to by their SHA-256 digests, and
/// "ciphertexts" are ballots registered through [`DevCryptography::seal_ballot`].
/// This provides the right shape for development and tests but no secrecy at all.
#[derive(Debug, Default)]
pub struct DevCryptography {
    issued: Mutex<HashMap<ElectionId, Vec<String>>>,
    ballots: Mutex<HashMap<ElectionId, Vec<CandidateId>>>,
    #[cfg(test)]
    faults: Faults,
}

/// Failures tests can switch on to exercise the coordinator's error paths.
#[cfg(test)]
#[derive(Debug, Default)]
struct Faults {
    fail_key_generation: AtomicBool,
    stall_key_generation: AtomicBool,
    verification_failures: AtomicUsize,
}

#[cfg(test)]
impl Faults {
    async fn before_key_generation(&self) -> Result<(), CryptoError> {
        if self.stall_key_generation.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_key_generation.load(Ordering::SeqCst) {
            return Err(CryptoError::Rejected("key generation disabled".to_string()));
        }
        Ok(())
    }

    fn before_verification(&self) -> Result<(), CryptoError> {
        let injected = self
            .verification_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            warn!("Injected share verification failure");
            return Err(CryptoError::Rejected("verification unavailable".to_string()));
        }
        Ok(())
    }
}

fn digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    HEXLOWER.encode(&hasher.finalize())
}

impl DevCryptography {
    pub fn new() -> Self {
        Self::default()
    }

    /// The share issued to the given index by the last ceremony for this election.
    pub fn issued_share(&self, election_id: ElectionId, index: u32) -> Option<String> {
        let issued = self.issued.lock().ok()?;
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        issued.get(&election_id)?.get(position).cloned()
    }

    /// Register a ballot for `candidate`, returning an opaque ballot hash suitable
    /// for a `BALLOT_CAST` entry.
    pub fn seal_ballot(&self, election_id: ElectionId, candidate: CandidateId) -> String {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        if let Ok(mut ballots) = self.ballots.lock() {
            ballots.entry(election_id).or_default().push(candidate);
        }
        digest(&[&election_id.bytes(), &candidate.bytes(), &nonce])
    }

    /// Make key generation fail until reset.
    #[cfg(test)]
    pub fn fail_key_generation(&self, fail: bool) {
        self.faults.fail_key_generation.store(fail, Ordering::SeqCst);
    }

    /// Make key generation hang until reset.
    #[cfg(test)]
    pub fn stall_key_generation(&self, stall: bool) {
        self.faults.stall_key_generation.store(stall, Ordering::SeqCst);
    }

    /// Make the next `count` share verifications fail as if the service were down.
    #[cfg(test)]
    pub fn inject_verification_failures(&self, count: usize) {
        self.faults.verification_failures.store(count, Ordering::SeqCst);
    }
}

#[rocket::async_trait]
impl Cryptography for DevCryptography {
    async fn generate_key(
        &self,
        election_id: ElectionId,
        threshold: u32,
        total: u32,
    ) -> Result<KeyMaterial, CryptoError> {
        #[cfg(test)]
        self.faults.before_key_generation().await?;
        if threshold == 0 || threshold > total {
            return Err(CryptoError::Rejected(format!(
                "cannot split a key {threshold}-of-{total}"
            )));
        }

        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        let shares: Vec<String> = (1..=total)
            .map(|index| digest(&[&secret, &election_id.bytes(), &index.to_le_bytes()]))
            .collect();
        let key = KeyMaterial {
            public_key: digest(&[b"public", &secret]),
            verification_keys: shares.iter().map(|s| digest(&[s.as_bytes()])).collect(),
        };
        debug!("Issued {total} dev key shares for election {election_id}");

        self.issued
            .lock()
            .map_err(|_| CryptoError::Rejected("share registry poisoned".to_string()))?
            .insert(election_id, shares);
        Ok(key)
    }

    async fn verify_share(
        &self,
        key: &KeyMaterial,
        share: &DecryptionShare,
    ) -> Result<bool, CryptoError> {
        #[cfg(test)]
        self.faults.before_verification()?;
        Ok(key
            .verification_key(share.index)
            .map(|expected| digest(&[share.share.as_bytes()]) == expected)
            .unwrap_or(false))
    }

    async fn combine(&self, request: CombineRequest) -> Result<Vec<u64>, CryptoError> {
        let mut valid = 0u32;
        for share in &request.shares {
            if self.verify_share(&request.key, share).await? {
                valid += 1;
            }
        }
        if valid < request.threshold {
            return Err(CryptoError::Rejected(format!(
                "{valid} valid shares, {} required",
                request.threshold
            )));
        }

        let ballots = self
            .ballots
            .lock()
            .map_err(|_| CryptoError::Rejected("ballot registry poisoned".to_string()))?;
        let cast = ballots
            .get(&request.election_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(request
            .candidates
            .iter()
            .map(|candidate| cast.iter().filter(|c| *c == candidate).count() as u64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::mongodb::Id;

    #[rocket::async_test]
    async fn issued_shares_verify_against_their_own_index() {
        let crypto = DevCryptography::new();
        let election = Id::new();
        let key = crypto.generate_key(election, 2, 3).await.unwrap();
        assert_eq!(key.verification_keys.len(), 3);

        let first = crypto.issued_share(election, 1).unwrap();
        let good = DecryptionShare {
            index: 1,
            share: first.clone(),
        };
        assert!(crypto.verify_share(&key, &good).await.unwrap());

        let misplaced = DecryptionShare {
            index: 2,
            share: first,
        };
        assert!(!crypto.verify_share(&key, &misplaced).await.unwrap());

        let out_of_range = DecryptionShare {
            index: 4,
            share: "00".to_string(),
        };
        assert!(!crypto.verify_share(&key, &out_of_range).await.unwrap());
        assert_eq!(crypto.issued_share(election, 0), None);
    }

    #[rocket::async_test]
    async fn combine_counts_sealed_ballots() {
        let crypto = DevCryptography::new();
        let election = Id::new();
        let (alice, bob) = (Id::new(), Id::new());
        let key = crypto.generate_key(election, 1, 2).await.unwrap();
        crypto.seal_ballot(election, alice);
        crypto.seal_ballot(election, bob);
        crypto.seal_ballot(election, alice);
        crypto.seal_ballot(Id::new(), bob);

        let request = CombineRequest {
            election_id: election,
            key,
            threshold: 1,
            shares: vec![DecryptionShare {
                index: 2,
                share: crypto.issued_share(election, 2).unwrap(),
            }],
            candidates: vec![bob, alice],
        };
        assert_eq!(crypto.combine(request).await.unwrap(), vec![1, 2]);
    }

    #[rocket::async_test]
    async fn combine_refuses_too_few_valid_shares() {
        let crypto = DevCryptography::new();
        let election = Id::new();
        let key = crypto.generate_key(election, 2, 2).await.unwrap();
        let request = CombineRequest {
            election_id: election,
            key,
            threshold: 2,
            shares: vec![
                DecryptionShare {
                    index: 1,
                    share: crypto.issued_share(election, 1).unwrap(),
                },
                DecryptionShare {
                    index: 2,
                    share: "forged".to_string(),
                },
            ],
            candidates: vec![Id::new()],
        };
        assert!(matches!(
            crypto.combine(request).await,
            Err(CryptoError::Rejected(_))
        ));
    }

    #[rocket::async_test]
    async fn injected_failures_are_consumed() {
        let crypto = DevCryptography::new();
        let election = Id::new();
        let key = crypto.generate_key(election, 1, 1).await.unwrap();
        let share = DecryptionShare {
            index: 1,
            share: crypto.issued_share(election, 1).unwrap(),
        };
        crypto.inject_verification_failures(1);
        assert!(crypto.verify_share(&key, &share).await.is_err());
        assert!(crypto.verify_share(&key, &share).await.unwrap());
    }

    #[rocket::async_test]
    async fn forced_key_generation_failure() {
        let crypto = DevCryptography::new();
        crypto.fail_key_generation(true);
        assert!(crypto.generate_key(Id::new(), 1, 1).await.is_err());
        crypto.fail_key_generation(false);
        assert!(crypto.generate_key(Id::new(), 1, 1).await.is_ok());
    }
}
