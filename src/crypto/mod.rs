//! The cryptography collaborator: key generation, share verification and
//! threshold decryption. The coordinator never touches key material itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::common::election::{CandidateId, ElectionId};

pub use dev::DevCryptography;
pub use remote::RemoteCryptography;

mod dev;
mod remote;

/// Public output of a key ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    /// The election public key.
    pub public_key: String,
    /// One verification key per share, in share index order.
    pub verification_keys: Vec<String>,
}

impl KeyMaterial {
    /// The verification key for the share with the given 1-based index.
    pub fn verification_key(&self, index: u32) -> Option<&str> {
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        self.verification_keys.get(position).map(String::as_str)
    }
}

/// A partial decryption from one trustee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionShare {
    /// 1-based share index allocated by the key ceremony.
    pub index: u32,
    pub share: String,
}

/// Everything needed to combine shares into final counts.
#[derive(Debug, Clone)]
pub struct CombineRequest {
    pub election_id: ElectionId,
    pub key: KeyMaterial,
    pub threshold: u32,
    pub shares: Vec<DecryptionShare>,
    /// Candidates in display order; counts come back in the same order.
    pub candidates: Vec<CandidateId>,
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Cryptography service unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Cryptography service rejected the request: {0}")]
    Rejected(String),
    #[error("Malformed response from cryptography service: {0}")]
    Malformed(String),
}

#[rocket::async_trait]
pub trait Cryptography: Send + Sync {
    /// Generate an election keypair split into `total` shares, any `threshold`
    /// of which can decrypt.
    async fn generate_key(
        &self,
        election_id: ElectionId,
        threshold: u32,
        total: u32,
    ) -> Result<KeyMaterial, CryptoError>;

    /// Check a decryption share against the election's verification keys.
    async fn verify_share(
        &self,
        key: &KeyMaterial,
        share: &DecryptionShare,
    ) -> Result<bool, CryptoError>;

    /// Combine the shares and decrypt the tally, one count per candidate.
    async fn combine(&self, request: CombineRequest) -> Result<Vec<u64>, CryptoError>;
}
