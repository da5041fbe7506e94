use log::debug;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::model::common::election::ElectionId;

use super::{CombineRequest, CryptoError, Cryptography, DecryptionShare, KeyMaterial};

/// A JSON client for the external cryptography service.
#[derive(Debug, Clone)]
pub struct RemoteCryptography {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct KeyRequest {
    election_id: String,
    threshold: u32,
    total: u32,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    public_key: &'a str,
    verification_key: &'a str,
    index: u32,
    share: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
}

#[derive(Serialize)]
struct TallyRequest<'a> {
    election_id: String,
    public_key: &'a str,
    threshold: u32,
    shares: &'a [DecryptionShare],
    candidates: Vec<String>,
}

#[derive(Deserialize)]
struct TallyResponse {
    counts: Vec<u64>,
}

impl RemoteCryptography {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, CryptoError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        debug!("POST {url}");
        let response = self.client.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, CryptoError> {
        let status = response.status();
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CryptoError::Rejected(format!("{status}: {detail}")));
        }
        let response = response.error_for_status()?;
        response
            .json::<R>()
            .await
            .map_err(|err| CryptoError::Malformed(err.to_string()))
    }
}

#[rocket::async_trait]
impl Cryptography for RemoteCryptography {
    async fn generate_key(
        &self,
        election_id: ElectionId,
        threshold: u32,
        total: u32,
    ) -> Result<KeyMaterial, CryptoError> {
        let request = KeyRequest {
            election_id: election_id.to_string(),
            threshold,
            total,
        };
        let key: KeyMaterial = self.post("keys", &request).await?;
        if key.verification_keys.len() != total as usize {
            return Err(CryptoError::Malformed(format!(
                "expected {total} verification keys, got {}",
                key.verification_keys.len()
            )));
        }
        Ok(key)
    }

    async fn verify_share(
        &self,
        key: &KeyMaterial,
        share: &DecryptionShare,
    ) -> Result<bool, CryptoError> {
        let verification_key = match key.verification_key(share.index) {
            Some(verification_key) => verification_key,
            None => return Ok(false),
        };
        let request = VerifyRequest {
            public_key: &key.public_key,
            verification_key,
            index: share.index,
            share: &share.share,
        };
        let response: VerifyResponse = self.post("shares/verify", &request).await?;
        Ok(response.valid)
    }

    async fn combine(&self, request: CombineRequest) -> Result<Vec<u64>, CryptoError> {
        let body = TallyRequest {
            election_id: request.election_id.to_string(),
            public_key: &request.key.public_key,
            threshold: request.threshold,
            shares: &request.shares,
            candidates: request.candidates.iter().map(ToString::to_string).collect(),
        };
        let response: TallyResponse = self.post("tally", &body).await?;
        Ok(response.counts)
    }
}
