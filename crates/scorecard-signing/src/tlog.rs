//! Transparency-log client and entry models.
//!
//! Pure request/response against the log's REST API: no retries, timeouts
//! surfaced verbatim. Entry lookups return the response map's single member;
//! the map key is the authoritative entry ID (it may carry a tree-ID prefix
//! on top of the leaf hash).

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TlogError {
    #[error("transparency log transport error")]
    Transport(#[source] reqwest::Error),
    #[error("transparency log returned status {status} for `{path}`")]
    Status { status: u16, path: String },
    #[error("transparency log response held no entry")]
    EmptyResponse,
    #[error("entry body is not valid base64")]
    BodyEncoding(#[from] base64::DecodeError),
    #[error("entry body could not be decoded: {0}")]
    BodyDecode(#[from] serde_json::Error),
}

/// One immutable transparency-log record, as returned by the entries API.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub body: String,
    #[serde(rename = "integratedTime")]
    pub integrated_time: i64,
    #[serde(rename = "logID", default)]
    pub log_id: String,
    #[serde(rename = "logIndex", default)]
    pub log_index: i64,
    #[serde(default)]
    pub verification: Option<Verification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Verification {
    #[serde(rename = "inclusionProof", default)]
    pub inclusion_proof: Option<InclusionProof>,
    #[serde(rename = "signedEntryTimestamp", default)]
    pub signed_entry_timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InclusionProof {
    pub hashes: Vec<String>,
    #[serde(rename = "logIndex")]
    pub log_index: u64,
    #[serde(rename = "rootHash")]
    pub root_hash: String,
    #[serde(rename = "treeSize")]
    pub tree_size: u64,
    #[serde(default)]
    pub checkpoint: Option<String>,
}

/// Parsed entry body. Only hashed-record entries are accepted upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct HashedRecord {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub spec: RecordSpec,
}

impl HashedRecord {
    pub const KIND: &'static str = "hashedrekord";
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordSpec {
    pub data: RecordData,
    pub signature: RecordSignature,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordData {
    pub hash: RecordHash,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordHash {
    pub algorithm: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordSignature {
    pub content: String,
    #[serde(rename = "publicKey")]
    pub public_key: RecordPublicKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordPublicKey {
    /// Base64 of the PEM bundle that signed the entry.
    pub content: String,
}

impl LogEntry {
    pub fn decode_body(&self) -> Result<HashedRecord, TlogError> {
        let raw = STANDARD.decode(&self.body)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[derive(Clone)]
pub struct TlogClient {
    client: Client,
    base: Url,
}

impl TlogClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, TlogError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("scorecard-webapp")
            .build()
            .map_err(TlogError::Transport)?;
        Ok(Self { client, base })
    }

    /// Entry IDs whose payload hash matches `payload`, oldest first.
    pub async fn entries_by_payload(&self, payload: &[u8]) -> Result<Vec<String>, TlogError> {
        let digest = Sha256::digest(payload);
        let path = "api/v1/index/retrieve";
        let response = self
            .client
            .post(self.endpoint(path))
            .json(&json!({ "hash": format!("sha256:{}", hex::encode(digest)) }))
            .header("accept", "application/json")
            .send()
            .await
            .map_err(TlogError::Transport)?;
        let response = Self::check_status(response, path)?;
        response.json().await.map_err(TlogError::Transport)
    }

    /// Fetch one entry by its ID.
    pub async fn entry_by_uuid(&self, uuid: &str) -> Result<(String, LogEntry), TlogError> {
        let path = format!("api/v1/log/entries/{uuid}");
        self.fetch_single(&path).await
    }

    /// Fetch one entry by its global log index.
    pub async fn entry_by_index(&self, index: u64) -> Result<(String, LogEntry), TlogError> {
        let path = format!("api/v1/log/entries?logIndex={index}");
        self.fetch_single(&path).await
    }

    async fn fetch_single(&self, path: &str) -> Result<(String, LogEntry), TlogError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .header("accept", "application/json")
            .send()
            .await
            .map_err(TlogError::Transport)?;
        let response = Self::check_status(response, path)?;
        let entries: HashMap<String, LogEntry> =
            response.json().await.map_err(TlogError::Transport)?;
        entries
            .into_iter()
            .next()
            .ok_or(TlogError::EmptyResponse)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base.as_str().trim_end_matches('/'))
    }

    fn check_status(
        response: reqwest::Response,
        path: &str,
    ) -> Result<reqwest::Response, TlogError> {
        if !response.status().is_success() {
            return Err(TlogError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response)
    }
}
