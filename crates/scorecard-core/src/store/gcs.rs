use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{BlobStore, StoreError};

const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// GCS backend speaking the JSON object API over HTTP.
///
/// `SCORECARD_GCS_ENDPOINT` redirects the store at an emulator; an optional
/// `SCORECARD_GCS_TOKEN` is attached as a bearer token. The production
/// deployment runs with workload identity, so anonymous access is the
/// default rather than an error.
pub struct GcsStore {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl GcsStore {
    pub fn new(timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::Transport)?;
        let endpoint = env::var("SCORECARD_GCS_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        let token = env::var("SCORECARD_GCS_TOKEN").ok();
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/b/{bucket}/o/{}?alt=media",
            self.endpoint,
            encode_object_name(path)
        )
    }

    fn upload_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={}",
            self.endpoint,
            encode_object_name(path)
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl BlobStore for GcsStore {
    fn scheme(&self) -> &'static str {
        "gs"
    }

    async fn write(&self, bucket: &str, path: &str, data: &[u8]) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.post(self.upload_url(bucket, path)))
            .header("content-type", "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(StoreError::Transport)?;
        if !response.status().is_success() {
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .authorize(self.client.get(self.object_url(bucket, path)))
            .send()
            .await
            .map_err(StoreError::Transport)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            }),
            status if status.is_success() => Ok(response
                .bytes()
                .await
                .map_err(StoreError::Transport)?
                .to_vec()),
            status => Err(StoreError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            }),
        }
    }
}

/// Percent-encode an object name for use inside a URL path segment. GCS
/// requires the `/` separators of the object name to be encoded too.
fn encode_object_name(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
