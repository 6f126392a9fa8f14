//! Minimal source-host REST client.
//!
//! Only the handful of endpoints the verification pipeline needs: repository
//! metadata, file contents at a ref, tags, releases, and commit comparison.
//! The base URL is configurable so the integration suite can point the
//! client at a local mock.

pub mod membership;

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("source host returned status {status} for `{path}`")]
    Status { status: u16, path: String },
    #[error("source host transport error")]
    Transport(#[source] reqwest::Error),
    #[error("unsupported content encoding `{0}`")]
    Encoding(String),
    #[error("invalid base64 in file contents")]
    Content(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
    pub commit: TagCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagCommit {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub target_commitish: String,
}

#[derive(Debug, Deserialize)]
struct Contents {
    encoding: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct Comparison {
    status: String,
}

/// Relationship of `base` to `head` as reported by the compare endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareStatus {
    Identical,
    Behind,
    Ahead,
    Diverged,
}

impl CompareStatus {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "identical" => Some(Self::Identical),
            "behind" => Some(Self::Behind),
            "ahead" => Some(Self::Ahead),
            "diverged" => Some(Self::Diverged),
            _ => None,
        }
    }

    /// `head` is reachable from `base` iff `base` is behind or identical.
    pub fn contains_head(self) -> bool {
        matches!(self, Self::Behind | Self::Identical)
    }
}

#[derive(Clone)]
pub struct ForgeClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl ForgeClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ForgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("scorecard-webapp")
            .build()
            .map_err(ForgeError::Transport)?;
        Ok(Self {
            client,
            base,
            token: None,
        })
    }

    /// A copy of this client authenticating with `token`. Used to honor the
    /// per-request access token supplied by private-repo submissions.
    pub fn with_token(&self, token: Option<String>) -> Self {
        Self {
            client: self.client.clone(),
            base: self.base.clone(),
            token: token.or_else(|| self.token.clone()),
        }
    }

    pub async fn repository(&self, owner: &str, repo: &str) -> Result<Repository, ForgeError> {
        self.get_json(&format!("repos/{owner}/{repo}")).await
    }

    /// File bytes at `ref_`, decoded from the contents endpoint.
    pub async fn file_at_ref(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        ref_: &str,
    ) -> Result<Vec<u8>, ForgeError> {
        let contents: Contents = self
            .get_json(&format!("repos/{owner}/{repo}/contents/{path}?ref={ref_}"))
            .await?;
        if contents.encoding != "base64" {
            return Err(ForgeError::Encoding(contents.encoding));
        }
        let compact: String = contents
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Ok(STANDARD.decode(compact.as_bytes())?)
    }

    /// Most recent `per_page` tags.
    pub async fn tags(
        &self,
        owner: &str,
        repo: &str,
        per_page: usize,
    ) -> Result<Vec<Tag>, ForgeError> {
        self.get_json(&format!("repos/{owner}/{repo}/tags?per_page={per_page}"))
            .await
    }

    /// Most recent `per_page` releases, newest first.
    pub async fn releases(
        &self,
        owner: &str,
        repo: &str,
        per_page: usize,
    ) -> Result<Vec<Release>, ForgeError> {
        self.get_json(&format!("repos/{owner}/{repo}/releases?per_page={per_page}"))
            .await
    }

    /// Compare `base...head`. `None` means the histories have diverged to the
    /// point the source host cannot relate them (HTTP 404).
    pub async fn compare(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Option<CompareStatus>, ForgeError> {
        let path = format!("repos/{owner}/{repo}/compare/{base}...{head}");
        let response = self.send(&path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check_status(response, &path)?;
        let comparison: Comparison = response.json().await.map_err(ForgeError::Transport)?;
        Ok(CompareStatus::from_str(&comparison.status))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ForgeError> {
        let response = Self::check_status(self.send(path).await?, path)?;
        response.json().await.map_err(ForgeError::Transport)
    }

    async fn send(&self, path: &str) -> Result<reqwest::Response, ForgeError> {
        let url = format!("{}/{path}", self.base.as_str().trim_end_matches('/'));
        let mut request = self
            .client
            .get(url)
            .header("accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await.map_err(ForgeError::Transport)
    }

    fn check_status(
        response: reqwest::Response,
        path: &str,
    ) -> Result<reqwest::Response, ForgeError> {
        if !response.status().is_success() {
            return Err(ForgeError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response)
    }
}
