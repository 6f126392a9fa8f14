//! The publish-time verification pipeline.
//!
//! A submission is accepted only when an unbroken chain of evidence ties the
//! submitted bytes to a trusted workflow run: a transparency-log entry
//! commits to the payload hash, the log proves the entry's inclusion and
//! signs its timestamp, the embedded certificate chains to the trusted
//! roots and names the repository/branch/commit, the workflow file fetched
//! at that commit passes policy, and every commit the workflow pins really
//! belongs to the repository it names. Only then do the bytes land in the
//! bucket.

use anyhow::anyhow;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use scorecard_core::forge::membership::ForgeMembershipVerifier;
use scorecard_core::paths;
use scorecard_core::workflow::{PolicyError, verify_workflow};
use scorecard_signing::certs::CertError;
use scorecard_signing::tlog::HashedRecord;
use scorecard_signing::{CertInfo, ProofError, TlogError, certificates_from_pem, extract_cert_info, verify_log_entry};

use crate::state::ServerState;

pub const WORKFLOW_RESTRICTIONS_URL: &str =
    "https://github.com/ossf/scorecard-action#workflow-restrictions";

/// What the client POSTs.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedReport {
    pub result: String,
    pub branch: String,
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
    #[serde(rename = "tlogIndex", default)]
    pub tlog_index: Option<i64>,
}

/// Why a submission was turned away. These surface verbatim (with the
/// documentation link prepended) in the 400 response body.
#[derive(Debug, Error)]
pub enum RejectReason {
    #[error("transparency-log entry could not be decoded")]
    MalformedEntry,
    #[error("unexpected transparency-log entry kind `{0}`")]
    WrongEntryKind(String),
    #[error("unsupported payload hash algorithm `{0}`")]
    UnsupportedHashAlgorithm(String),
    #[error("submitted payload does not match the transparency-log entry")]
    PayloadMismatch,
    #[error(transparent)]
    Proof(ProofError),
    #[error(transparent)]
    Certificate(CertError),
    #[error("repository and branch of cert doesn't match that of request")]
    MismatchedCertAndRequest,
    #[error("branch of cert isn't the repo's default branch")]
    NotDefaultBranch,
    #[error(transparent)]
    Policy(PolicyError),
}

/// Pipeline outcome: a client-visible rejection or an operational failure.
/// Classification is pure; the HTTP layer maps the two kinds to 400/500.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{0}")]
    Reject(#[from] RejectReason),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Run the full verification pipeline and persist the report.
pub async fn process(
    state: &ServerState,
    host: &str,
    org: &str,
    repo: &str,
    report: &SubmittedReport,
) -> Result<(), PublishError> {
    let payload = report.result.as_bytes();

    // (1) Resolve the log entry for the payload.
    let (entry_id, entry) = resolve_log_entry(state, payload, report.tlog_index).await?;

    // (2) The entry must be a hashed record.
    let record = entry
        .decode_body()
        .map_err(|_| RejectReason::MalformedEntry)?;
    if record.kind != HashedRecord::KIND {
        return Err(RejectReason::WrongEntryKind(record.kind).into());
    }

    // (3) The record must commit to exactly the submitted bytes.
    if record.spec.data.hash.algorithm != "sha256" {
        return Err(
            RejectReason::UnsupportedHashAlgorithm(record.spec.data.hash.algorithm).into(),
        );
    }
    let digest = hex::encode(Sha256::digest(payload));
    if record.spec.data.hash.value.to_ascii_lowercase() != digest {
        return Err(RejectReason::PayloadMismatch.into());
    }

    // (4) The log must prove inclusion and sign the entry.
    verify_log_entry(&entry_id, &entry, &state.trust.log_key).map_err(RejectReason::Proof)?;

    // (5) Exactly one signing certificate.
    let bundle = base64_decode(&record.spec.signature.public_key.content)
        .ok_or(RejectReason::MalformedEntry)?;
    let certificates = certificates_from_pem(&bundle).map_err(RejectReason::Certificate)?;
    if certificates.len() > 1 {
        return Err(RejectReason::Certificate(CertError::MultipleCertificates).into());
    }
    let leaf = &certificates[0];

    // (6) Chain and time-window verification.
    state
        .trust
        .certificates
        .verify(leaf, entry.integrated_time)
        .map_err(RejectReason::Certificate)?;

    // (7) Provenance claims.
    let info = extract_cert_info(leaf).map_err(RejectReason::Certificate)?;

    // (8) The claims must match the request.
    if info.repo_full_name != format!("{org}/{repo}")
        || (info.repo_branch_ref != report.branch
            && info.repo_branch_ref != format!("refs/heads/{}", report.branch))
    {
        return Err(RejectReason::MismatchedCertAndRequest.into());
    }

    // (9)–(11) Source-repo checks, workflow fetch, policy.
    verify_workflow_content(state, org, repo, report, &info).await?;

    // (12) Persist to both canonical paths.
    write_report(state, host, org, repo, report, &info).await?;

    tracing::info!(
        host,
        org,
        repo,
        sha = %info.repo_sha,
        log_index = entry.log_index,
        "verified and published scorecard results"
    );
    Ok(())
}

async fn resolve_log_entry(
    state: &ServerState,
    payload: &[u8],
    tlog_index: Option<i64>,
) -> Result<(String, scorecard_signing::LogEntry), PublishError> {
    // An explicit index identifies the entry unambiguously; the
    // hash-lookup-take-newest path is a compatibility fallback.
    if let Some(index) = tlog_index.filter(|index| *index > 0) {
        return state
            .tlog
            .entry_by_index(index as u64)
            .await
            .map_err(classify_tlog_error);
    }

    let ids = state
        .tlog
        .entries_by_payload(payload)
        .await
        .map_err(classify_tlog_error)?;
    let Some(entry_id) = ids.last() else {
        return Err(PublishError::Internal(anyhow!(
            "no transparency log entries found for the submitted payload"
        )));
    };
    if ids.len() > 1 {
        tracing::warn!(
            matches = ids.len(),
            "multiple log entries match the payload; using the newest"
        );
    }
    state
        .tlog
        .entry_by_uuid(entry_id)
        .await
        .map_err(classify_tlog_error)
}

fn classify_tlog_error(err: TlogError) -> PublishError {
    PublishError::Internal(anyhow!(err).context("querying transparency log"))
}

async fn verify_workflow_content(
    state: &ServerState,
    org: &str,
    repo: &str,
    report: &SubmittedReport,
    info: &CertInfo,
) -> Result<(), PublishError> {
    let forge = state.forge.with_token(report.access_token.clone());

    let repository = forge
        .repository(org, repo)
        .await
        .map_err(|err| PublishError::Internal(anyhow!(err).context("fetching repository")))?;
    let default_branch = repository.default_branch;
    if report.branch != default_branch
        && report.branch != format!("refs/heads/{default_branch}")
    {
        return Err(RejectReason::NotDefaultBranch.into());
    }

    // The workflow file may live in a different repository (reusable
    // workflows); its coordinates come from the SAN URI path.
    let (workflow_org, workflow_repo, workflow_file) = split_workflow_path(&info.workflow_path)
        .ok_or(RejectReason::Certificate(CertError::MalformedWorkflowPath))?;

    // Same-repo submissions pin the workflow at the certificate's commit; a
    // cross-repo workflow is fetched at its own ref.
    let fetch_ref = if format!("{workflow_org}/{workflow_repo}") == info.repo_full_name {
        info.repo_sha.as_str()
    } else {
        info.workflow_ref.as_str()
    };
    let content = forge
        .file_at_ref(workflow_org, workflow_repo, workflow_file, fetch_ref)
        .await
        .map_err(|err| PublishError::Internal(anyhow!(err).context("fetching workflow file")))?;
    let content = String::from_utf8_lossy(&content);

    let verifier = ForgeMembershipVerifier::new(forge);
    verify_workflow(&content, &verifier)
        .await
        .map_err(|err| match err {
            PolicyError::Upstream(source) => PublishError::Internal(
                anyhow!(source).context("checking pinned commits against the source host"),
            ),
            violation => RejectReason::Policy(violation).into(),
        })
}

async fn write_report(
    state: &ServerState,
    host: &str,
    org: &str,
    repo: &str,
    report: &SubmittedReport,
    info: &CertInfo,
) -> Result<(), PublishError> {
    let (latest, qualified) = paths::result_paths(host, org, repo, &info.repo_sha);
    let bucket = &state.config.results_bucket;

    state
        .stores
        .write(bucket, &latest, report.result.as_bytes())
        .await
        .map_err(|err| PublishError::Internal(anyhow!(err).context("writing results object")))?;

    if info.repo_sha.is_empty() {
        tracing::debug!(host, org, repo, "certificate carried no commit; skipping commit path");
        return Ok(());
    }
    state
        .stores
        .write(bucket, &qualified, report.result.as_bytes())
        .await
        .map_err(|err| {
            PublishError::Internal(anyhow!(err).context("writing commit-qualified results object"))
        })?;
    Ok(())
}

fn base64_decode(value: &str) -> Option<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(value).ok()
}

/// `org/repo/rest/of/path` → (org, repo, rest).
fn split_workflow_path(path: &str) -> Option<(&str, &str, &str)> {
    let mut parts = path.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(org), Some(repo), Some(rest)) if !org.is_empty() && !repo.is_empty() && !rest.is_empty() => {
            Some((org, repo, rest))
        }
        _ => None,
    }
}

/// The stable, user-facing message for a rejected submission.
pub fn rejection_message(reason: &RejectReason) -> String {
    format!("Workflow validation failed, see {WORKFLOW_RESTRICTIONS_URL} for details. {reason}")
}
