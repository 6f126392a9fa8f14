//! Canonical object paths and read-path input sanitization.
//!
//! Stored results live under `{host}/{org}/{repo}/results.json` with a
//! commit-qualified sibling at `{host}/{org}/{repo}/{sha}/results.json`.
//! Incoming path components are untrusted URL segments and must never be
//! able to escape the bucket prefix.

use thiserror::Error;

pub const RESULTS_FILE: &str = "results.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid inputs provided")]
    InvalidInputs,
}

/// The two canonical write paths for a verified submission.
pub fn result_paths(host: &str, org: &str, repo: &str, sha: &str) -> (String, String) {
    (
        format!("{host}/{org}/{repo}/{RESULTS_FILE}"),
        format!("{host}/{org}/{repo}/{sha}/{RESULTS_FILE}"),
    )
}

/// Sanitize read-path inputs into a bucket-relative object path.
///
/// The result matches exactly `*/*/*/results.json` (no commit) or
/// `*/*/*/*/results.json` (with commit); anything else is rejected.
pub fn sanitize_result_path(
    host: &str,
    org: &str,
    repo: &str,
    commit: Option<&str>,
) -> Result<String, PathError> {
    let mut components = vec![clean_component(host)?, clean_component(org)?, clean_component(repo)?];
    if let Some(commit) = commit {
        components.push(clean_component(commit)?);
    }
    components.push(RESULTS_FILE.to_string());

    let joined = components.join("/");
    let expected = if commit.is_some() { 5 } else { 4 };
    if !matches_shape(&joined, expected) {
        return Err(PathError::InvalidInputs);
    }
    Ok(joined)
}

fn clean_component(raw: &str) -> Result<String, PathError> {
    let cleaned: String = raw.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(PathError::InvalidInputs);
    }
    if cleaned.contains('/') || cleaned.contains('\\') {
        return Err(PathError::InvalidInputs);
    }
    Ok(cleaned)
}

fn matches_shape(path: &str, segments: usize) -> bool {
    let parts: Vec<&str> = path.split('/').collect();
    parts.len() == segments
        && parts[..segments - 1].iter().all(|p| !p.is_empty())
        && parts[segments - 1] == RESULTS_FILE
}
