//! Commit membership: does commit `H` belong to repository `owner/repo`?
//!
//! The answer is assembled from a minimum of source-host API calls: the tag
//! page first (every tag commit is a cheap positive), then a comparison
//! against the default branch, then release branches. Results are cached per
//! verifier instance; verifiers live for a single request, so a force-push
//! between requests can never serve a stale positive.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use semver::Version;

use super::{ForgeClient, ForgeError, Tag};

const TAG_PAGE_SIZE: usize = 100;
const RELEASE_PAGE_SIZE: usize = 100;
const MAX_BRANCH_PROBES: usize = 10;

const CODEQL_OWNER: &str = "github";
const CODEQL_REPO: &str = "codeql-action";

/// Identity of a commit inside a repository. The hash is stored lowercased
/// so cache lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitCoord {
    pub owner: String,
    pub repo: String,
    pub hash: String,
}

impl CommitCoord {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        hash: impl AsRef<str>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            hash: hash.as_ref().to_ascii_lowercase(),
        }
    }
}

/// True iff `value` looks like a full commit hash.
pub fn is_commit_hash(value: &str) -> bool {
    value.len() == 40 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// The one capability seam the policy engine depends on. The default
/// implementation talks to the source-host API; tests inject
/// [`AllowlistVerifier`].
#[async_trait]
pub trait CommitMembershipVerifier: Send + Sync {
    async fn contains(&self, coord: &CommitCoord) -> Result<bool, ForgeError>;
}

/// Source-host-backed verifier with a per-request positive cache.
pub struct ForgeMembershipVerifier {
    client: ForgeClient,
    contained: Mutex<HashSet<CommitCoord>>,
}

impl ForgeMembershipVerifier {
    pub fn new(client: ForgeClient) -> Self {
        Self {
            client,
            contained: Mutex::new(HashSet::new()),
        }
    }

    fn is_cached(&self, coord: &CommitCoord) -> bool {
        self.contained.lock().contains(coord)
    }

    fn mark(&self, coord: CommitCoord) {
        self.contained.lock().insert(coord);
    }

    async fn branch_contains(
        &self,
        coord: &CommitCoord,
        branch: &str,
    ) -> Result<bool, ForgeError> {
        let status = self
            .client
            .compare(&coord.owner, &coord.repo, branch, &coord.hash)
            .await?;
        // A 404 comparison means divergent histories, not an error.
        Ok(status.is_some_and(|s| s.contains_head()))
    }

    /// Candidate release branches, most recent release first. Commit-hash
    /// targets are recorded as contained directly instead of probed.
    async fn release_branch_candidates(
        &self,
        coord: &CommitCoord,
        tags: &[Tag],
    ) -> Result<Vec<String>, ForgeError> {
        if coord.owner == CODEQL_OWNER && coord.repo == CODEQL_REPO {
            return Ok(codeql_release_branches(tags));
        }

        let releases = self
            .client
            .releases(&coord.owner, &coord.repo, RELEASE_PAGE_SIZE)
            .await?;
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for release in releases {
            let target = release.target_commitish;
            if is_commit_hash(&target) {
                self.mark(CommitCoord::new(&coord.owner, &coord.repo, &target));
                continue;
            }
            if seen.insert(target.clone()) {
                candidates.push(target);
            }
        }
        Ok(candidates)
    }
}

#[async_trait]
impl CommitMembershipVerifier for ForgeMembershipVerifier {
    async fn contains(&self, coord: &CommitCoord) -> Result<bool, ForgeError> {
        let coord = CommitCoord::new(&coord.owner, &coord.repo, &coord.hash);
        if self.is_cached(&coord) {
            return Ok(true);
        }

        let tags = self
            .client
            .tags(&coord.owner, &coord.repo, TAG_PAGE_SIZE)
            .await?;
        for tag in &tags {
            self.mark(CommitCoord::new(&coord.owner, &coord.repo, &tag.commit.sha));
        }
        if self.is_cached(&coord) {
            return Ok(true);
        }

        let repository = self.client.repository(&coord.owner, &coord.repo).await?;
        let default_branch = repository.default_branch;
        if self.branch_contains(&coord, &default_branch).await? {
            self.mark(coord);
            return Ok(true);
        }

        let candidates = self.release_branch_candidates(&coord, &tags).await?;
        if self.is_cached(&coord) {
            return Ok(true);
        }

        for branch in candidates
            .iter()
            .filter(|branch| **branch != default_branch)
            .take(MAX_BRANCH_PROBES)
        {
            if self.branch_contains(&coord, branch).await? {
                self.mark(coord);
                return Ok(true);
            }
        }

        tracing::debug!(
            owner = %coord.owner,
            repo = %coord.repo,
            hash = %coord.hash,
            "commit not reachable from any probed branch"
        );
        Ok(false)
    }
}

/// `github/codeql-action` publishes hundreds of releases; instead of paging
/// them, derive `releases/vN` … `releases/v1` from the highest valid semver
/// major among the repository's tags, in descending order.
fn codeql_release_branches(tags: &[Tag]) -> Vec<String> {
    let mut max_major = 0u64;
    for tag in tags {
        let name = tag.name.strip_prefix('v').unwrap_or(&tag.name);
        if let Ok(version) = Version::parse(name) {
            max_major = max_major.max(version.major);
        }
    }
    (1..=max_major)
        .rev()
        .map(|major| format!("releases/v{major}"))
        .collect()
}

/// Fixed-answer verifier for tests: contains exactly the seeded coordinates.
#[derive(Default)]
pub struct AllowlistVerifier {
    allowed: HashSet<CommitCoord>,
}

impl AllowlistVerifier {
    pub fn new(allowed: impl IntoIterator<Item = CommitCoord>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

#[async_trait]
impl CommitMembershipVerifier for AllowlistVerifier {
    async fn contains(&self, coord: &CommitCoord) -> Result<bool, ForgeError> {
        let coord = CommitCoord::new(&coord.owner, &coord.repo, &coord.hash);
        Ok(self.allowed.contains(&coord))
    }
}
