//! The publication policy: a minimal-privilege, reproducibly-pinned shape
//! for the workflow that produced a submission.
//!
//! The rules mirror what the hosted service has always enforced: no global
//! env/defaults or write permissions, a single scorecard job on a stock
//! Ubuntu runner, an allowlisted step set, and commit pins that actually
//! belong to the repository they claim to come from.

use thiserror::Error;

use crate::forge::ForgeError;
use crate::forge::membership::{CommitCoord, CommitMembershipVerifier, is_commit_hash};

use super::model::{Job, Workflow};
use super::uses::parse_uses;

pub const SCORECARD_ACTION: &str = "ossf/scorecard-action";
pub const SCORECARD_IMAGE: &str = "gcr.io/openssf/scorecard-action";

const ALLOWED_RUNNERS: [&str; 4] = [
    "ubuntu-latest",
    "ubuntu-22.04",
    "ubuntu-20.04",
    "ubuntu-18.04",
];

const ALLOWED_STEPS: [&str; 6] = [
    "actions/checkout",
    SCORECARD_ACTION,
    "actions/upload-artifact",
    "github/codeql-action/upload-sarif",
    "step-security/harden-runner",
    SCORECARD_IMAGE,
];

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("workflow could not be parsed: {0}")]
    Parse(String),
    #[error("workflow contains global env vars or defaults")]
    GlobalVarsOrDefaults,
    #[error("global perm is set to write-all")]
    GlobalWriteAll,
    #[error("global perm for `{scope}` is set to write")]
    GlobalWrite { scope: String },
    #[error("workflow has no job that calls ossf/scorecard-action")]
    ScorecardJobNotFound,
    #[error("workflow has a non-scorecard job with id-token write permissions")]
    NonScorecardJobHasTokenWrite,
    #[error("scorecard job contains a container or services")]
    JobHasContainerOrServices,
    #[error("scorecard job should run on exactly one Ubuntu virtual environment")]
    ScorecardJobRunsOn,
    #[error("scorecard job contains env vars")]
    ScorecardJobEnvVars,
    #[error("scorecard job must not have defaults set")]
    ScorecardJobDefaults,
    #[error("scorecard job has a step without a `uses` clause")]
    EmptyStepUses,
    #[error("job has unallowed step `{name}`")]
    UnallowedStepName { name: String },
    #[error("imposter commit: `{hash}` does not belong to `{owner}/{repo}`")]
    ImposterCommit {
        owner: String,
        repo: String,
        hash: String,
    },
    #[error("error contacting source host while checking pinned commits")]
    Upstream(#[from] ForgeError),
}

impl PolicyError {
    /// Upstream failures are operational; everything else is the
    /// submitter's workflow being out of shape.
    pub fn is_violation(&self) -> bool {
        !matches!(self, Self::Upstream(_))
    }
}

/// Validate `content` against the publication policy, checking every pinned
/// step through `verifier`.
pub async fn verify_workflow(
    content: &str,
    verifier: &dyn CommitMembershipVerifier,
) -> Result<(), PolicyError> {
    let workflow =
        Workflow::parse(content).map_err(|err| PolicyError::Parse(err.to_string()))?;

    if workflow.env.is_some() || workflow.defaults.is_some() {
        return Err(PolicyError::GlobalVarsOrDefaults);
    }

    if let Some(permissions) = &workflow.permissions {
        if permissions.is_write_all() {
            return Err(PolicyError::GlobalWriteAll);
        }
        if let Some(scope) = permissions.write_scopes().first() {
            return Err(PolicyError::GlobalWrite {
                scope: scope.to_string(),
            });
        }
    }

    let (scorecard_job_id, scorecard_job) =
        find_scorecard_job(&workflow).ok_or(PolicyError::ScorecardJobNotFound)?;

    for (job_id, job) in &workflow.jobs {
        if job_id == scorecard_job_id {
            continue;
        }
        if let Some(permissions) = &job.permissions
            && permissions.scope("id-token") == Some("write")
        {
            return Err(PolicyError::NonScorecardJobHasTokenWrite);
        }
    }

    if scorecard_job.container.is_some() || scorecard_job.has_services() {
        return Err(PolicyError::JobHasContainerOrServices);
    }

    let labels = scorecard_job
        .runs_on
        .as_ref()
        .map(|runs_on| runs_on.labels())
        .unwrap_or_default();
    if labels.len() != 1 || !ALLOWED_RUNNERS.contains(&labels[0]) {
        return Err(PolicyError::ScorecardJobRunsOn);
    }

    if scorecard_job.env.is_some() {
        return Err(PolicyError::ScorecardJobEnvVars);
    }
    if scorecard_job.defaults.is_some() {
        return Err(PolicyError::ScorecardJobDefaults);
    }

    for step in &scorecard_job.steps {
        let uses = step.uses.as_deref().ok_or(PolicyError::EmptyStepUses)?;
        let parsed = parse_uses(uses);
        if !ALLOWED_STEPS.contains(&parsed.name) {
            return Err(PolicyError::UnallowedStepName {
                name: parsed.name.to_string(),
            });
        }
        // The container-image form carries no commit pin to check.
        if parsed.name != SCORECARD_IMAGE && is_commit_hash(parsed.reference) {
            check_pinned_commit(parsed.name, parsed.reference, verifier).await?;
        }
    }

    Ok(())
}

/// The first job with a step invoking the scorecard action, by either its
/// repository name or its published container image.
fn find_scorecard_job(workflow: &Workflow) -> Option<(&String, &Job)> {
    workflow.jobs.iter().find(|(_, job)| {
        job.steps.iter().any(|step| {
            step.uses
                .as_deref()
                .map(parse_uses)
                .is_some_and(|parsed| {
                    parsed.name == SCORECARD_ACTION || parsed.name == SCORECARD_IMAGE
                })
        })
    })
}

async fn check_pinned_commit(
    name: &str,
    hash: &str,
    verifier: &dyn CommitMembershipVerifier,
) -> Result<(), PolicyError> {
    let mut segments = name.splitn(3, '/');
    let (Some(owner), Some(repo)) = (segments.next(), segments.next()) else {
        return Err(PolicyError::UnallowedStepName {
            name: name.to_string(),
        });
    };
    let coord = CommitCoord::new(owner, repo, hash);
    if verifier.contains(&coord).await? {
        Ok(())
    } else {
        Err(PolicyError::ImposterCommit {
            owner: coord.owner,
            repo: coord.repo,
            hash: coord.hash,
        })
    }
}
