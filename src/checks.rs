//! CI check aggregation.
//!
//! Reduces everything GitHub reports for a commit (modern check-runs
//! plus the legacy combined status) into one tri-state answer. Pending
//! always wins over failed, failed over success, so a merge is never
//! attempted while any verdict is still outstanding.

use crate::config::Settings;
use crate::error::Result;
use crate::github::GithubClient;
use crate::types::CheckRun;
use tracing::debug;

/// Aggregate CI verdict for one commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Every relevant check concluded positively
    Success,
    /// At least one check has not concluded yet
    Pending,
    /// At least one check concluded negatively
    Failed,
}

/// Reduction result, carrying one message per failed check
#[derive(Debug, Clone, Default)]
pub struct CheckOutcome {
    pending: bool,
    failures: Vec<String>,
}

impl CheckOutcome {
    /// Resolve to the aggregate state. Pending dominates failed.
    #[must_use]
    pub fn state(&self) -> CheckState {
        if self.pending {
            CheckState::Pending
        } else if self.failures.is_empty() {
            CheckState::Success
        } else {
            CheckState::Failed
        }
    }

    /// Messages naming each failed check and its conclusion
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

const PASSING_CONCLUSIONS: &[&str] = &["success", "skipped", "neutral"];

fn is_ignored(run: &CheckRun, ignored_owners: &[String]) -> bool {
    ignored_owners.iter().any(|o| *o == run.app_name)
        && (run.status == "queued" || run.conclusion.as_deref() == Some("neutral"))
}

/// Reduce a set of check-runs to one outcome.
///
/// Runs from an ignored producer are skipped while queued or when they
/// concluded neutral, so a perpetually-queued advisory checker cannot
/// hold merges hostage. An empty relevant set is a success.
#[must_use]
pub fn reduce_check_runs(runs: &[CheckRun], ignored_owners: &[String]) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();

    for run in runs {
        if is_ignored(run, ignored_owners) {
            debug!(name = %run.name, app = %run.app_name, "ignoring check run");
            continue;
        }

        if run.status != "completed" {
            outcome.pending = true;
            continue;
        }

        match run.conclusion.as_deref() {
            Some(conclusion) if PASSING_CONCLUSIONS.contains(&conclusion) => {}
            Some(conclusion) => {
                outcome
                    .failures
                    .push(format!("Check `{}` concluded {conclusion}", run.name));
            }
            None => {
                outcome
                    .failures
                    .push(format!("Check `{}` completed without conclusion", run.name));
            }
        }
    }

    outcome
}

/// Fetch and reduce all CI signals for one commit.
///
/// The legacy combined status is consulted first: external CI that
/// still reports through the statuses API counts the same as a
/// check-run would.
pub async fn aggregate(
    client: &dyn GithubClient,
    settings: &Settings,
    owner: &str,
    repo: &str,
    sha: &str,
) -> Result<CheckOutcome> {
    let combined = client.combined_status(owner, repo, sha).await?;
    let mut outcome = if combined.total_count == 0 {
        CheckOutcome::default()
    } else {
        match combined.state.as_str() {
            "success" => CheckOutcome::default(),
            "pending" => CheckOutcome {
                pending: true,
                failures: Vec::new(),
            },
            state => CheckOutcome {
                pending: false,
                failures: vec![format!("Combined commit status is {state}")],
            },
        }
    };

    let runs = client.check_runs(owner, repo, sha).await?;
    let reduced = reduce_check_runs(&runs, &settings.ignored_check_owners);
    outcome.pending |= reduced.pending;
    outcome.failures.extend(reduced.failures);

    debug!(sha, state = ?outcome.state(), "aggregated checks");
    Ok(outcome)
}
