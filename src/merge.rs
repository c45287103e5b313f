//! Merge execution.
//!
//! Repositories differ in which merge path is available: auto-merge
//! may be disabled, a merge queue may or may not exist. The executor
//! tries the modes in a fixed order and falls through to the next one
//! only when the error says the mode itself is unavailable; any other
//! error aborts the chain and surfaces to the commenter.

use crate::error::{Error, Result};
use crate::github::{GithubClient, MergeMode};
use crate::types::PullRequest;
use tracing::{debug, info};

/// Attempt order: least invasive first
const ATTEMPT_ORDER: [MergeMode; 3] = [MergeMode::AutoMerge, MergeMode::Enqueue, MergeMode::Direct];

/// Whether `error` means `mode` is unavailable on this repository, as
/// opposed to the merge itself being rejected.
fn allows_fallback(mode: MergeMode, error: &Error) -> bool {
    let Error::GitHubStatus { body, .. } = error else {
        return false;
    };
    let body = body.to_lowercase();
    match mode {
        MergeMode::AutoMerge => {
            body.contains("auto merge is not allowed")
                || body.contains("auto-merge is not allowed")
                || body.contains("clean status")
        }
        MergeMode::Enqueue => body.contains("merge queue") || body.contains("not allowed"),
        MergeMode::Direct => false,
    }
}

/// Merge `pr`, returning the mode that landed.
///
/// Every mutation is guarded by the head SHA the decision was made
/// against, so a push racing the merge fails the mutation instead of
/// landing unreviewed commits.
pub async fn execute_merge(client: &dyn GithubClient, pr: &PullRequest) -> Result<MergeMode> {
    for mode in ATTEMPT_ORDER {
        debug!(pr_number = pr.number, %mode, "attempting merge");
        match client
            .merge_mutation(mode, &pr.node_id, &pr.head_sha)
            .await
        {
            Ok(()) => {
                info!(pr_number = pr.number, %mode, "merged");
                return Ok(mode);
            }
            Err(e) if allows_fallback(mode, &e) => {
                debug!(pr_number = pr.number, %mode, error = %e, "mode unavailable, falling back");
            }
            Err(e) => return Err(e),
        }
    }
    Err(Error::Internal("merge attempt chain exhausted".to_string()))
}
