//! GitHub API client
//!
//! Provides the trait the decision pipeline talks to, plus the
//! production implementation authenticated as a GitHub App.

mod auth;
mod client;

pub use auth::{TokenCache, app_jwt};
pub use client::AppClient;

use crate::error::Result;
use crate::types::{
    ChangedFile, CheckRun, CombinedStatus, CommentInfo, PullRequest, TeamMember,
};
use async_trait::async_trait;

/// Merge modes, attempted in order by the merge executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeMode {
    /// Enable auto-merge; lands once required checks pass
    AutoMerge,
    /// Enqueue into the target branch's merge queue
    Enqueue,
    /// Merge directly
    Direct,
}

impl MergeMode {
    /// GraphQL mutation implementing this mode
    #[must_use]
    pub const fn mutation(self) -> &'static str {
        match self {
            Self::AutoMerge => "enablePullRequestAutoMerge",
            Self::Enqueue => "enqueuePullRequest",
            Self::Direct => "mergePullRequest",
        }
    }
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoMerge => write!(f, "auto-merge"),
            Self::Enqueue => write!(f, "merge queue"),
            Self::Direct => write!(f, "direct merge"),
        }
    }
}

/// Which reaction endpoint a comment lives behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTarget {
    /// Regular issue/PR comment
    IssueComment,
    /// Comment on a PR diff
    ReviewComment,
}

/// GitHub API operations the decision pipeline consumes.
///
/// This trait is the seam for testing: the pipeline never talks to the
/// network directly.
#[async_trait]
pub trait GithubClient: Send + Sync {
    /// Fetch a fresh pull request snapshot
    async fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest>;

    /// List the files changed by a pull request
    async fn pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>>;

    /// Size in bytes of one file at a ref, via a live content-length lookup
    async fn file_size(&self, owner: &str, repo: &str, path: &str, git_ref: &str) -> Result<u64>;

    /// Combined commit status (legacy statuses API)
    async fn combined_status(&self, owner: &str, repo: &str, sha: &str) -> Result<CombinedStatus>;

    /// All check-runs reported for a commit
    async fn check_runs(&self, owner: &str, repo: &str, sha: &str) -> Result<Vec<CheckRun>>;

    /// Members of an organization team
    async fn team_members(&self, org: &str, team_slug: &str) -> Result<Vec<TeamMember>>;

    /// Fetch one issue comment by id
    async fn issue_comment(&self, owner: &str, repo: &str, comment_id: u64)
    -> Result<CommentInfo>;

    /// Post a comment on an issue or pull request
    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<()>;

    /// Post a reaction on a comment
    async fn create_reaction(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
        target: ReactionTarget,
        content: &str,
    ) -> Result<()>;

    /// Run one merge mutation, guarded by the expected head SHA.
    ///
    /// A push that lands between evaluation and merge changes the head
    /// OID and makes the mutation fail instead of merging stale content.
    async fn merge_mutation(
        &self,
        mode: MergeMode,
        node_id: &str,
        expected_head_sha: &str,
    ) -> Result<()>;
}
