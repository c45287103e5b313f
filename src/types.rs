//! Core types for pkgs-merge-bot

use serde::{Deserialize, Serialize};

/// Pull request state as reported by GitHub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    /// PR is open and can be merged
    Open,
    /// PR was closed or merged
    Closed,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Immutable snapshot of a pull request.
///
/// Created from one API response and never mutated. Every evaluation
/// re-fetches a fresh snapshot; the head SHA is never cached across
/// evaluations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Numeric GitHub id of the PR author
    pub author_id: u64,
    /// Login of the PR author
    pub author_login: String,
    /// Repository owner (user or organization)
    pub repo_owner: String,
    /// Repository name
    pub repo_name: String,
    /// PR number
    pub number: u64,
    /// GraphQL node id, required for merge mutations
    pub node_id: String,
    /// PR title
    pub title: String,
    /// Open/closed state
    pub state: PrState,
    /// Head commit SHA at fetch time
    pub head_sha: String,
    /// Target branch name
    pub base_ref: String,
}

/// Which webhook payload shape an event was normalized from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A comment on an issue or pull request
    IssueComment,
    /// A pull request review (the top-level review body)
    Review,
    /// A comment on a pull request diff
    ReviewComment,
    /// A check-run state change
    CheckRun,
}

/// Canonical triggering event, normalized from the four payload shapes.
///
/// Constructed once per webhook delivery and read-only afterwards.
#[derive(Debug, Clone)]
pub struct MergeRequestEvent {
    /// Payload shape this event came from
    pub kind: EventKind,
    /// Numeric GitHub id of the commenter (0 for check-run events)
    pub commenter_id: u64,
    /// Login of the commenter (empty for check-run events)
    pub commenter_login: String,
    /// Raw comment text
    pub text: String,
    /// Payload action, defaulting to "created" when absent
    pub action: String,
    /// Id of the triggering comment
    pub comment_id: u64,
    /// Repository owner
    pub repo_owner: String,
    /// Repository name
    pub repo_name: String,
    /// Issue or PR number the event targets (0 for check-run events)
    pub issue_number: u64,
    /// Whether the comment author is a bot account
    pub is_bot: bool,
    /// Whether the target issue is a pull request
    pub is_pull_request: bool,
    /// Head commit SHA (check-run events only)
    pub head_sha: Option<String>,
    /// Check-run status (check-run events only)
    pub check_status: Option<String>,
}

/// A file changed by a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Path of the file relative to the repository root
    pub filename: String,
}

/// One check-run reported for a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRun {
    /// Name of the check-run
    pub name: String,
    /// Name of the app that produced the run
    pub app_name: String,
    /// Status: queued, in_progress, or completed
    pub status: String,
    /// Conclusion, present once the run completed
    pub conclusion: Option<String>,
}

/// Combined commit status from the legacy statuses API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedStatus {
    /// Aggregate state: success, pending, or failure
    pub state: String,
    /// Number of individual statuses reported
    pub total_count: u32,
}

/// A member of a GitHub team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    /// Numeric GitHub id
    pub id: u64,
    /// Login
    pub login: String,
}

/// A registered package maintainer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    /// Numeric GitHub id, used for membership tests
    pub github_id: u64,
    /// GitHub handle, used in decline messages
    pub handle: String,
}

/// A fetched issue comment, used when resuming a pending merge
#[derive(Debug, Clone)]
pub struct CommentInfo {
    /// Comment id
    pub id: u64,
    /// Comment body text
    pub body: String,
    /// Numeric GitHub id of the comment author
    pub user_id: u64,
    /// Login of the comment author
    pub user_login: String,
}

/// Durable record of a merge request waiting on CI completion.
///
/// Keyed externally by head commit SHA in the pending-merge store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMergeRecord {
    /// PR number the merge was requested on
    pub issue_number: u64,
    /// Numeric GitHub id of the requester
    pub commenter_id: u64,
    /// Login of the requester
    pub commenter_login: String,
    /// Id of the triggering comment
    pub comment_id: u64,
}

/// Terminal outcome of handling one webhook delivery.
///
/// All of these answer with HTTP 200; only transport-level failures use
/// other status codes, so GitHub's redelivery is driven by genuine
/// failures and never by policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A strategy accepted and the merge mutation landed
    Merged,
    /// Checks still pending; a record was stored for later resumption
    MergePostponed,
    /// A strategy accepted but the merge API call failed
    MergeFailed,
    /// No strategy accepted the request
    NotPermitted,
    /// A strategy accepted but a check-run had failed
    NotPermittedCheckRunFailed,
    /// Comment did not contain the merge command
    NoCommand,
    /// Comment came from a bot account
    IgnoreBot,
    /// Target issue is not a pull request
    IgnoreNotPr,
    /// Payload action is not one we react to
    IgnoreAction,
}

impl Outcome {
    /// Tag used in the `{"action": ...}` response body
    #[must_use]
    pub const fn as_action(self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::MergePostponed => "merge-postponed",
            Self::MergeFailed => "merge-failed",
            Self::NotPermitted => "not-permitted",
            Self::NotPermittedCheckRunFailed => "not-permitted-check-run-failed",
            Self::NoCommand => "no-command",
            Self::IgnoreBot => "ignore-bot",
            Self::IgnoreNotPr => "ignore-not-pr",
            Self::IgnoreAction => "ignore-action",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_action())
    }
}
