//! Mock GitHub client and maintainer resolver for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use pkgs_merge_bot::error::{Error, Result};
use pkgs_merge_bot::github::{GithubClient, MergeMode, ReactionTarget};
use pkgs_merge_bot::maintainers::MaintainerResolver;
use pkgs_merge_bot::types::{
    ChangedFile, CheckRun, CombinedStatus, CommentInfo, Maintainer, PullRequest, TeamMember,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Call record for `create_issue_comment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentCall {
    pub issue_number: u64,
    pub body: String,
}

/// Call record for `create_reaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionCall {
    pub comment_id: u64,
    pub target: ReactionTarget,
    pub content: String,
}

/// Call record for `merge_mutation`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub mode: MergeMode,
    pub node_id: String,
    pub expected_head_sha: String,
}

/// Hand-written mock of the GitHub client.
///
/// Features:
/// - Configurable responses per PR / SHA / team
/// - Call tracking for verification
/// - Per-mode merge error injection for fallback-chain testing
#[derive(Default)]
pub struct MockGitHub {
    pr_responses: Mutex<HashMap<u64, PullRequest>>,
    files_responses: Mutex<HashMap<u64, Vec<ChangedFile>>>,
    file_sizes: Mutex<HashMap<String, u64>>,
    combined_status_responses: Mutex<HashMap<String, CombinedStatus>>,
    check_runs_responses: Mutex<HashMap<String, Vec<CheckRun>>>,
    team_members_responses: Mutex<HashMap<String, Vec<TeamMember>>>,
    comment_responses: Mutex<HashMap<u64, CommentInfo>>,
    // Call tracking
    pull_request_calls: Mutex<Vec<u64>>,
    comment_calls: Mutex<Vec<CommentCall>>,
    reaction_calls: Mutex<Vec<ReactionCall>>,
    merge_calls: Mutex<Vec<MergeCall>>,
    // Error injection: merge mutations fail with this body per mode
    merge_errors: Mutex<HashMap<MergeMode, String>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    // === Response setup ===

    pub fn set_pull_request(&self, pr: PullRequest) {
        self.pr_responses.lock().unwrap().insert(pr.number, pr);
    }

    pub fn set_files(&self, pr_number: u64, files: Vec<ChangedFile>) {
        self.files_responses.lock().unwrap().insert(pr_number, files);
    }

    pub fn set_file_size(&self, path: &str, size: u64) {
        self.file_sizes
            .lock()
            .unwrap()
            .insert(path.to_string(), size);
    }

    pub fn set_combined_status(&self, sha: &str, status: CombinedStatus) {
        self.combined_status_responses
            .lock()
            .unwrap()
            .insert(sha.to_string(), status);
    }

    pub fn set_check_runs(&self, sha: &str, runs: Vec<CheckRun>) {
        self.check_runs_responses
            .lock()
            .unwrap()
            .insert(sha.to_string(), runs);
    }

    pub fn set_team_members(&self, team_slug: &str, members: Vec<TeamMember>) {
        self.team_members_responses
            .lock()
            .unwrap()
            .insert(team_slug.to_string(), members);
    }

    pub fn set_comment(&self, comment: CommentInfo) {
        self.comment_responses
            .lock()
            .unwrap()
            .insert(comment.id, comment);
    }

    /// Make `merge_mutation` fail for one mode with the given body
    pub fn fail_merge(&self, mode: MergeMode, body: &str) {
        self.merge_errors
            .lock()
            .unwrap()
            .insert(mode, body.to_string());
    }

    // === Call verification ===

    pub fn pull_request_calls(&self) -> Vec<u64> {
        self.pull_request_calls.lock().unwrap().clone()
    }

    pub fn comment_calls(&self) -> Vec<CommentCall> {
        self.comment_calls.lock().unwrap().clone()
    }

    pub fn reaction_calls(&self) -> Vec<ReactionCall> {
        self.reaction_calls.lock().unwrap().clone()
    }

    pub fn merge_calls(&self) -> Vec<MergeCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    pub fn assert_no_merge(&self) {
        let calls = self.merge_calls();
        assert!(calls.is_empty(), "expected no merge calls, got: {calls:?}");
    }

    pub fn assert_no_api_writes(&self) {
        self.assert_no_merge();
        let comments = self.comment_calls();
        assert!(
            comments.is_empty(),
            "expected no comments, got: {comments:?}"
        );
        let reactions = self.reaction_calls();
        assert!(
            reactions.is_empty(),
            "expected no reactions, got: {reactions:?}"
        );
    }

    /// Assert the last posted comment contains `needle`
    pub fn assert_comment_containing(&self, needle: &str) {
        let calls = self.comment_calls();
        assert!(
            calls.iter().any(|c| c.body.contains(needle)),
            "expected a comment containing {needle:?}, got: {calls:?}"
        );
    }
}

#[async_trait]
impl GithubClient for MockGitHub {
    async fn pull_request(&self, _owner: &str, _repo: &str, number: u64) -> Result<PullRequest> {
        self.pull_request_calls.lock().unwrap().push(number);
        self.pr_responses
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| {
                Error::GitHubApi(format!("pull_request: no response configured for #{number}"))
            })
    }

    async fn pull_request_files(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>> {
        Ok(self
            .files_responses
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn file_size(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
        _git_ref: &str,
    ) -> Result<u64> {
        Ok(self
            .file_sizes
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0))
    }

    async fn combined_status(
        &self,
        _owner: &str,
        _repo: &str,
        sha: &str,
    ) -> Result<CombinedStatus> {
        Ok(self
            .combined_status_responses
            .lock()
            .unwrap()
            .get(sha)
            .cloned()
            .unwrap_or(CombinedStatus {
                state: "success".to_string(),
                total_count: 0,
            }))
    }

    async fn check_runs(&self, _owner: &str, _repo: &str, sha: &str) -> Result<Vec<CheckRun>> {
        Ok(self
            .check_runs_responses
            .lock()
            .unwrap()
            .get(sha)
            .cloned()
            .unwrap_or_default())
    }

    async fn team_members(&self, _org: &str, team_slug: &str) -> Result<Vec<TeamMember>> {
        Ok(self
            .team_members_responses
            .lock()
            .unwrap()
            .get(team_slug)
            .cloned()
            .unwrap_or_default())
    }

    async fn issue_comment(
        &self,
        _owner: &str,
        _repo: &str,
        comment_id: u64,
    ) -> Result<CommentInfo> {
        self.comment_responses
            .lock()
            .unwrap()
            .get(&comment_id)
            .cloned()
            .ok_or_else(|| {
                Error::GitHubApi(format!(
                    "issue_comment: no response configured for {comment_id}"
                ))
            })
    }

    async fn create_issue_comment(
        &self,
        _owner: &str,
        _repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<()> {
        self.comment_calls.lock().unwrap().push(CommentCall {
            issue_number,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn create_reaction(
        &self,
        _owner: &str,
        _repo: &str,
        comment_id: u64,
        target: ReactionTarget,
        content: &str,
    ) -> Result<()> {
        self.reaction_calls.lock().unwrap().push(ReactionCall {
            comment_id,
            target,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn merge_mutation(
        &self,
        mode: MergeMode,
        node_id: &str,
        expected_head_sha: &str,
    ) -> Result<()> {
        self.merge_calls.lock().unwrap().push(MergeCall {
            mode,
            node_id: node_id.to_string(),
            expected_head_sha: expected_head_sha.to_string(),
        });

        if let Some(body) = self.merge_errors.lock().unwrap().get(&mode) {
            return Err(Error::GitHubStatus {
                status: 422,
                url: mode.mutation().to_string(),
                body: body.clone(),
            });
        }
        Ok(())
    }
}

/// Mock maintainer resolver answering from a fixed path map
#[derive(Default)]
pub struct MockResolver {
    maintainers: Mutex<HashMap<String, Vec<Maintainer>>>,
    lookup_calls: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_maintainers(&self, path: &str, maintainers: Vec<Maintainer>) {
        self.maintainers
            .lock()
            .unwrap()
            .insert(path.to_string(), maintainers);
    }

    /// Paths that were looked up, in call order
    pub fn lookup_calls(&self) -> Vec<String> {
        self.lookup_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MaintainerResolver for MockResolver {
    async fn maintainers(&self, path: &str) -> Result<Vec<Maintainer>> {
        self.lookup_calls.lock().unwrap().push(path.to_string());
        Ok(self
            .maintainers
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }
}
