//! The decision pipeline.
//!
//! One [`MergeBot`] instance handles every delivery: comment-shaped
//! events run the full command/authorization/check/merge pipeline,
//! check-run completions resume merges that were postponed on pending
//! CI. Outcomes are policy results, never errors; only infrastructure
//! failures propagate as `Err` (and trigger GitHub's redelivery).

use crate::checks::{self, CheckState};
use crate::config::Settings;
use crate::error::Result;
use crate::github::{GithubClient, ReactionTarget};
use crate::maintainers::MaintainerResolver;
use crate::merge::execute_merge;
use crate::store::PendingStore;
use crate::strategy::{self, Decision, StrategyContext};
use crate::types::{EventKind, MergeRequestEvent, Outcome, PendingMergeRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The bot: everything needed to decide and execute one merge request
pub struct MergeBot {
    client: Arc<dyn GithubClient>,
    resolver: Arc<dyn MaintainerResolver>,
    store: PendingStore,
    settings: Settings,
}

fn action_allowed(event: &MergeRequestEvent) -> bool {
    match event.kind {
        EventKind::IssueComment | EventKind::ReviewComment => {
            matches!(event.action.as_str(), "created" | "edited")
        }
        EventKind::Review => {
            matches!(event.action.as_str(), "submitted" | "edited" | "created")
        }
        EventKind::CheckRun => true,
    }
}

impl MergeBot {
    /// Wire up a bot over its collaborators.
    pub fn new(
        client: Arc<dyn GithubClient>,
        resolver: Arc<dyn MaintainerResolver>,
        store: PendingStore,
        settings: Settings,
    ) -> Self {
        Self {
            client,
            resolver,
            store,
            settings,
        }
    }

    /// Handle a comment-shaped event (issue comment, review, review
    /// comment).
    pub async fn handle_comment(&self, event: &MergeRequestEvent) -> Result<Outcome> {
        if event.is_bot {
            debug!(commenter = %event.commenter_login, "ignoring bot comment");
            return Ok(Outcome::IgnoreBot);
        }
        if !event.is_pull_request {
            debug!(issue_number = event.issue_number, "ignoring non-PR comment");
            return Ok(Outcome::IgnoreNotPr);
        }
        if !action_allowed(event) {
            debug!(action = %event.action, "ignoring action");
            return Ok(Outcome::IgnoreAction);
        }
        if !strategy::contains_merge_command(&event.text, &self.settings.bot_name)? {
            return Ok(Outcome::NoCommand);
        }

        info!(
            pr_number = event.issue_number,
            commenter = %event.commenter_login,
            "merge command received"
        );
        self.run_merge(event).await
    }

    /// Handle a check-run event: completed runs resume any merges
    /// postponed on the run's head commit.
    pub async fn handle_check_run(&self, event: &MergeRequestEvent) -> Result<Outcome> {
        if event.check_status.as_deref() != Some("completed") {
            return Ok(Outcome::IgnoreAction);
        }
        let Some(sha) = event.head_sha.as_deref() else {
            return Ok(Outcome::IgnoreAction);
        };

        let records = self.store.get(sha)?;
        if records.is_empty() {
            return Ok(Outcome::IgnoreAction);
        }
        info!(sha, count = records.len(), "resuming postponed merges");

        let mut outcome = Outcome::IgnoreAction;
        for record in records {
            // consume before replaying so a concurrent delivery of the
            // same completion cannot merge twice
            self.store.delete(sha, &record)?;
            match self.resume(event, &record).await {
                Ok(o) => outcome = o,
                Err(e) => {
                    // put the record back so a redelivery can retry
                    warn!(sha, comment_id = record.comment_id, error = %e, "resume failed");
                    self.store.add(sha, &record)?;
                    return Err(e);
                }
            }
        }
        Ok(outcome)
    }

    /// Re-run the pipeline for one stored record, against the current
    /// head SHA.
    async fn resume(
        &self,
        event: &MergeRequestEvent,
        record: &PendingMergeRecord,
    ) -> Result<Outcome> {
        let comment = self
            .client
            .issue_comment(&event.repo_owner, &event.repo_name, record.comment_id)
            .await?;

        let replay = MergeRequestEvent {
            kind: EventKind::IssueComment,
            commenter_id: comment.user_id,
            commenter_login: comment.user_login,
            text: comment.body,
            action: "created".to_string(),
            comment_id: comment.id,
            repo_owner: event.repo_owner.clone(),
            repo_name: event.repo_name.clone(),
            issue_number: record.issue_number,
            is_bot: false,
            is_pull_request: true,
            head_sha: None,
            check_status: None,
        };
        self.handle_comment(&replay).await
    }

    async fn run_merge(&self, event: &MergeRequestEvent) -> Result<Outcome> {
        let pr = self
            .client
            .pull_request(&event.repo_owner, &event.repo_name, event.issue_number)
            .await?;
        let files = self
            .client
            .pull_request_files(&event.repo_owner, &event.repo_name, pr.number)
            .await?;

        self.resolver.refresh().await?;
        let ctx = StrategyContext {
            client: self.client.as_ref(),
            resolver: self.resolver.as_ref(),
            settings: &self.settings,
        };
        match strategy::evaluate(&ctx, &pr, event, &files).await? {
            Decision::Declined(reasons) => {
                info!(pr_number = pr.number, ?reasons, "merge not permitted");
                let body = format!(
                    "@{} merge not permitted: \n{}",
                    event.commenter_login,
                    reasons.join("\n")
                );
                self.client
                    .create_issue_comment(&event.repo_owner, &event.repo_name, pr.number, &body)
                    .await?;
                return Ok(Outcome::NotPermitted);
            }
            Decision::Accepted(s) => {
                info!(pr_number = pr.number, strategy = ?s, "merge permitted");
            }
        }

        let target = match event.kind {
            EventKind::ReviewComment => ReactionTarget::ReviewComment,
            _ => ReactionTarget::IssueComment,
        };
        self.client
            .create_reaction(
                &event.repo_owner,
                &event.repo_name,
                event.comment_id,
                target,
                "rocket",
            )
            .await?;

        let outcome = checks::aggregate(
            self.client.as_ref(),
            &self.settings,
            &event.repo_owner,
            &event.repo_name,
            &pr.head_sha,
        )
        .await?;

        match outcome.state() {
            CheckState::Pending => {
                let record = PendingMergeRecord {
                    issue_number: pr.number,
                    commenter_id: event.commenter_id,
                    commenter_login: event.commenter_login.clone(),
                    comment_id: event.comment_id,
                };
                self.store.add(&pr.head_sha, &record)?;
                info!(pr_number = pr.number, sha = %pr.head_sha, "merge postponed on checks");
                let body = format!(
                    "@{} one or more checks are still pending, the merge will be \
                     performed once they succeed",
                    event.commenter_login
                );
                self.client
                    .create_issue_comment(&event.repo_owner, &event.repo_name, pr.number, &body)
                    .await?;
                Ok(Outcome::MergePostponed)
            }
            CheckState::Failed => {
                info!(pr_number = pr.number, "merge blocked by failed checks");
                let body = format!(
                    "@{} merge not permitted: \n{}",
                    event.commenter_login,
                    outcome.failures().join("\n")
                );
                self.client
                    .create_issue_comment(&event.repo_owner, &event.repo_name, pr.number, &body)
                    .await?;
                Ok(Outcome::NotPermittedCheckRunFailed)
            }
            CheckState::Success => match execute_merge(self.client.as_ref(), &pr).await {
                Ok(mode) => {
                    info!(pr_number = pr.number, %mode, "merge completed");
                    self.client
                        .create_issue_comment(
                            &event.repo_owner,
                            &event.repo_name,
                            pr.number,
                            "Merge completed",
                        )
                        .await?;
                    Ok(Outcome::Merged)
                }
                Err(e) => {
                    warn!(pr_number = pr.number, error = %e, "merge failed");
                    let body = format!(
                        "@{} merge failed:\n```\n{e}\n```",
                        event.commenter_login
                    );
                    self.client
                        .create_issue_comment(&event.repo_owner, &event.repo_name, pr.number, &body)
                        .await?;
                    Ok(Outcome::MergeFailed)
                }
            },
        }
    }
}
