//! Event parsing - normalizes webhook payload shapes.
//!
//! GitHub delivers four payload shapes we care about (issue comment,
//! PR review, PR review comment, check-run). Each is normalized into
//! one canonical [`MergeRequestEvent`] so the pipeline never looks at
//! raw JSON. Partially-populated payloads are tolerated: a missing
//! `action` key defaults to `"created"`.
//!
//! Bot-originated comments and comments on plain issues are flagged
//! here for early rejection. That flagging is a security control: it
//! keeps the bot's own confirmation comments (and other bots) from
//! re-triggering merges.

use crate::error::{Error, Result};
use crate::types::{EventKind, MergeRequestEvent};
use serde::Deserialize;

fn default_action() -> String {
    "created".to_string()
}

#[derive(Debug, Deserialize)]
struct User {
    id: u64,
    login: String,
    #[serde(rename = "type", default)]
    kind: String,
}

impl User {
    fn is_bot(&self) -> bool {
        self.kind == "Bot"
    }
}

#[derive(Debug, Deserialize)]
struct Comment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    user: User,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    owner: Owner,
}

#[derive(Debug, Deserialize)]
struct IssueRef {
    number: u64,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IssueCommentPayload {
    #[serde(default = "default_action")]
    action: String,
    comment: Comment,
    repository: Repository,
    issue: IssueRef,
}

#[derive(Debug, Deserialize)]
struct Review {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    user: User,
}

#[derive(Debug, Deserialize)]
struct PrRef {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    #[serde(default = "default_action")]
    action: String,
    review: Review,
    repository: Repository,
    pull_request: PrRef,
}

#[derive(Debug, Deserialize)]
struct ReviewCommentPayload {
    #[serde(default = "default_action")]
    action: String,
    comment: Comment,
    repository: Repository,
    pull_request: PrRef,
}

#[derive(Debug, Deserialize)]
struct CheckRunInner {
    head_sha: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct CheckRunPayload {
    check_run: CheckRunInner,
    repository: Repository,
}

fn parse<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::Payload(format!("invalid json: {e}")))
}

/// Parse an `issue_comment` payload.
pub fn parse_issue_comment(body: &[u8]) -> Result<MergeRequestEvent> {
    let payload: IssueCommentPayload = parse(body)?;
    Ok(MergeRequestEvent {
        kind: EventKind::IssueComment,
        commenter_id: payload.comment.user.id,
        commenter_login: payload.comment.user.login.clone(),
        text: payload.comment.body.unwrap_or_default(),
        action: payload.action,
        comment_id: payload.comment.id,
        repo_owner: payload.repository.owner.login,
        repo_name: payload.repository.name,
        issue_number: payload.issue.number,
        is_bot: payload.comment.user.is_bot(),
        is_pull_request: payload.issue.pull_request.is_some(),
        head_sha: None,
        check_status: None,
    })
}

/// Parse a `pull_request_review` payload.
pub fn parse_review(body: &[u8]) -> Result<MergeRequestEvent> {
    let payload: ReviewPayload = parse(body)?;
    Ok(MergeRequestEvent {
        kind: EventKind::Review,
        commenter_id: payload.review.user.id,
        commenter_login: payload.review.user.login.clone(),
        text: payload.review.body.unwrap_or_default(),
        action: payload.action,
        comment_id: payload.review.id,
        repo_owner: payload.repository.owner.login,
        repo_name: payload.repository.name,
        issue_number: payload.pull_request.number,
        is_bot: payload.review.user.is_bot(),
        is_pull_request: true,
        head_sha: None,
        check_status: None,
    })
}

/// Parse a `pull_request_review_comment` payload.
pub fn parse_review_comment(body: &[u8]) -> Result<MergeRequestEvent> {
    let payload: ReviewCommentPayload = parse(body)?;
    Ok(MergeRequestEvent {
        kind: EventKind::ReviewComment,
        commenter_id: payload.comment.user.id,
        commenter_login: payload.comment.user.login.clone(),
        text: payload.comment.body.unwrap_or_default(),
        action: payload.action,
        comment_id: payload.comment.id,
        repo_owner: payload.repository.owner.login,
        repo_name: payload.repository.name,
        issue_number: payload.pull_request.number,
        is_bot: payload.comment.user.is_bot(),
        is_pull_request: true,
        head_sha: None,
        check_status: None,
    })
}

/// Parse a `check_run` payload.
///
/// Check-run events have no commenter; the commenter fields come from
/// stored pending-merge records when the event resolves one.
pub fn parse_check_run(body: &[u8]) -> Result<MergeRequestEvent> {
    let payload: CheckRunPayload = parse(body)?;
    Ok(MergeRequestEvent {
        kind: EventKind::CheckRun,
        commenter_id: 0,
        commenter_login: String::new(),
        text: String::new(),
        action: default_action(),
        comment_id: 0,
        repo_owner: payload.repository.owner.login,
        repo_name: payload.repository.name,
        issue_number: 0,
        is_bot: false,
        is_pull_request: true,
        head_sha: Some(payload.check_run.head_sha),
        check_status: Some(payload.check_run.status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_comment_body(user_type: &str, with_pr: bool, action: Option<&str>) -> Vec<u8> {
        let mut issue = json!({"number": 123});
        if with_pr {
            issue["pull_request"] = json!({"url": "https://api.github.com/..."});
        }
        let mut payload = json!({
            "comment": {
                "id": 9001,
                "body": "@bot merge",
                "user": {"id": 42, "login": "alice", "type": user_type},
            },
            "repository": {"name": "pkgs", "owner": {"login": "pkgs-org"}},
            "issue": issue,
        });
        if let Some(action) = action {
            payload["action"] = json!(action);
        }
        serde_json::to_vec(&payload).unwrap()
    }

    #[test]
    fn test_issue_comment_normalized() {
        let event =
            parse_issue_comment(&issue_comment_body("User", true, Some("created"))).unwrap();
        assert_eq!(event.kind, EventKind::IssueComment);
        assert_eq!(event.commenter_id, 42);
        assert_eq!(event.commenter_login, "alice");
        assert_eq!(event.text, "@bot merge");
        assert_eq!(event.comment_id, 9001);
        assert_eq!(event.repo_owner, "pkgs-org");
        assert_eq!(event.repo_name, "pkgs");
        assert_eq!(event.issue_number, 123);
        assert!(!event.is_bot);
        assert!(event.is_pull_request);
    }

    #[test]
    fn test_missing_action_defaults_to_created() {
        let event = parse_issue_comment(&issue_comment_body("User", true, None)).unwrap();
        assert_eq!(event.action, "created");
    }

    #[test]
    fn test_bot_commenter_flagged() {
        let event = parse_issue_comment(&issue_comment_body("Bot", true, Some("created"))).unwrap();
        assert!(event.is_bot);
    }

    #[test]
    fn test_plain_issue_flagged() {
        let event =
            parse_issue_comment(&issue_comment_body("User", false, Some("created"))).unwrap();
        assert!(!event.is_pull_request);
    }

    #[test]
    fn test_malformed_json_is_payload_error() {
        let result = parse_issue_comment(b"{not json");
        assert!(matches!(result, Err(Error::Payload(_))));
    }

    #[test]
    fn test_review_normalized() {
        let body = serde_json::to_vec(&json!({
            "action": "submitted",
            "review": {
                "id": 7007,
                "body": "@bot merge",
                "user": {"id": 42, "login": "alice", "type": "User"},
            },
            "repository": {"name": "pkgs", "owner": {"login": "pkgs-org"}},
            "pull_request": {"number": 123},
        }))
        .unwrap();
        let event = parse_review(&body).unwrap();
        assert_eq!(event.kind, EventKind::Review);
        assert_eq!(event.action, "submitted");
        assert_eq!(event.comment_id, 7007);
        assert_eq!(event.issue_number, 123);
        assert!(event.is_pull_request);
    }

    #[test]
    fn test_review_with_null_body() {
        let body = serde_json::to_vec(&json!({
            "action": "submitted",
            "review": {
                "id": 7007,
                "body": null,
                "user": {"id": 42, "login": "alice", "type": "User"},
            },
            "repository": {"name": "pkgs", "owner": {"login": "pkgs-org"}},
            "pull_request": {"number": 123},
        }))
        .unwrap();
        let event = parse_review(&body).unwrap();
        assert_eq!(event.text, "");
    }

    #[test]
    fn test_check_run_normalized() {
        let body = serde_json::to_vec(&json!({
            "action": "completed",
            "check_run": {
                "head_sha": "abc123",
                "status": "completed",
                "conclusion": "success",
                "name": "tests",
            },
            "repository": {"name": "pkgs", "owner": {"login": "pkgs-org"}},
        }))
        .unwrap();
        let event = parse_check_run(&body).unwrap();
        assert_eq!(event.kind, EventKind::CheckRun);
        assert_eq!(event.head_sha.as_deref(), Some("abc123"));
        assert_eq!(event.check_status.as_deref(), Some("completed"));
    }
}
