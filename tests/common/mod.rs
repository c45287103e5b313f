//! Shared test fixtures

#![allow(dead_code)]

pub mod mock_github;

use pkgs_merge_bot::bot::MergeBot;
use pkgs_merge_bot::config::Settings;
use pkgs_merge_bot::store::PendingStore;
use pkgs_merge_bot::types::{
    CheckRun, EventKind, Maintainer, MergeRequestEvent, PrState, PullRequest, TeamMember,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use self::mock_github::{MockGitHub, MockResolver};

pub const OWNER: &str = "pkgs-org";
pub const REPO: &str = "pkgs";
pub const HEAD_SHA: &str = "abc123def456";
pub const PACKAGE_FILE: &str = "pkgs/by-name/he/hello/package.nix";

pub fn test_settings() -> Settings {
    let toml = r#"
        webhook_secret = "s3cret"
        github_app_login = "pkgs-org"
        github_app_id = 1234
        github_app_private_key = "/dev/null"
        repo_path = "/tmp/checkout"
        database_path = "/tmp/pending"
    "#;
    toml::from_str(toml).unwrap()
}

/// A bot wired to mocks, with the pending store on a tempdir
pub struct Harness {
    pub bot: MergeBot,
    pub gh: Arc<MockGitHub>,
    pub resolver: Arc<MockResolver>,
    pub store_root: PathBuf,
    _tmp: TempDir,
}

pub fn harness() -> Harness {
    harness_with_settings(test_settings())
}

pub fn harness_with_settings(settings: Settings) -> Harness {
    let tmp = TempDir::new().unwrap();
    let gh = Arc::new(MockGitHub::new());
    let resolver = Arc::new(MockResolver::new());
    let store = PendingStore::open(tmp.path()).unwrap();
    let bot = MergeBot::new(gh.clone(), resolver.clone(), store, settings);
    Harness {
        bot,
        gh,
        resolver,
        store_root: tmp.path().to_path_buf(),
        _tmp: tmp,
    }
}

pub fn pull_request(number: u64, author_id: u64, author_login: &str) -> PullRequest {
    PullRequest {
        author_id,
        author_login: author_login.to_string(),
        repo_owner: OWNER.to_string(),
        repo_name: REPO.to_string(),
        number,
        node_id: format!("PR_node_{number}"),
        title: "hello: 1.0 -> 1.1".to_string(),
        state: PrState::Open,
        head_sha: HEAD_SHA.to_string(),
        base_ref: "master".to_string(),
    }
}

pub fn comment_event(
    issue_number: u64,
    commenter_id: u64,
    commenter_login: &str,
    text: &str,
) -> MergeRequestEvent {
    MergeRequestEvent {
        kind: EventKind::IssueComment,
        commenter_id,
        commenter_login: commenter_login.to_string(),
        text: text.to_string(),
        action: "created".to_string(),
        comment_id: 9001,
        repo_owner: OWNER.to_string(),
        repo_name: REPO.to_string(),
        issue_number,
        is_bot: false,
        is_pull_request: true,
        head_sha: None,
        check_status: None,
    }
}

pub fn check_run_event(sha: &str, status: &str) -> MergeRequestEvent {
    MergeRequestEvent {
        kind: EventKind::CheckRun,
        commenter_id: 0,
        commenter_login: String::new(),
        text: String::new(),
        action: "created".to_string(),
        comment_id: 0,
        repo_owner: OWNER.to_string(),
        repo_name: REPO.to_string(),
        issue_number: 0,
        is_bot: false,
        is_pull_request: true,
        head_sha: Some(sha.to_string()),
        check_status: Some(status.to_string()),
    }
}

pub fn check_run(app: &str, status: &str, conclusion: Option<&str>) -> CheckRun {
    CheckRun {
        name: format!("{app}-check"),
        app_name: app.to_string(),
        status: status.to_string(),
        conclusion: conclusion.map(str::to_string),
    }
}

pub fn maintainer(github_id: u64, handle: &str) -> Maintainer {
    Maintainer {
        github_id,
        handle: handle.to_string(),
    }
}

pub fn team_member(id: u64, login: &str) -> TeamMember {
    TeamMember {
        id,
        login: login.to_string(),
    }
}
