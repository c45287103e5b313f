//! GitHub App client implementation
//!
//! Typed API calls go through octocrab; endpoints octocrab has no
//! typed surface for (check-runs, team members, reactions, raw file
//! sizes) use plain reqwest with local response structs.

use crate::error::{Error, Result};
use crate::github::{GithubClient, MergeMode, ReactionTarget, TokenCache};
use crate::types::{
    ChangedFile, CheckRun, CombinedStatus, CommentInfo, PrState, PullRequest, TeamMember,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

const API_ROOT: &str = "https://api.github.com";
const RAW_ROOT: &str = "https://raw.githubusercontent.com";
const PER_PAGE: usize = 100;

#[derive(Deserialize)]
struct GraphQlResponse {
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: u64,
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct RawCombinedStatus {
    state: String,
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct RawApp {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCheckRun {
    name: String,
    status: String,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    app: Option<RawApp>,
}

#[derive(Debug, Deserialize)]
struct RawCheckRuns {
    check_runs: Vec<RawCheckRun>,
}

#[derive(Debug, Deserialize)]
struct RawTeamMember {
    id: u64,
    login: String,
}

/// GitHub client authenticated as an App installation.
///
/// With `dry_run` set, reads proceed normally but every write (comment,
/// reaction, merge) is logged and skipped.
pub struct AppClient {
    tokens: TokenCache,
    http: Client,
    dry_run: bool,
}

impl AppClient {
    /// Create a client from a token source.
    pub fn new(tokens: TokenCache, dry_run: bool) -> Result<Self> {
        let http = Client::builder()
            .user_agent("pkgs-merge-bot")
            .build()
            .map_err(|e| Error::GitHubApi(format!("failed to build http client: {e}")))?;
        Ok(Self {
            tokens,
            http,
            dry_run,
        })
    }

    /// octocrab handle carrying the current installation token.
    ///
    /// Rebuilt per call because the token rotates underneath us.
    async fn octocrab(&self) -> Result<Octocrab> {
        let token = self.tokens.token().await?;
        Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(Error::Octocrab)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let token = self.tokens.token().await?;
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GitHubStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("invalid response from {url}: {e}")))
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<()> {
        let token = self.tokens.token().await?;
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GitHubStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GithubClient for AppClient {
    async fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        debug!(owner, repo, number, "fetching pull request");
        let pr = self.octocrab().await?.pulls(owner, repo).get(number).await?;

        let user = pr
            .user
            .as_ref()
            .ok_or_else(|| Error::GitHubApi("pull request missing author".to_string()))?;
        let node_id = pr
            .node_id
            .clone()
            .ok_or_else(|| Error::GitHubApi("pull request missing node id".to_string()))?;
        let state = match pr.state {
            Some(octocrab::models::IssueState::Open) => PrState::Open,
            // IssueState is non-exhaustive
            Some(_) | None => PrState::Closed,
        };

        Ok(PullRequest {
            author_id: user.id.0,
            author_login: user.login.clone(),
            repo_owner: owner.to_string(),
            repo_name: repo.to_string(),
            number: pr.number,
            node_id,
            title: pr.title.clone().unwrap_or_default(),
            state,
            head_sha: pr.head.sha.clone(),
            base_ref: pr.base.ref_field.clone(),
        })
    }

    async fn pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>> {
        let mut files = Vec::new();
        for page in 1.. {
            let url = format!(
                "{API_ROOT}/repos/{owner}/{repo}/pulls/{number}/files?per_page={PER_PAGE}&page={page}"
            );
            let batch: Vec<RawFile> = self.get_json(&url).await?;
            let len = batch.len();
            files.extend(batch.into_iter().map(|f| ChangedFile {
                filename: f.filename,
            }));
            if len < PER_PAGE {
                break;
            }
        }
        debug!(number, count = files.len(), "fetched changed files");
        Ok(files)
    }

    async fn file_size(&self, owner: &str, repo: &str, path: &str, git_ref: &str) -> Result<u64> {
        // encode each segment on its own so slashes survive
        let encoded: Vec<String> = path
            .split('/')
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        let url = format!("{RAW_ROOT}/{owner}/{repo}/{git_ref}/{}", encoded.join("/"));

        let response = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("HEAD {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::GitHubStatus {
                status: status.as_u16(),
                url,
                body: String::new(),
            });
        }

        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::GitHubApi(format!("no content length for {url}")))
    }

    async fn combined_status(&self, owner: &str, repo: &str, sha: &str) -> Result<CombinedStatus> {
        let url = format!("{API_ROOT}/repos/{owner}/{repo}/commits/{sha}/status");
        let status: RawCombinedStatus = self.get_json(&url).await?;
        Ok(CombinedStatus {
            state: status.state,
            total_count: status.total_count,
        })
    }

    async fn check_runs(&self, owner: &str, repo: &str, sha: &str) -> Result<Vec<CheckRun>> {
        let mut runs = Vec::new();
        for page in 1.. {
            let url = format!(
                "{API_ROOT}/repos/{owner}/{repo}/commits/{sha}/check-runs?per_page={PER_PAGE}&page={page}"
            );
            let batch: RawCheckRuns = self.get_json(&url).await?;
            let len = batch.check_runs.len();
            runs.extend(batch.check_runs.into_iter().map(|run| CheckRun {
                name: run.name,
                app_name: run.app.and_then(|a| a.name).unwrap_or_default(),
                status: run.status,
                conclusion: run.conclusion,
            }));
            if len < PER_PAGE {
                break;
            }
        }
        debug!(sha, count = runs.len(), "fetched check runs");
        Ok(runs)
    }

    async fn team_members(&self, org: &str, team_slug: &str) -> Result<Vec<TeamMember>> {
        let mut members = Vec::new();
        for page in 1.. {
            let url = format!(
                "{API_ROOT}/orgs/{org}/teams/{team_slug}/members?per_page={PER_PAGE}&page={page}"
            );
            let batch: Vec<RawTeamMember> = self.get_json(&url).await?;
            let len = batch.len();
            members.extend(batch.into_iter().map(|m| TeamMember {
                id: m.id,
                login: m.login,
            }));
            if len < PER_PAGE {
                break;
            }
        }
        Ok(members)
    }

    async fn issue_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
    ) -> Result<CommentInfo> {
        let url = format!("{API_ROOT}/repos/{owner}/{repo}/issues/comments/{comment_id}");
        let comment: RawComment = self.get_json(&url).await?;
        Ok(CommentInfo {
            id: comment.id,
            body: comment.body.unwrap_or_default(),
            user_id: comment.user.id,
            user_login: comment.user.login,
        })
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<()> {
        if self.dry_run {
            info!(issue_number, body, "dry run: skipping comment");
            return Ok(());
        }
        self.octocrab()
            .await?
            .issues(owner, repo)
            .create_comment(issue_number, body)
            .await?;
        debug!(issue_number, "created comment");
        Ok(())
    }

    async fn create_reaction(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
        target: ReactionTarget,
        content: &str,
    ) -> Result<()> {
        if self.dry_run {
            info!(comment_id, content, "dry run: skipping reaction");
            return Ok(());
        }
        let segment = match target {
            ReactionTarget::IssueComment => "issues",
            ReactionTarget::ReviewComment => "pulls",
        };
        let url = format!("{API_ROOT}/repos/{owner}/{repo}/{segment}/comments/{comment_id}/reactions");
        self.post_json(&url, &serde_json::json!({ "content": content }))
            .await
    }

    async fn merge_mutation(
        &self,
        mode: MergeMode,
        node_id: &str,
        expected_head_sha: &str,
    ) -> Result<()> {
        if self.dry_run {
            info!(%mode, node_id, "dry run: skipping merge mutation");
            return Ok(());
        }

        let mutation = mode.mutation();
        let query = format!(
            "mutation($pullRequestId: ID!, $expectedHeadOid: GitObjectID!) {{\n\
             {mutation}(input: {{ pullRequestId: $pullRequestId, expectedHeadOid: $expectedHeadOid }}) {{\n\
             clientMutationId\n}}\n}}"
        );

        let response: GraphQlResponse = self
            .octocrab()
            .await?
            .graphql(&serde_json::json!({
                "query": query,
                "variables": {
                    "pullRequestId": node_id,
                    "expectedHeadOid": expected_head_sha,
                }
            }))
            .await
            .map_err(|e| Error::GitHubApi(format!("GraphQL mutation failed: {e}")))?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::GitHubStatus {
                status: 422,
                url: mutation.to_string(),
                body: messages.join(", "),
            });
        }

        debug!(%mode, node_id, "merge mutation succeeded");
        Ok(())
    }
}
