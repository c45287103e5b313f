//! Merge authorization strategies.
//!
//! A merge command is authorized when any one strategy accepts it.
//! Strategies run in a fixed order and the first acceptance wins;
//! decline reasons only surface when every strategy declined.
//!
//! Command recognition lives here too: a comment carries the command
//! when, after stripping HTML comments, it starts with
//! `@<bot> merge`. Stripping matters because GitHub's suggested-change
//! and template markup hides text inside `<!-- -->` blocks that was
//! never typed by the commenter.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::github::GithubClient;
use crate::maintainers::{MaintainerResolver, is_maintainer, package_attr};
use crate::types::{ChangedFile, MergeRequestEvent, PrState, PullRequest};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    // literal pattern, checked by the unit tests below
    Regex::new(r"(?s)<!--.*?-->").expect("valid literal pattern")
});

/// Whether `text` addresses the merge command to `bot_name`.
///
/// Case-sensitive, anchored to the start of the comment once HTML
/// comments and leading whitespace are stripped. A command buried
/// after other text does not count.
pub fn contains_merge_command(text: &str, bot_name: &str) -> Result<bool> {
    let stripped = HTML_COMMENT.replace_all(text, "");
    let pattern = format!(r"^@{}\s+merge\b", regex::escape(bot_name));
    let command = Regex::new(&pattern)
        .map_err(|e| Error::Internal(format!("invalid command pattern: {e}")))?;
    Ok(command.is_match(stripped.trim_start()))
}

/// The closed set of authorization strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Automated package update merged by a maintainer
    MaintainerUpdate,
    /// Any PR merged by a committer-team member
    CommitterMerge,
    /// Automated backport merged by a maintainer
    Backport,
}

/// Evaluation order; the first acceptance short-circuits
pub const EVALUATION_ORDER: [Strategy; 3] = [
    Strategy::MaintainerUpdate,
    Strategy::CommitterMerge,
    Strategy::Backport,
];

/// Result of walking all strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A strategy accepted; earlier declines are discarded
    Accepted(Strategy),
    /// Every strategy declined; deduplicated union of reasons
    Declined(Vec<String>),
}

/// Collaborators a strategy evaluation draws on
pub struct StrategyContext<'a> {
    /// GitHub API access for team membership and file sizes
    pub client: &'a dyn GithubClient,
    /// Maintainer lookup for touched packages
    pub resolver: &'a dyn MaintainerResolver,
    /// Policy knobs
    pub settings: &'a Settings,
}

impl Strategy {
    fn allowed_branches(self, settings: &Settings) -> &[String] {
        match self {
            Self::MaintainerUpdate | Self::CommitterMerge => &settings.mergeable_branches,
            Self::Backport => &settings.backport_branches,
        }
    }

    async fn authorize(
        self,
        ctx: &StrategyContext<'_>,
        pr: &PullRequest,
        event: &MergeRequestEvent,
        files: &[ChangedFile],
    ) -> Result<Vec<String>> {
        // shared limits gate everything else: a closed PR or a
        // disallowed branch declines without consulting maintainer
        // data or team rosters
        let limits =
            technical_limits_check(ctx, pr, files, self.allowed_branches(ctx.settings)).await?;
        if !limits.is_empty() {
            return Ok(limits);
        }

        let mut reasons = Vec::new();

        match self {
            Self::MaintainerUpdate => {
                if pr.author_login != ctx.settings.trusted_update_author {
                    reasons.push(format!(
                        "PR author is not {}",
                        ctx.settings.trusted_update_author
                    ));
                }
            }
            Self::Backport => {
                if pr.author_login != ctx.settings.backport_author {
                    reasons.push(format!("PR author is not {}", ctx.settings.backport_author));
                }
            }
            Self::CommitterMerge => {}
        }

        match self {
            Self::MaintainerUpdate | Self::Backport => {
                reasons.extend(maintainer_check(ctx.resolver, event, files).await?);
            }
            Self::CommitterMerge => {
                let members = ctx
                    .client
                    .team_members(&event.repo_owner, &ctx.settings.committer_team_slug)
                    .await?;
                if !members.iter().any(|m| m.id == event.commenter_id) {
                    reasons.push(format!(
                        "{} is not a member of the {} team",
                        event.commenter_login, ctx.settings.committer_team_slug
                    ));
                }
            }
        }

        Ok(reasons)
    }
}

/// Limits every strategy shares: PR state, target branch, path prefix,
/// and the per-file size ceiling.
async fn technical_limits_check(
    ctx: &StrategyContext<'_>,
    pr: &PullRequest,
    files: &[ChangedFile],
    allowed_branches: &[String],
) -> Result<Vec<String>> {
    let mut reasons = Vec::new();

    if pr.state != PrState::Open {
        reasons.push(format!("PR is {}", pr.state));
    }

    if !allowed_branches.contains(&pr.base_ref) {
        reasons.push(format!(
            "target branch {} is not in {}",
            pr.base_ref,
            allowed_branches.join(", ")
        ));
    }

    for file in files {
        if !file
            .filename
            .starts_with(&ctx.settings.restricted_path_prefix)
        {
            reasons.push(format!(
                "{} is not under {}",
                file.filename, ctx.settings.restricted_path_prefix
            ));
            continue;
        }

        let size = match ctx
            .client
            .file_size(&pr.repo_owner, &pr.repo_name, &file.filename, &pr.head_sha)
            .await
        {
            Ok(size) => size,
            // a file the PR removes has no content at the head ref
            Err(Error::GitHubStatus { status: 404, .. }) => 0,
            Err(e) => return Err(e),
        };
        if size > ctx.settings.max_file_size_bytes {
            reasons.push(format!(
                "{} is {size} bytes, above the {} byte limit",
                file.filename, ctx.settings.max_file_size_bytes
            ));
        }
    }

    Ok(reasons)
}

/// The commenter must maintain every package the PR touches.
async fn maintainer_check(
    resolver: &dyn MaintainerResolver,
    event: &MergeRequestEvent,
    files: &[ChangedFile],
) -> Result<Vec<String>> {
    let mut reasons = Vec::new();

    for file in files {
        let Some(attr) = package_attr(&file.filename) else {
            continue;
        };
        let maintainers = resolver.maintainers(&file.filename).await?;

        if maintainers.is_empty() {
            reasons.push(format!("{attr} has no maintainers with a GitHub id"));
        } else if !is_maintainer(&maintainers, event.commenter_id) {
            let handles: Vec<String> =
                maintainers.iter().map(|m| format!("@{}", m.handle)).collect();
            reasons.push(format!(
                "{} is not a maintainer of {attr}; maintainers are {}",
                event.commenter_login,
                handles.join(", ")
            ));
        }
    }

    Ok(reasons)
}

/// Walk the strategies in order.
///
/// The first acceptance wins and discards every reason accumulated so
/// far. On total failure the reasons are deduplicated preserving first
/// occurrence, since the shared limit checks repeat across strategies.
pub async fn evaluate(
    ctx: &StrategyContext<'_>,
    pr: &PullRequest,
    event: &MergeRequestEvent,
    files: &[ChangedFile],
) -> Result<Decision> {
    let mut all_reasons: Vec<String> = Vec::new();

    for strategy in EVALUATION_ORDER {
        let reasons = strategy.authorize(ctx, pr, event, files).await?;
        if reasons.is_empty() {
            debug!(?strategy, pr_number = pr.number, "strategy accepted");
            return Ok(Decision::Accepted(strategy));
        }
        debug!(?strategy, pr_number = pr.number, ?reasons, "strategy declined");
        for reason in reasons {
            if !all_reasons.contains(&reason) {
                all_reasons.push(reason);
            }
        }
    }

    Ok(Decision::Declined(all_reasons))
}
