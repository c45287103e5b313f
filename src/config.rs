//! Settings loaded from a TOML file.
//!
//! Required keys are validated at startup; a missing key is a config
//! error before the server binds, never a failure at request time.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,
    /// User or organization that installed the GitHub App
    pub github_app_login: String,
    /// GitHub App id
    pub github_app_id: u64,
    /// Path to the GitHub App private key (PEM)
    pub github_app_private_key: PathBuf,
    /// Local checkout used by the maintainer resolver
    pub repo_path: PathBuf,
    /// Root directory of the pending-merge store
    pub database_path: PathBuf,
    /// Handle the merge command is addressed to
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    /// Listen host
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Team whose members may merge via the committer strategy
    #[serde(default = "default_committer_team_slug")]
    pub committer_team_slug: String,
    /// Path prefix every changed file must lie under
    #[serde(default = "default_restricted_path_prefix")]
    pub restricted_path_prefix: String,
    /// Per-file size ceiling in bytes
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    /// Check producers whose queued/neutral runs are skipped entirely
    #[serde(default = "default_ignored_check_owners")]
    pub ignored_check_owners: Vec<String>,
    /// Automation account whose PRs the maintainer-update strategy covers
    #[serde(default = "default_trusted_update_author")]
    pub trusted_update_author: String,
    /// Bot account whose PRs the backport strategy covers
    #[serde(default = "default_backport_author")]
    pub backport_author: String,
    /// Branches the maintainer-update and committer strategies allow
    #[serde(default = "default_mergeable_branches")]
    pub mergeable_branches: Vec<String>,
    /// Branches the backport strategy allows
    #[serde(default = "default_backport_branches")]
    pub backport_branches: Vec<String>,
    /// Evaluate everything but skip comments, reactions, and merges
    #[serde(default)]
    pub dry_run: bool,
}

fn default_bot_name() -> String {
    "pkgs-merge-bot".to_string()
}

fn default_host() -> String {
    "[::]".to_string()
}

const fn default_port() -> u16 {
    3014
}

fn default_committer_team_slug() -> String {
    "committers".to_string()
}

fn default_restricted_path_prefix() -> String {
    "pkgs/by-name/".to_string()
}

const fn default_max_file_size_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_ignored_check_owners() -> Vec<String> {
    vec!["OfBorg".to_string()]
}

fn default_trusted_update_author() -> String {
    "r-ryantm".to_string()
}

fn default_backport_author() -> String {
    "nixpkgs-ci[bot]".to_string()
}

fn default_mergeable_branches() -> Vec<String> {
    vec![
        "master".to_string(),
        "staging".to_string(),
        "staging-next".to_string(),
    ]
}

fn default_backport_branches() -> Vec<String> {
    vec![
        "release-25.05".to_string(),
        "staging-25.05".to_string(),
        "staging-next-25.05".to_string(),
    ]
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        let settings: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

        if settings.webhook_secret.is_empty() {
            return Err(Error::Config("webhook_secret must not be empty".to_string()));
        }

        Ok(settings)
    }
}
