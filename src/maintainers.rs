//! Package maintainer resolution.
//!
//! The maintainer-update strategy needs to know who maintains the
//! package a PR touches. The production resolver evaluates the package
//! metadata out of a local checkout with `nix-instantiate`; the trait
//! exists so tests can answer from a fixture instead.

use crate::error::{Error, Result};
use crate::types::Maintainer;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Source of maintainer sets, keyed by changed-file path
#[async_trait]
pub trait MaintainerResolver: Send + Sync {
    /// Bring the backing data up to date. Called once per evaluation,
    /// before any lookups.
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    /// Maintainers of the package owning `path`, or an empty set when
    /// the path does not resolve to a package.
    async fn maintainers(&self, path: &str) -> Result<Vec<Maintainer>>;
}

/// Whether `user_id` appears in a maintainer set
#[must_use]
pub fn is_maintainer(maintainers: &[Maintainer], user_id: u64) -> bool {
    maintainers.iter().any(|m| m.github_id == user_id)
}

/// Package attribute name for a path under `pkgs/by-name/`.
///
/// Paths look like `pkgs/by-name/he/hello/package.nix`; the fourth
/// segment is the attribute name.
#[must_use]
pub fn package_attr(path: &str) -> Option<&str> {
    path.split('/').nth(3)
}

#[derive(Debug, Deserialize)]
struct RawMaintainer {
    #[serde(default)]
    github: Option<String>,
    #[serde(default, rename = "githubId")]
    github_id: Option<u64>,
}

/// Resolver backed by a local checkout and `nix-instantiate`
pub struct NixEvalResolver {
    repo_path: PathBuf,
}

impl NixEvalResolver {
    /// Create a resolver over the checkout at `repo_path`.
    #[must_use]
    pub const fn new(repo_path: PathBuf) -> Self {
        Self { repo_path }
    }

    /// Bring the checkout up to date with upstream master.
    ///
    /// A hard reset keeps the checkout disposable: local state never
    /// influences evaluation.
    pub async fn refresh_checkout(&self) -> Result<()> {
        self.git(&["fetch", "origin", "master"]).await?;
        self.git(&["reset", "--hard", "origin/master"]).await?;
        debug!(repo = %self.repo_path.display(), "refreshed checkout");
        Ok(())
    }

    async fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::Resolver(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            return Err(Error::Resolver(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MaintainerResolver for NixEvalResolver {
    async fn refresh(&self) -> Result<()> {
        self.refresh_checkout().await
    }

    async fn maintainers(&self, path: &str) -> Result<Vec<Maintainer>> {
        let Some(attr) = package_attr(path) else {
            return Ok(Vec::new());
        };

        let expr = format!(
            r#"(import {} {{}}).{attr}.meta.maintainers or []"#,
            self.repo_path.display()
        );
        let output = Command::new("nix-instantiate")
            .args(["--eval", "--strict", "--json", "--expr", &expr])
            .output()
            .await
            .map_err(|e| Error::Resolver(format!("failed to run nix-instantiate: {e}")))?;

        if !output.status.success() {
            return Err(Error::Resolver(format!(
                "evaluation of {attr} failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let raw: Vec<RawMaintainer> = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::Resolver(format!("invalid maintainer data for {attr}: {e}")))?;

        // maintainers without a numeric GitHub id cannot be matched
        // against commenters and are dropped
        let maintainers: Vec<Maintainer> = raw
            .into_iter()
            .filter_map(|m| {
                let github_id = m.github_id?;
                Some(Maintainer {
                    github_id,
                    handle: m.github.unwrap_or_default(),
                })
            })
            .collect();

        debug!(attr, count = maintainers.len(), "resolved maintainers");
        Ok(maintainers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_attr_from_by_name_path() {
        assert_eq!(
            package_attr("pkgs/by-name/he/hello/package.nix"),
            Some("hello")
        );
    }

    #[test]
    fn test_package_attr_missing_segments() {
        assert_eq!(package_attr("pkgs/by-name/he"), None);
        assert_eq!(package_attr(""), None);
    }

    #[test]
    fn test_is_maintainer() {
        let maintainers = vec![
            Maintainer {
                github_id: 42,
                handle: "alice".to_string(),
            },
            Maintainer {
                github_id: 7,
                handle: "bob".to_string(),
            },
        ];
        assert!(is_maintainer(&maintainers, 42));
        assert!(!is_maintainer(&maintainers, 99));
        assert!(!is_maintainer(&[], 42));
    }
}
