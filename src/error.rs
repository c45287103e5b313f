//! Error types for pkgs-merge-bot
//!
//! Policy declines (a strategy saying "no") are not errors; they are
//! [`crate::types::Outcome`] values. This enum covers the transport,
//! authentication, and infrastructure failures around them.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// All error cases in pkgs-merge-bot
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Config error: {0}")]
    Config(String),

    /// Webhook payload could not be parsed
    #[error("Payload error: {0}")]
    Payload(String),

    /// GitHub API transport error (octocrab)
    #[error("GitHub API error: {0}")]
    Octocrab(#[from] octocrab::Error),

    /// GitHub API transport error (raw HTTP)
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// GitHub API answered with a non-success status.
    ///
    /// The status, URL, and body are kept separately because merge
    /// failures are reported back to the commenter verbatim.
    #[error("GitHub API returned {status} for {url}: {body}")]
    GitHubStatus {
        /// HTTP status code
        status: u16,
        /// Request URL or GraphQL mutation name
        url: String,
        /// Response body (or GraphQL error messages)
        body: String,
    },

    /// Pending-merge store error
    #[error("Store error: {0}")]
    Store(String),

    /// Maintainer resolution error
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
