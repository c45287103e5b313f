//! pkgs-merge-bot: merge automation for a large package repository.
//!
//! The bot listens for GitHub webhook deliveries, recognizes
//! `@<bot> merge` commands on pull requests, authorizes them through a
//! fixed set of strategies, waits out CI, and merges through GraphQL.
//!
//! Module map:
//! - [`webhook`]: axum ingress, signature verification, event parsing
//! - [`bot`]: the decision pipeline
//! - [`strategy`]: command recognition and authorization strategies
//! - [`checks`]: CI check aggregation
//! - [`store`]: durable pending-merge store
//! - [`merge`]: staged merge execution
//! - [`github`]: API client and App authentication
//! - [`maintainers`]: package maintainer resolution

pub mod bot;
pub mod checks;
pub mod config;
pub mod error;
pub mod github;
pub mod maintainers;
pub mod merge;
pub mod store;
pub mod strategy;
pub mod types;
pub mod webhook;

pub use error::{Error, Result};
