//! pkgs-merge-bot entry point

use anyhow::Context;
use clap::Parser;
use pkgs_merge_bot::bot::MergeBot;
use pkgs_merge_bot::config::Settings;
use pkgs_merge_bot::github::{AppClient, TokenCache};
use pkgs_merge_bot::maintainers::NixEvalResolver;
use pkgs_merge_bot::store::PendingStore;
use pkgs_merge_bot::webhook::signature::WebhookSecret;
use pkgs_merge_bot::webhook::{self, AppState};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "pkgs-merge-bot", about = "PR merge bot for package repositories")]
struct Cli {
    /// Path to the TOML settings file
    #[arg(long, env = "PKGS_MERGE_BOT_CONFIG", default_value = "settings.toml")]
    config: PathBuf,

    /// Override the listen host from the settings file
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port from the settings file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }

    let private_key = fs::read(&settings.github_app_private_key).with_context(|| {
        format!(
            "reading app private key {}",
            settings.github_app_private_key.display()
        )
    })?;
    let tokens = TokenCache::new(
        settings.github_app_id,
        &private_key,
        settings.github_app_login.clone(),
    )?;
    let client = Arc::new(AppClient::new(tokens, settings.dry_run)?);
    let resolver = Arc::new(NixEvalResolver::new(settings.repo_path.clone()));
    let store = PendingStore::open(settings.database_path.clone())?;
    let secret = Arc::new(WebhookSecret::new(settings.webhook_secret.clone()));

    let addr = format!("{}:{}", settings.host, settings.port);
    if settings.dry_run {
        info!("dry run enabled, no comments or merges will be made");
    }

    let bot = Arc::new(MergeBot::new(client, resolver, store, settings));
    let app = webhook::app(AppState { bot, secret });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening for webhook deliveries");
    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
