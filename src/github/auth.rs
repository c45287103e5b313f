//! GitHub App authentication.
//!
//! The bot authenticates as a GitHub App: a short-lived RS256 JWT
//! signed with the App's private key buys an installation access
//! token, which is what every API request actually carries.
//! Installation tokens are valid for an hour; we cache one and reuse
//! it for five minutes before fetching a fresh one.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const API_ROOT: &str = "https://api.github.com";
const TOKEN_TTL_SECS: i64 = 300;

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Sign a short-lived App JWT.
///
/// `iat` is backdated 60 seconds to tolerate clock skew between us and
/// GitHub; the token expires after 10 minutes, the maximum GitHub
/// accepts.
pub fn app_jwt(app_id: u64, key: &EncodingKey) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = AppClaims {
        iat: now - 60,
        exp: now + 600,
        iss: app_id.to_string(),
    };
    encode(&Header::new(Algorithm::RS256), &claims, key)
        .map_err(|e| Error::GitHubApi(format!("failed to sign app jwt: {e}")))
}

#[derive(Debug, Deserialize)]
struct InstallationAccount {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Installation {
    id: u64,
    account: InstallationAccount,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    token: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    fetched_at: DateTime<Utc>,
}

/// Caching source of installation access tokens.
///
/// The cache lock is held across a refresh so concurrent deliveries
/// never race to mint duplicate tokens.
pub struct TokenCache {
    app_id: u64,
    key: EncodingKey,
    login: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Build a cache from the App id, its private key (PEM), and the
    /// login of the account the App is installed on.
    pub fn new(app_id: u64, private_key_pem: &[u8], login: String) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| Error::Config(format!("failed to parse app private key: {e}")))?;
        let http = reqwest::Client::builder()
            .user_agent("pkgs-merge-bot")
            .build()
            .map_err(|e| Error::GitHubApi(format!("failed to build http client: {e}")))?;
        Ok(Self {
            app_id,
            key,
            login,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Return a valid installation token, refreshing if the cached one
    /// is older than five minutes.
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref()
            && Utc::now() - entry.fetched_at < Duration::seconds(TOKEN_TTL_SECS)
        {
            return Ok(entry.token.clone());
        }

        let token = self.fetch_token().await?;
        *cached = Some(CachedToken {
            token: token.clone(),
            fetched_at: Utc::now(),
        });
        Ok(token)
    }

    async fn fetch_token(&self) -> Result<String> {
        let jwt = app_jwt(self.app_id, &self.key)?;

        let url = format!("{API_ROOT}/app/installations");
        let installations: Vec<Installation> = self.get_as_app(&url, &jwt).await?;
        let installation = installations
            .into_iter()
            .find(|i| i.account.login == self.login)
            .ok_or_else(|| {
                Error::GitHubApi(format!("no app installation found for {}", self.login))
            })?;

        let url = format!(
            "{API_ROOT}/app/installations/{}/access_tokens",
            installation.id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&jwt)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GitHubStatus {
                status: status.as_u16(),
                url,
                body,
            });
        }

        let access: AccessToken = response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("invalid access token response: {e}")))?;
        tracing::debug!(app_id = self.app_id, "refreshed installation token");
        Ok(access.token)
    }

    async fn get_as_app<T: for<'de> Deserialize<'de>>(&self, url: &str, jwt: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(jwt)
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
}
