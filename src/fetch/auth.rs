//! Cached OAuth credential for the Drive read-only scope.
//!
//! The one-time browser consent that mints the first token happens outside
//! this tool; here we only load the cached token, check its expiry and
//! refresh it against the token endpoint, persisting the rotated token.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// On-disk shape of `token.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub expiry: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
    // The endpoint may rotate the refresh token; usually it does not.
    refresh_token: Option<String>,
}

pub struct CredentialStore {
    path: PathBuf,
    token: CachedToken,
}

impl CredentialStore {
    /// Load the cached token. A missing cache is fatal: the consent flow
    /// that creates it is out of scope here.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = fs::read_to_string(&path).with_context(|| {
            format!(
                "reading token cache {} (run the consent flow first)",
                path.display()
            )
        })?;
        let token: CachedToken = serde_json::from_str(&raw)
            .with_context(|| format!("parsing token cache {}", path.display()))?;
        Ok(Self { path, token })
    }

    /// Whether the access token is still usable, with a one minute margin.
    pub fn is_valid(&self) -> bool {
        Utc::now() + Duration::seconds(60) < self.token.expiry
    }

    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    /// Refresh the access token and rewrite the cache.
    pub fn refresh(&mut self, http: &Client) -> Result<()> {
        self.refresh_at(http, TOKEN_ENDPOINT)
    }

    /// Refresh if the cached token has expired.
    pub fn ensure_valid(&mut self, http: &Client) -> Result<()> {
        if !self.is_valid() {
            info!("access token expired; refreshing");
            self.refresh(http)?;
        }
        Ok(())
    }

    fn refresh_at(&mut self, http: &Client, endpoint: &str) -> Result<()> {
        let params = [
            ("client_id", self.token.client_id.as_str()),
            ("client_secret", self.token.client_secret.as_str()),
            ("refresh_token", self.token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response: RefreshResponse = http
            .post(endpoint)
            .form(&params)
            .send()
            .context("posting token refresh")?
            .error_for_status()
            .context("token refresh rejected")?
            .json()
            .context("decoding token refresh response")?;

        self.token.access_token = response.access_token;
        self.token.expiry = Utc::now() + Duration::seconds(response.expires_in);
        if let Some(rotated) = response.refresh_token {
            self.token.refresh_token = rotated;
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.token)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing token cache {}", self.path.display()))
    }
}
