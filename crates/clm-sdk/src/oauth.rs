//! OAuth authorization-code flow and token lifecycle.
//!
//! [`TokenManager`] builds the consent URL, exchanges authorization codes,
//! refreshes expiring tokens and owns the single persisted token slot.
//! It holds no session state: credentials and the current token are
//! passed in by the caller and new tokens are handed back. Token requests
//! go through the same [`RetryPolicy`] as the REST calls.

use chrono::Utc;
use clm_models::{Credentials, Token, TokenResponse};
use tracing::{info, warn};

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::retry::RetryPolicy;
use crate::token_store::TokenStore;

/// Drives the OAuth endpoints of the authorization server.
#[derive(Debug, Clone)]
pub struct TokenManager {
    http: reqwest::Client,
    auth_base: Option<String>,
    scope: String,
    store: TokenStore,
    retry: RetryPolicy,
}

impl TokenManager {
    /// Build a manager from the resolved configuration.
    pub fn new(config: &ConsoleConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Build a manager sharing an existing HTTP client.
    pub fn with_client(config: &ConsoleConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            auth_base: config.auth_base_url().ok(),
            scope: config.scopes.join("%20"),
            store: TokenStore::new(config.token_path.clone()),
            retry: RetryPolicy::new(config.max_retries),
        }
    }

    /// The token slot backing this manager.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    fn auth_base(&self) -> Result<&str> {
        self.auth_base.as_deref().ok_or_else(|| {
            ConsoleError::Configuration(
                "authorization server is not configured (set CLM_AUTH_SERVER)".into(),
            )
        })
    }

    /// URL the operator opens to grant consent.
    ///
    /// Fields appear in the order `response_type`, `scope`, `client_id`,
    /// `redirect_uri`; the redirect URI is embedded as given.
    pub fn build_consent_url(
        &self,
        credentials: Option<&Credentials>,
        redirect_uri: &str,
    ) -> Result<String> {
        let client_id = credentials
            .filter(|c| c.has_client_id())
            .map(|c| c.client_id.as_str())
            .ok_or_else(|| {
                ConsoleError::Configuration("integration key (client id) is required".into())
            })?;
        let base = self.auth_base()?;

        Ok(format!(
            "{base}/oauth/auth?response_type=code&scope={scope}&client_id={client_id}&redirect_uri={redirect_uri}",
            scope = self.scope,
        ))
    }

    /// Exchange an authorization code for a token and persist it.
    pub async fn exchange_code(
        &self,
        credentials: Option<&Credentials>,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Token> {
        let creds = require_complete(credentials)?;
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
            ])
            .await?;

        let token = Token::from_response(response, Utc::now());
        self.store.persist(&token)?;
        info!(expires_in = token.expires_in, "authorization code exchanged");
        Ok(token)
    }

    /// Obtain a new token with `token`'s refresh token and persist it,
    /// replacing the stored one.
    pub async fn refresh(&self, credentials: Option<&Credentials>, token: &Token) -> Result<Token> {
        let creds = require_complete(credentials)?;
        if !token.can_refresh() {
            return Err(ConsoleError::Auth("token has no refresh token".into()));
        }
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", token.refresh_token.as_str()),
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
            ])
            .await?;

        let next = token.refreshed(response, Utc::now());
        self.store.persist(&next)?;
        info!(expires_in = next.expires_in, "token refreshed");
        Ok(next)
    }

    /// `true` while `token` is usable for at least the safety margin.
    pub fn is_valid(&self, token: &Token) -> bool {
        token.is_valid()
    }

    /// Write `token` to the slot.
    pub fn persist(&self, token: &Token) -> Result<()> {
        self.store.persist(token)
    }

    /// Read the persisted token, `None` when there is none.
    pub fn load(&self) -> Result<Option<Token>> {
        self.store.load()
    }

    /// Remove the persisted token. Never fails.
    pub fn delete(&self) -> bool {
        self.store.delete()
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let url = format!("{}/oauth/token", self.auth_base()?);
        let grant_type = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map_or("", |(_, v)| *v);

        let res = self
            .retry
            .send_verbatim("POST", &url, || self.http.post(&url).form(form))
            .await
            .inspect_err(|e| warn!(endpoint = %url, grant_type, error = %e, "token request failed"))?;

        let status = res.status();
        let text = res.text().await?;
        if status != reqwest::StatusCode::OK {
            warn!(endpoint = %url, grant_type, status = status.as_u16(), "token request rejected");
            return Err(ConsoleError::remote(Some(status.as_u16()), text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

fn require_complete(credentials: Option<&Credentials>) -> Result<&Credentials> {
    credentials.filter(|c| c.is_complete()).ok_or_else(|| {
        ConsoleError::Auth("integration key (client id) and secret key are required".into())
    })
}
