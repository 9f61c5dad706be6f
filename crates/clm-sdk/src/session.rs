//! Operator session and the console controller.
//!
//! A [`Session`] is the explicit per-operator context: credentials, the
//! live token, the selected account and the cached configuration list.
//! It is owned by the caller and only changed through [`Console`]
//! methods, which move it between two states:
//!
//! ```text
//!            load valid token / consent + exchange
//!  NoToken ───────────────────────────────────────▶ Authenticated
//!     ▲                                                 │  │
//!     │            refresh failed / disconnect          │  │ expired:
//!     └─────────────────────────────────────────────────┘  │ refresh ok
//!                                                          ▼
//!                                                    Authenticated
//! ```

use clm_models::{
    AccountId, ConfigurationList, Credentials, DocumentAttributes, TaskOutcome, Token,
};
use strum::Display;
use tracing::{info, warn};

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::gateway::GatewayClient;
use crate::oauth::TokenManager;

/// Authentication state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    /// No token held; the operator must go through consent.
    NoToken,
    /// A token is held. It may still need a refresh before use.
    Authenticated,
}

/// Per-operator context passed to every console operation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// OAuth client credentials for this session.
    pub credentials: Option<Credentials>,
    /// The live token, if any.
    pub token: Option<Token>,
    /// Account the REST calls are scoped to.
    pub account_id: Option<AccountId>,
    /// Configurations fetched for `account_id`.
    pub configurations: Option<ConfigurationList>,
}

impl Session {
    /// Fresh unauthenticated session.
    pub fn new(credentials: Option<Credentials>, account_id: Option<AccountId>) -> Self {
        Self {
            credentials,
            account_id,
            ..Self::default()
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        if self.token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::NoToken
        }
    }

    fn account(&self) -> Result<AccountId> {
        self.account_id
            .clone()
            .ok_or_else(|| ConsoleError::Configuration("account id is required".into()))
    }

    fn clear(&mut self) {
        self.token = None;
        self.configurations = None;
    }
}

/// Ties the token lifecycle to the gateway for one configuration.
#[derive(Debug, Clone)]
pub struct Console {
    config: ConsoleConfig,
    tokens: TokenManager,
    gateway: GatewayClient,
}

impl Console {
    /// Build the console components around one shared HTTP client.
    pub fn new(config: ConsoleConfig) -> Self {
        let http = reqwest::Client::new();
        Self {
            tokens: TokenManager::with_client(&config, http.clone()),
            gateway: GatewayClient::with_client(&config, http),
            config,
        }
    }

    /// Resolved configuration.
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Token manager.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// REST gateway.
    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    /// Session seeded with the configured credentials and account.
    pub fn session(&self) -> Session {
        Session::new(self.config.credentials(), self.config.account_id.clone())
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Pick up the persisted token at session start.
    ///
    /// A valid token authenticates the session. An expired one is refreshed
    /// once when credentials are available; if that fails the session
    /// stays unauthenticated. Malformed token files are reported as errors.
    pub async fn resume(&self, session: &mut Session) -> Result<SessionState> {
        if session.token.is_some() {
            return Ok(session.state());
        }
        let Some(stored) = self.tokens.load()? else {
            return Ok(SessionState::NoToken);
        };

        if self.tokens.is_valid(&stored) {
            info!("loaded existing valid token");
            session.token = Some(stored);
        } else if session.credentials.as_ref().is_some_and(Credentials::is_complete) {
            match self.tokens.refresh(session.credentials.as_ref(), &stored).await {
                Ok(next) => session.token = Some(next),
                Err(e) => warn!(error = %e, "stored token expired and could not be refreshed"),
            }
        } else {
            info!("stored token expired");
        }
        Ok(session.state())
    }

    /// Consent URL for the configured redirect URI.
    pub fn begin_login(&self, session: &Session) -> Result<String> {
        let url = self
            .tokens
            .build_consent_url(session.credentials.as_ref(), &self.config.redirect_uri)?;
        info!("generated consent URL");
        Ok(url)
    }

    /// Exchange the authorization code returned to the redirect URI.
    pub async fn complete_login<'s>(
        &self,
        session: &'s mut Session,
        code: &str,
    ) -> Result<&'s Token> {
        let token = self
            .tokens
            .exchange_code(session.credentials.as_ref(), code, &self.config.redirect_uri)
            .await?;
        session.configurations = None;
        Ok(session.token.insert(token))
    }

    /// A token that is valid for at least the safety margin.
    ///
    /// Refreshes an expiring token. If the refresh fails the session drops
    /// its token and an [`ConsoleError::Auth`] is returned so the caller
    /// sends the operator back through consent.
    pub async fn ensure_token(&self, session: &mut Session) -> Result<Token> {
        let Some(current) = session.token.as_ref() else {
            return Err(ConsoleError::Auth("not authenticated".into()));
        };
        if self.tokens.is_valid(current) {
            return Ok(current.clone());
        }

        match self.tokens.refresh(session.credentials.as_ref(), current).await {
            Ok(next) => {
                session.token = Some(next.clone());
                Ok(next)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                session.clear();
                Err(ConsoleError::Auth(format!("token refresh failed: {e}")))
            }
        }
    }

    /// Forget the token and delete the persisted copy.
    ///
    /// Returns whether a token file was removed.
    pub fn disconnect(&self, session: &mut Session) -> bool {
        session.clear();
        let removed = self.tokens.delete();
        info!(removed, "disconnected");
        removed
    }

    // ------------------------------------------------------------------
    // Remote operations
    // ------------------------------------------------------------------

    /// Configurations of the session's account, cached on the session.
    pub async fn configurations(&self, session: &mut Session, reload: bool) -> Result<ConfigurationList> {
        if !reload {
            if let Some(cached) = &session.configurations {
                return Ok(cached.clone());
            }
        }
        let account = session.account()?;
        let token = self.ensure_token(session).await?;
        let list = self.gateway.list_configurations(&token, &account).await?;
        session.configurations = Some(list.clone());
        Ok(list)
    }

    /// Launch a task for `configuration_href` with an XML payload.
    pub async fn create_task(
        &self,
        session: &mut Session,
        configuration_href: &str,
        xml_payload: &str,
    ) -> Result<TaskOutcome> {
        if xml_payload.trim().is_empty() {
            return Err(ConsoleError::Configuration("XML payload is required".into()));
        }
        let account = session.account()?;
        let token = self.ensure_token(session).await?;
        self.gateway
            .create_task(&token, &account, configuration_href, xml_payload)
            .await
    }

    /// Attributes of `document_id` in the session's account.
    pub async fn document_attributes(
        &self,
        session: &mut Session,
        document_id: &str,
    ) -> Result<DocumentAttributes> {
        let account = session.account()?;
        let token = self.ensure_token(session).await?;
        self.gateway
            .document_attributes(&token, &account, document_id)
            .await
    }
}
