//! Console configuration.
//!
//! [`ConsoleConfig::resolve`] is called once at startup and layers three
//! sources, later ones winning:
//!
//! 1. built-in defaults,
//! 2. environment variables,
//! 3. explicit [`ConfigOverrides`] (usually command-line flags).
//!
//! The result is immutable and passed by reference to every component.

use std::path::PathBuf;

use clm_models::{AccountId, Credentials};
use tracing::warn;

use crate::error::{ConsoleError, Result};

const APP_DIR: &str = "clm-console";
const TOKEN_FILE: &str = "token.json";

/// Default REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://apiuatna11.springcm.com";
/// Default redirect URI registered for the console.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8501";
/// Default OAuth scopes.
pub const DEFAULT_SCOPES: [&str; 4] = ["signature", "impersonation", "spring_write", "spring_read"];
/// Default total attempts per remote call.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default page size of the configuration listing.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Account-scoped REST resource names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResources {
    /// Listing of generation configurations.
    pub configurations: String,
    /// Task creation.
    pub tasks: String,
    /// Document lookups.
    pub documents: String,
    /// `expand` parameter used for document attribute lookups.
    pub document_expand: String,
}

impl Default for ApiResources {
    fn default() -> Self {
        Self {
            configurations: "doclauncherconfigurations".to_string(),
            tasks: "doclaunchertasks".to_string(),
            documents: "documents".to_string(),
            document_expand: "AttributeGroups".to_string(),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// OAuth authorization server, either a bare host (`account-d.docusign.com`)
    /// or a base URL with scheme.
    pub auth_server: Option<String>,
    /// REST API base URL, without trailing slash.
    pub api_base_url: String,
    /// OAuth client id.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// Default account for REST calls.
    pub account_id: Option<AccountId>,
    /// Redirect URI used for both the consent URL and the code exchange.
    pub redirect_uri: String,
    /// Location of the single token slot.
    pub token_path: PathBuf,
    /// Total attempts per remote call.
    pub max_retries: u32,
    /// Page size requested from the configuration listing.
    pub page_size: u32,
    /// OAuth scopes requested at consent time.
    pub scopes: Vec<String>,
    /// REST resource names.
    pub resources: ApiResources,
}

/// Values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// See [`ConsoleConfig::auth_server`].
    pub auth_server: Option<String>,
    /// See [`ConsoleConfig::api_base_url`].
    pub api_base_url: Option<String>,
    /// See [`ConsoleConfig::client_id`].
    pub client_id: Option<String>,
    /// See [`ConsoleConfig::client_secret`].
    pub client_secret: Option<String>,
    /// See [`ConsoleConfig::account_id`].
    pub account_id: Option<AccountId>,
    /// See [`ConsoleConfig::redirect_uri`].
    pub redirect_uri: Option<String>,
    /// See [`ConsoleConfig::token_path`].
    pub token_path: Option<PathBuf>,
    /// See [`ConsoleConfig::max_retries`].
    pub max_retries: Option<u32>,
}

impl ConsoleConfig {
    /// Resolve the configuration from the process environment.
    pub fn from_env(overrides: ConfigOverrides) -> Self {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve the configuration with an explicit environment lookup.
    ///
    /// | Variable             | Default                                   |
    /// |----------------------|-------------------------------------------|
    /// | `CLM_AUTH_SERVER`    | unset                                     |
    /// | `CLM_API_BASE_URL`   | `https://apiuatna11.springcm.com`         |
    /// | `CLM_CLIENT_ID`      | unset                                     |
    /// | `CLM_CLIENT_SECRET`  | unset                                     |
    /// | `CLM_ACCOUNT_ID`     | unset                                     |
    /// | `CLM_REDIRECT_URI`   | `http://localhost:8501`                   |
    /// | `CLM_TOKEN_PATH`     | `<local data dir>/clm-console/token.json` |
    /// | `CLM_MAX_RETRIES`    | `3`                                       |
    /// | `CLM_PAGE_SIZE`      | `100`                                     |
    /// | `CLM_SCOPES`         | `signature impersonation spring_write spring_read` |
    ///
    /// Empty values count as unset.
    pub fn resolve(overrides: ConfigOverrides, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let scopes = env("CLM_SCOPES").map_or_else(
            || DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            |v| v.split_whitespace().map(str::to_string).collect(),
        );

        Self {
            auth_server: overrides.auth_server.or_else(|| env("CLM_AUTH_SERVER")),
            api_base_url: overrides
                .api_base_url
                .or_else(|| env("CLM_API_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client_id: overrides.client_id.or_else(|| env("CLM_CLIENT_ID")),
            client_secret: overrides.client_secret.or_else(|| env("CLM_CLIENT_SECRET")),
            account_id: overrides
                .account_id
                .or_else(|| parse_account(&env)),
            redirect_uri: overrides
                .redirect_uri
                .or_else(|| env("CLM_REDIRECT_URI"))
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            token_path: overrides
                .token_path
                .or_else(|| env("CLM_TOKEN_PATH").map(PathBuf::from))
                .unwrap_or_else(default_token_path),
            max_retries: overrides
                .max_retries
                .or_else(|| parse_number(&env, "CLM_MAX_RETRIES"))
                .unwrap_or(DEFAULT_MAX_RETRIES)
                .max(1),
            page_size: parse_number(&env, "CLM_PAGE_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            scopes,
            resources: ApiResources::default(),
        }
    }

    /// Credentials from configuration, if a client id is set.
    pub fn credentials(&self) -> Option<Credentials> {
        let client_id = self.client_id.clone()?;
        Some(Credentials::new(
            client_id,
            self.client_secret.clone().unwrap_or_default(),
        ))
    }

    /// Base URL of the authorization server.
    ///
    /// A bare host is served over `https://`.
    pub fn auth_base_url(&self) -> Result<String> {
        let server = self
            .auth_server
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ConsoleError::Configuration(
                    "authorization server is not configured (set CLM_AUTH_SERVER)".into(),
                )
            })?;
        let server = server.trim_end_matches('/');
        if server.starts_with("http://") || server.starts_with("https://") {
            Ok(server.to_string())
        } else {
            Ok(format!("https://{server}"))
        }
    }
}

fn parse_number(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u32> {
    let raw = env(key)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(key, value = %raw, "ignoring non-numeric setting");
            None
        }
    }
}

fn parse_account(env: &impl Fn(&str) -> Option<String>) -> Option<AccountId> {
    let raw = env("CLM_ACCOUNT_ID")?;
    raw.parse()
        .inspect_err(|e| warn!(key = "CLM_ACCOUNT_ID", error = %e, "ignoring account setting"))
        .ok()
}

fn default_token_path() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from(".tokens").join(TOKEN_FILE),
        |dir| dir.join(APP_DIR).join(TOKEN_FILE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = ConsoleConfig::resolve(ConfigOverrides::default(), env_from(&[]));
        assert!(cfg.auth_server.is_none());
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(cfg.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.scopes, DEFAULT_SCOPES);
        assert!(cfg.token_path.ends_with("token.json"));
        assert!(cfg.credentials().is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = ConsoleConfig::resolve(
            ConfigOverrides::default(),
            env_from(&[
                ("CLM_AUTH_SERVER", "account-d.example.com"),
                ("CLM_API_BASE_URL", "http://localhost:9000/"),
                ("CLM_CLIENT_ID", "id"),
                ("CLM_CLIENT_SECRET", "secret"),
                ("CLM_ACCOUNT_ID", "acc"),
                ("CLM_MAX_RETRIES", "5"),
                ("CLM_SCOPES", "signature spring_read"),
            ]),
        );
        assert_eq!(cfg.api_base_url, "http://localhost:9000");
        assert_eq!(cfg.account_id, Some(AccountId::new("acc")));
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.scopes, ["signature", "spring_read"]);
        assert_eq!(cfg.credentials(), Some(Credentials::new("id", "secret")));
    }

    #[test]
    fn overrides_beat_environment() {
        let cfg = ConsoleConfig::resolve(
            ConfigOverrides {
                client_id: Some("flag-id".into()),
                redirect_uri: Some("https://x/".into()),
                max_retries: Some(1),
                ..ConfigOverrides::default()
            },
            env_from(&[("CLM_CLIENT_ID", "env-id"), ("CLM_MAX_RETRIES", "7")]),
        );
        assert_eq!(cfg.client_id.as_deref(), Some("flag-id"));
        assert_eq!(cfg.redirect_uri, "https://x/");
        assert_eq!(cfg.max_retries, 1);
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = ConsoleConfig::resolve(
            ConfigOverrides::default(),
            env_from(&[("CLM_MAX_RETRIES", "many"), ("CLM_PAGE_SIZE", "0")]),
        );
        assert_eq!(cfg.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn malformed_account_is_ignored() {
        let cfg = ConsoleConfig::resolve(
            ConfigOverrides::default(),
            env_from(&[("CLM_ACCOUNT_ID", "acc/../other")]),
        );
        assert_eq!(cfg.account_id, None);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = ConsoleConfig::resolve(
            ConfigOverrides::default(),
            env_from(&[("CLM_AUTH_SERVER", "  "), ("CLM_CLIENT_ID", "")]),
        );
        assert!(cfg.auth_server.is_none());
        assert!(cfg.client_id.is_none());
    }

    #[test]
    fn auth_base_url_adds_https_to_bare_host() {
        let mut cfg = ConsoleConfig::resolve(ConfigOverrides::default(), env_from(&[]));
        assert_eq!(
            cfg.auth_base_url().unwrap_err().kind(),
            crate::error::ErrorKind::Configuration
        );

        cfg.auth_server = Some("account-d.example.com".into());
        assert_eq!(cfg.auth_base_url().unwrap(), "https://account-d.example.com");

        cfg.auth_server = Some("http://127.0.0.1:4000/".into());
        assert_eq!(cfg.auth_base_url().unwrap(), "http://127.0.0.1:4000");
    }
}
