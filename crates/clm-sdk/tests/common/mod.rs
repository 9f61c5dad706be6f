//! Shared fixtures: a mock CLM server and a console pointed at it.

#![allow(dead_code)]

use clm_sdk::{AccountId, ConfigOverrides, Console, ConsoleConfig, Credentials, Session, Token};
use mock_clm::MockClm;
use tempfile::TempDir;

pub const ACCOUNT: &str = "acc-1";
pub const REDIRECT_URI: &str = "https://console.example/callback";

pub struct Harness {
    pub mock: MockClm,
    pub base: String,
    pub console: Console,
    // Keeps the token directory alive for the duration of the test.
    pub dir: TempDir,
}

impl Harness {
    pub async fn start(mock: MockClm) -> Self {
        Self::start_with_retries(mock, 3).await
    }

    pub async fn start_with_retries(mock: MockClm, max_retries: u32) -> Self {
        Self::start_with_env(mock, max_retries, &[]).await
    }

    /// Start with extra `CLM_*` environment values visible to the resolver.
    pub async fn start_with_env(mock: MockClm, max_retries: u32, env: &[(&str, &str)]) -> Self {
        let env: Vec<(String, String)> = env
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let base = mock.spawn().await.expect("mock server starts");
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ConsoleConfig::resolve(
            ConfigOverrides {
                auth_server: Some(base.clone()),
                api_base_url: Some(base.clone()),
                client_id: Some("client-abc".into()),
                client_secret: Some("secret-xyz".into()),
                account_id: Some(AccountId::new(ACCOUNT)),
                redirect_uri: Some(REDIRECT_URI.into()),
                token_path: Some(dir.path().join("token.json")),
                max_retries: Some(max_retries),
            },
            |key| env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()),
        );
        Self {
            mock,
            base,
            console: Console::new(config),
            dir,
        }
    }

    pub fn session(&self) -> Session {
        self.console.session()
    }

    pub fn credentials(&self) -> Credentials {
        self.console.config().credentials().expect("credentials configured")
    }

    pub fn account(&self) -> AccountId {
        AccountId::new(ACCOUNT)
    }

    /// Log in through the mock and return the authenticated session.
    pub async fn logged_in(&self) -> Session {
        let mut session = self.session();
        self.console
            .complete_login(&mut session, mock_clm::MOCK_CODE)
            .await
            .expect("login succeeds");
        session
    }

    pub fn token(&self, session: &Session) -> Token {
        session.token.clone().expect("session holds a token")
    }
}
