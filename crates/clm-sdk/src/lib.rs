//! # CLM SDK
//!
//! OAuth token lifecycle and a retrying REST gateway for the CLM
//! document-generation API.
//!
//! The SDK provides:
//!
//! * [`TokenManager`]: consent URL, authorization-code exchange, refresh
//!   and the single persisted token slot ([`TokenStore`]).
//! * [`GatewayClient`]: configuration listing (paginated), task creation
//!   and document attribute lookups under one [`RetryPolicy`].
//! * [`Console`] / [`Session`]: the per-operator context and the state
//!   machine that keeps a usable token in it.
//! * [`ConsoleConfig`]: layered configuration resolved once at startup.
//! * [`ConsoleError`]: unified error type for all operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use clm_sdk::{ConfigOverrides, Console, ConsoleConfig, SessionState};
//!
//! # async fn run() -> Result<(), clm_sdk::ConsoleError> {
//! let console = Console::new(ConsoleConfig::from_env(ConfigOverrides::default()));
//! let mut session = console.session();
//!
//! if console.resume(&mut session).await? == SessionState::NoToken {
//!     println!("open {}", console.begin_login(&session)?);
//!     return Ok(());
//! }
//!
//! let configs = console.configurations(&mut session, false).await?;
//! println!("{} configurations", configs.total);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod oauth;
pub mod retry;
pub mod session;
pub mod token_store;

pub use config::{ApiResources, ConfigOverrides, ConsoleConfig};
pub use error::{ConsoleError, ErrorKind, Result};
pub use gateway::GatewayClient;
pub use oauth::TokenManager;
pub use retry::RetryPolicy;
pub use session::{Console, Session, SessionState};
pub use token_store::TokenStore;

// Re-export the model types for ergonomic usage.
pub use clm_models::{
    AccountId, Configuration, ConfigurationList, Credentials, DocumentAttributes,
    LaunchResolution, TaskOutcome, TaskResult, Token,
};
