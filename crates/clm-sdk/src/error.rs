//! Console error types.
//!
//! [`ConsoleError`] is the single error type returned by every fallible
//! operation in the SDK. Callers decide what to do with a failure by
//! matching on [`ConsoleError::kind`].

use strum::{Display, EnumString};

/// Coarse classification of a [`ConsoleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A required setting is missing. Show the message; retrying is pointless.
    Configuration,
    /// Credentials are missing or were rejected. Return to the login flow.
    Auth,
    /// The remote API answered with a failure.
    Remote,
    /// The remote API could not be reached.
    TransientNetwork,
    /// Local I/O or (de)serialisation failure.
    Local,
}

/// Error type for all console operations.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Missing or invalid configuration (e.g. unset authorization server).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Missing credentials, or the authorization server refused them.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP response, or retries exhausted.
    #[error("remote error{}: {message}", status_suffix(*.status))]
    Remote {
        /// HTTP status of the last response, if one was received.
        status: Option<u16>,
        /// Message extracted from the response body.
        message: String,
    },

    /// Connection-level failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    TransientNetwork(#[from] reqwest::Error),

    /// Token file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConsoleError {
    /// Build a [`ConsoleError::Remote`].
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Classification used by callers to pick a reaction.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::TransientNetwork(_) => ErrorKind::TransientNetwork,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Local,
        }
    }

    /// HTTP status carried by a remote error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            Self::TransientNetwork(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn status_suffix(status: Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Convenience alias used throughout the SDK.
pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;

/// Extract a human-readable message from an error response body.
///
/// Uses the conventional `Message` field when the body is a JSON object
/// carrying one (`message` and `error_description` are accepted too),
/// otherwise the raw text.
pub fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["Message", "message", "error_description"]
                .iter()
                .find_map(|key| v.get(*key).and_then(serde_json::Value::as_str))
        })
        .map_or_else(|| body.to_string(), str::to_string)
}
