//! Bounded retry for remote calls.
//!
//! HTTP 500 and transport failures are retried immediately, up to a fixed
//! number of total attempts. Any other non-2xx status ends the call on the
//! first response.

use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_RETRIES;
use crate::error::{error_message, ConsoleError, Result};

/// Retry ceiling applied to every remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// Policy allowing `max_attempts` total attempts (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Total attempts allowed per call.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Send the request produced by `build` until it succeeds or the
    /// policy gives up.
    ///
    /// `build` is invoked once per attempt. On success the 2xx response is
    /// returned unread. A terminal status yields [`ConsoleError::Remote`]
    /// carrying the body's message; exhausting the attempts yields a
    /// [`ConsoleError::Remote`] saying "maximum retries reached".
    pub async fn send<F>(&self, method: &str, endpoint: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        self.send_with(method, endpoint, build, error_message).await
    }

    /// Like [`send`](Self::send), but a terminal status carries the
    /// response body unchanged.
    ///
    /// Used for the token endpoint, whose OAuth error bodies are shown to
    /// the operator as returned.
    pub async fn send_verbatim<F>(&self, method: &str, endpoint: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        self.send_with(method, endpoint, build, str::to_string).await
    }

    async fn send_with<F>(
        &self,
        method: &str,
        endpoint: &str,
        build: F,
        describe: fn(&str) -> String,
    ) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_status = None;
        let mut last_failure = String::new();

        for attempt in 1..=self.max_attempts {
            debug!(method, endpoint, attempt, "sending request");

            match build().send().await {
                Ok(res) if res.status().is_success() => return Ok(res),
                Ok(res) if res.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                    let body = res.text().await.unwrap_or_default();
                    warn!(method, endpoint, attempt, status = 500, "server error, retrying");
                    last_status = Some(500);
                    last_failure = describe(&body);
                }
                Ok(res) => {
                    let status = res.status().as_u16();
                    let body = res.text().await.unwrap_or_default();
                    let message = describe(&body);
                    warn!(method, endpoint, status, error = %message, "request failed");
                    return Err(ConsoleError::remote(Some(status), message));
                }
                Err(e) if e.is_builder() => {
                    return Err(ConsoleError::Configuration(format!(
                        "invalid request to {endpoint}: {e}"
                    )));
                }
                Err(e) => {
                    warn!(method, endpoint, attempt, error = %e, "network error, retrying");
                    last_status = None;
                    last_failure = e.to_string();
                }
            }
        }

        warn!(method, endpoint, attempts = self.max_attempts, "giving up");
        Err(ConsoleError::remote(
            last_status,
            format!("maximum retries reached: {last_failure}"),
        ))
    }
}
