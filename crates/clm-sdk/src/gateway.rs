//! Authenticated REST gateway.
//!
//! [`GatewayClient`] performs the account-scoped calls of the console. Every
//! call goes through the [`RetryPolicy`] and carries the caller's bearer
//! token. The gateway never checks token validity; that belongs to the
//! caller holding the [`TokenManager`](crate::oauth::TokenManager).

use clm_models::{
    AccountId, ConfigurationList, ConfigurationPage, DocumentAttributes, LaunchResolution,
    TaskOutcome, TaskRequest, TaskResult, Token,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::config::{ApiResources, ConsoleConfig};
use crate::error::{error_message, ConsoleError, Result};
use crate::retry::RetryPolicy;

/// Client for the configuration, task and document endpoints.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
    resources: ApiResources,
    retry: RetryPolicy,
}

impl GatewayClient {
    /// Build a client from the resolved configuration.
    pub fn new(config: &ConsoleConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Build a client sharing an existing HTTP client.
    pub fn with_client(config: &ConsoleConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.api_base_url.clone(),
            page_size: config.page_size,
            resources: config.resources.clone(),
            retry: RetryPolicy::new(config.max_retries),
        }
    }

    /// Retry policy applied to every call.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn account_url(&self, account: &AccountId, resource: &str) -> String {
        format!("{}/v2/{}/{}", self.base_url, account, resource)
    }

    // ------------------------------------------------------------------
    // Configurations
    // ------------------------------------------------------------------

    /// Fetch every configuration of `account`, following `Next` links.
    ///
    /// Pages are concatenated in server order. A failure on any page fails
    /// the whole call.
    pub async fn list_configurations(
        &self,
        token: &Token,
        account: &AccountId,
    ) -> Result<ConfigurationList> {
        let mut list = ConfigurationList::default();
        let mut next_url = Some(format!(
            "{}?limit={}",
            self.account_url(account, &self.resources.configurations),
            self.page_size
        ));
        let mut pages = 0usize;

        while let Some(url) = next_url.take() {
            let page: ConfigurationPage = self.get_json(token, &url).await.inspect_err(|e| {
                error!(
                    endpoint = %url,
                    pages,
                    fetched = list.total,
                    error = %e,
                    "configuration listing failed"
                );
            })?;
            pages += 1;
            list.extend_page(page.items);
            next_url = page.next.filter(|n| !n.is_empty());
            if next_url.is_some() {
                debug!(fetched = list.total, "fetching next configuration page");
            }
        }

        info!(account = %account, pages, total = list.total, "configurations listed");
        Ok(list)
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Launch a task for the configuration at `configuration_href`.
    ///
    /// Only HTTP 200 and 202 count as success. When the result carries a
    /// result URL it is resolved with one follow-up request whose failure
    /// is recorded in [`TaskOutcome::launch`] instead of failing the task.
    pub async fn create_task(
        &self,
        token: &Token,
        account: &AccountId,
        configuration_href: &str,
        xml_payload: &str,
    ) -> Result<TaskOutcome> {
        let url = self.account_url(account, &self.resources.tasks);
        let body = TaskRequest::xml(configuration_href, xml_payload);
        debug!(
            method = "POST",
            endpoint = %url,
            request = %serde_json::to_string(&body).unwrap_or_default(),
            "creating task"
        );

        let res = self
            .retry
            .send("POST", &url, || {
                self.http
                    .post(&url)
                    .header(AUTHORIZATION, bearer(token))
                    .header(CONTENT_TYPE, "application/json")
                    .json(&body)
            })
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            let message = error_message(&text);
            error!(endpoint = %url, status = status.as_u16(), error = %message, "task creation rejected");
            return Err(ConsoleError::remote(Some(status.as_u16()), message));
        }

        let result: TaskResult = serde_json::from_str(&text)?;
        info!(
            endpoint = %url,
            status = result.status.as_deref().unwrap_or("-"),
            "task created"
        );

        let launch = match result.doc_launcher_result_url.as_deref() {
            Some(result_url) => Some(self.resolve_launch_url(token, result_url).await),
            None => None,
        };

        Ok(TaskOutcome { result, launch })
    }

    async fn resolve_launch_url(&self, token: &Token, result_url: &str) -> LaunchResolution {
        let res = self
            .retry
            .send("GET", result_url, || {
                self.http
                    .get(result_url)
                    .header(AUTHORIZATION, bearer(token))
                    .header(ACCEPT, "text/html")
            })
            .await;

        match res {
            Ok(res) if res.status() == StatusCode::OK => LaunchResolution::Resolved {
                url: res.url().to_string(),
            },
            Ok(res) => {
                warn!(endpoint = result_url, status = res.status().as_u16(), "launch URL not resolved");
                LaunchResolution::Failed {
                    reason: format!("unexpected status {}", res.status().as_u16()),
                }
            }
            Err(e) => {
                warn!(endpoint = result_url, error = %e, "launch URL not resolved");
                LaunchResolution::Failed { reason: e.to_string() }
            }
        }
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Fetch a document with its attribute groups expanded.
    pub async fn document_attributes(
        &self,
        token: &Token,
        account: &AccountId,
        document_id: &str,
    ) -> Result<DocumentAttributes> {
        let url = format!(
            "{}/{}?expand={}",
            self.account_url(account, &self.resources.documents),
            document_id,
            self.resources.document_expand
        );
        self.get_json(token, &url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &Token, url: &str) -> Result<T> {
        let res = self
            .retry
            .send("GET", url, || {
                self.http
                    .get(url)
                    .header(AUTHORIZATION, bearer(token))
                    .header(CONTENT_TYPE, "application/json")
            })
            .await?;
        let text = res.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn bearer(token: &Token) -> String {
    format!("Bearer {}", token.access_token)
}
