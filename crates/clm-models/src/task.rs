//! DocLauncher task creation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Data type accepted by the task endpoint for XML payloads.
pub const XML_DATA_TYPE: &str = "XML";

/// Reference to the configuration a task is launched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigurationRef {
    /// The configuration's `Href`.
    pub href: String,
}

/// Body of `POST /v2/{account}/doclaunchertasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskRequest {
    /// Merge data for the generated document.
    pub data: String,
    /// Format of `data`; always [`XML_DATA_TYPE`].
    pub data_type: String,
    /// Configuration to launch.
    pub doc_launcher_configuration: ConfigurationRef,
}

impl TaskRequest {
    /// Build an XML task request for the configuration at `href`.
    ///
    /// # Examples
    ///
    /// ```
    /// use clm_models::TaskRequest;
    ///
    /// let req = TaskRequest::xml("https://api/cfg/1", "<Params/>");
    /// let json = serde_json::to_value(&req).unwrap();
    /// assert_eq!(json["DataType"], "XML");
    /// assert_eq!(json["DocLauncherConfiguration"]["Href"], "https://api/cfg/1");
    /// ```
    pub fn xml(href: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            data: payload.into(),
            data_type: XML_DATA_TYPE.to_string(),
            doc_launcher_configuration: ConfigurationRef { href: href.into() },
        }
    }
}

/// Decoded body of a successful task creation.
///
/// Fields the console does not interpret are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskResult {
    /// Processing status, e.g. `"Success"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// URL that opens the generated document once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_launcher_result_url: Option<String>,
    /// Every other field of the response.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskResult {
    /// `true` when the server reported `Status == "Success"`.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("Success")
    }
}

/// Outcome of the follow-up request that resolves a task's result URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LaunchResolution {
    /// The result URL answered 200; `url` is the final URL after redirects.
    Resolved {
        /// Final URL to open.
        url: String,
    },
    /// The follow-up request failed. The task itself still succeeded.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
}

/// Task creation result plus the optional launch resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Decoded task creation body.
    pub result: TaskResult,
    /// `None` when the result carried no result URL.
    pub launch: Option<LaunchResolution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let json = serde_json::to_value(TaskRequest::xml("h", "<Params/>")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Data": "<Params/>",
                "DataType": "XML",
                "DocLauncherConfiguration": { "Href": "h" }
            })
        );
    }

    #[test]
    fn result_keeps_unknown_fields() {
        let result: TaskResult = serde_json::from_str(
            r#"{"Status":"Success","DocLauncherResultUrl":"https://r","Href":"https://task/1"}"#,
        )
        .unwrap();
        assert!(result.is_success());
        assert_eq!(result.doc_launcher_result_url.as_deref(), Some("https://r"));
        assert_eq!(result.extra["Href"], "https://task/1");
    }

    #[test]
    fn result_without_status_is_not_success() {
        let result: TaskResult = serde_json::from_str(r#"{"Status":"Queued"}"#).unwrap();
        assert!(!result.is_success());
        assert!(result.doc_launcher_result_url.is_none());
    }

    #[test]
    fn launch_resolution_is_tagged() {
        let json = serde_json::to_value(LaunchResolution::Failed {
            reason: "HTTP 403".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "HTTP 403");
    }
}
