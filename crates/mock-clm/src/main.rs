//! Local CLM stand-in for manual testing of `clm-cli`.
//!
//! Point the console at it with
//! `CLM_AUTH_SERVER=http://localhost:4010 CLM_API_BASE_URL=http://localhost:4010`.

use mock_clm::MockClm;
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("MOCK_CLM_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4010);

    let mock = MockClm::new()
        .with_configuration_pages(vec![
            vec![
                json!({ "Id": "1001", "Name": "Offer Letter", "Href": "{base}/v2/demo/doclauncherconfigurations/1001" }),
                json!({ "Id": "1002", "Name": "NDA", "Href": "{base}/v2/demo/doclauncherconfigurations/1002" }),
            ],
            vec![json!({ "Id": "1003", "Name": "Master Services Agreement", "Href": "{base}/v2/demo/doclauncherconfigurations/1003" })],
        ])
        .with_task_response(
            202,
            json!({ "Status": "Success", "DocLauncherResultUrl": "{base}/launch/1" }),
        )
        .with_document(
            "d1",
            json!({
                "Name": "Offer Letter.docx",
                "AttributeGroups": { "Offer": { "Salary": { "Value": "100000" } } }
            }),
        );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "mock CLM listening");
    axum::serve(listener, mock.router()).await
}
