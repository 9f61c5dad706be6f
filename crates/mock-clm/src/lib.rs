//! Scriptable stand-in for the CLM authorization server and REST API.
//!
//! Serves the endpoints the console talks to:
//!
//! | Route | Behaviour |
//! |-------|-----------|
//! | `GET  /oauth/auth` | redirects to `redirect_uri?code=MOCKCODE` |
//! | `POST /oauth/token` | issues `access-N` / `refresh-N` tokens |
//! | `GET  /v2/{account}/doclauncherconfigurations` | serves the configured pages, linked by `Next` |
//! | `POST /v2/{account}/doclaunchertasks` | answers with the configured status and body |
//! | `GET  /launch/{id}` | redirects to `/view/{id}` |
//! | `GET  /v2/{account}/documents/{id}` | serves a stored document or 404 |
//!
//! Failures can be queued per [`Route`] with [`MockClm::fail_next`]; each
//! queued status is answered once, before normal handling resumes. A queued
//! 2xx lets that request through, which makes it possible to fail a later
//! request in a sequence. Query strings of listing and document requests
//! are recorded and available through [`MockClm::queries`]; a listing's
//! `limit` is carried over into its `Next` links.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Form, Json, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tracing::info;

/// Authorization code handed out by `/oauth/auth`.
pub const MOCK_CODE: &str = "MOCKCODE";
/// Authorization code rejected by `/oauth/token`.
pub const BAD_CODE: &str = "bad";
/// Refresh token rejected by `/oauth/token`.
pub const REVOKED_REFRESH_TOKEN: &str = "revoked";

/// Endpoint families that can be scripted and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `POST /oauth/token`
    Token,
    /// Configuration listing pages.
    Configurations,
    /// Task creation.
    Tasks,
    /// Result-URL follow-up (`/launch/{id}`).
    Launch,
    /// Document lookups.
    Documents,
}

struct Inner {
    failures: HashMap<Route, VecDeque<u16>>,
    hits: HashMap<Route, usize>,
    pages: Vec<Vec<Value>>,
    task_status: u16,
    task_body: Value,
    task_requests: Vec<Value>,
    documents: HashMap<String, Value>,
    token_requests: Vec<HashMap<String, String>>,
    token_body: Option<Value>,
    queries: HashMap<Route, Vec<HashMap<String, String>>>,
    authorizations: Vec<String>,
    expires_in: i64,
    issued: usize,
}

/// Shared mock state; clones refer to the same server.
#[derive(Clone)]
pub struct MockClm {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockClm {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClm {
    /// A mock with one empty configuration page and a `202 {"Status":"Success"}`
    /// task response.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                failures: HashMap::new(),
                hits: HashMap::new(),
                pages: vec![Vec::new()],
                task_status: 202,
                task_body: json!({ "Status": "Success" }),
                task_requests: Vec::new(),
                documents: HashMap::new(),
                token_requests: Vec::new(),
                token_body: None,
                queries: HashMap::new(),
                authorizations: Vec::new(),
                expires_in: 3600,
                issued: 0,
            })),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve these configuration pages in order. `{base}` inside string
    /// values is replaced as for [`MockClm::with_task_response`].
    pub fn with_configuration_pages(self, pages: Vec<Vec<Value>>) -> Self {
        self.inner().pages = if pages.is_empty() { vec![Vec::new()] } else { pages };
        self
    }

    /// Answer task creation with `status` and `body`. The literal `{base}`
    /// inside string values is replaced with the server's base URL.
    pub fn with_task_response(self, status: u16, body: Value) -> Self {
        {
            let mut inner = self.inner();
            inner.task_status = status;
            inner.task_body = body;
        }
        self
    }

    /// Store a document served under `id`.
    pub fn with_document(self, id: &str, body: Value) -> Self {
        self.inner().documents.insert(id.to_string(), body);
        self
    }

    /// Lifetime reported for issued tokens.
    pub fn with_expires_in(self, seconds: i64) -> Self {
        self.inner().expires_in = seconds;
        self
    }

    /// Answer accepted token requests with `body` instead of a fresh token.
    pub fn with_token_body(self, body: Value) -> Self {
        self.inner().token_body = Some(body);
        self
    }

    /// Answer the next requests on `route` with these statuses.
    pub fn fail_next(&self, route: Route, statuses: &[u16]) {
        self.inner()
            .failures
            .entry(route)
            .or_default()
            .extend(statuses.iter().copied());
    }

    /// Number of requests received on `route`, failures included.
    pub fn hits(&self, route: Route) -> usize {
        self.inner().hits.get(&route).copied().unwrap_or(0)
    }

    /// Form bodies posted to `/oauth/token`, oldest first.
    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.inner().token_requests.clone()
    }

    /// Query parameters of the authorized requests on `route`, oldest first.
    pub fn queries(&self, route: Route) -> Vec<HashMap<String, String>> {
        self.inner().queries.get(&route).cloned().unwrap_or_default()
    }

    /// JSON bodies posted to the task endpoint, oldest first.
    pub fn task_requests(&self) -> Vec<Value> {
        self.inner().task_requests.clone()
    }

    /// `Authorization` headers seen on REST routes, oldest first.
    pub fn authorizations(&self) -> Vec<String> {
        self.inner().authorizations.clone()
    }

    /// Count the request and pop a queued failure for `route`, if any.
    fn enter(&self, route: Route) -> Option<Response> {
        let mut inner = self.inner();
        *inner.hits.entry(route).or_default() += 1;
        let status = inner.failures.get_mut(&route)?.pop_front()?;
        drop(inner);

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_success() {
            return None;
        }
        Some((status, Json(json!({ "Message": format!("scripted failure {status}") }))).into_response())
    }

    /// Record the bearer header, rejecting requests without one.
    fn authorize(&self, headers: &HeaderMap) -> Option<Response> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("Bearer "));
        match value {
            Some(v) => {
                self.inner().authorizations.push(v.to_string());
                None
            }
            None => Some(
                (StatusCode::UNAUTHORIZED, Json(json!({ "Message": "Unauthorized" }))).into_response(),
            ),
        }
    }

    /// Axum router serving all mock routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/oauth/auth", get(authorize))
            .route("/oauth/token", post(token))
            .route("/v2/{account}/doclauncherconfigurations", get(configurations))
            .route("/v2/{account}/doclaunchertasks", post(create_task))
            .route("/v2/{account}/documents/{id}", get(document))
            .route("/launch/{id}", get(launch))
            .route("/view/{id}", get(view))
            .with_state(self.clone())
    }

    /// Serve on an ephemeral localhost port and return the base URL.
    pub async fn spawn(&self) -> std::io::Result<String> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
        let base = format!("http://{}", listener.local_addr()?);
        let app = self.router();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(base)
    }
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

fn replace_base(value: &Value, base: &str) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace("{base}", base)),
        Value::Array(items) => Value::Array(items.iter().map(|v| replace_base(v, base)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), replace_base(v, base)))
                .collect(),
        ),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn authorize(Query(params): Query<HashMap<String, String>>) -> Response {
    let Some(redirect_uri) = params.get("redirect_uri") else {
        return (StatusCode::BAD_REQUEST, "missing redirect_uri").into_response();
    };
    info!(client_id = ?params.get("client_id"), "consent granted");
    let separator = if redirect_uri.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{redirect_uri}{separator}code={MOCK_CODE}")).into_response()
}

async fn token(State(mock): State<MockClm>, Form(form): Form<HashMap<String, String>>) -> Response {
    if let Some(failure) = mock.enter(Route::Token) {
        return failure;
    }
    let mut inner = mock.inner();
    inner.token_requests.push(form.clone());

    let rejected = match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => form.get("code").map(String::as_str) == Some(BAD_CODE),
        Some("refresh_token") => {
            form.get("refresh_token").map(String::as_str) == Some(REVOKED_REFRESH_TOKEN)
        }
        _ => true,
    };
    if rejected {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "grant rejected" })),
        )
            .into_response();
    }

    if let Some(body) = inner.token_body.clone() {
        return Json(body).into_response();
    }

    inner.issued += 1;
    let n = inner.issued;
    info!(grant_type = ?form.get("grant_type"), n, "token issued");
    Json(json!({
        "access_token": format!("access-{n}"),
        "refresh_token": format!("refresh-{n}"),
        "token_type": "Bearer",
        "expires_in": inner.expires_in,
    }))
    .into_response()
}

async fn configurations(
    State(mock): State<MockClm>,
    Path(account): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(failure) = mock.enter(Route::Configurations) {
        return failure;
    }
    if let Some(denied) = mock.authorize(&headers) {
        return denied;
    }

    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let limit = params
        .get("limit")
        .map(|l| format!("limit={l}&"))
        .unwrap_or_default();
    let base = base_url(&headers);
    let mut inner = mock.inner();
    inner.queries.entry(Route::Configurations).or_default().push(params.clone());
    let items: Vec<Value> = inner
        .pages
        .get(page)
        .map(|p| p.iter().map(|v| replace_base(v, &base)).collect())
        .unwrap_or_default();
    let next = (page + 1 < inner.pages.len())
        .then(|| format!("{base}/v2/{account}/doclauncherconfigurations?{limit}page={}", page + 1));
    Json(json!({ "Items": items, "Next": next })).into_response()
}

async fn create_task(
    State(mock): State<MockClm>,
    Path(_account): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = mock.enter(Route::Tasks) {
        return failure;
    }
    if let Some(denied) = mock.authorize(&headers) {
        return denied;
    }

    let mut inner = mock.inner();
    inner.task_requests.push(body);
    let status = StatusCode::from_u16(inner.task_status).unwrap_or(StatusCode::ACCEPTED);
    let body = replace_base(&inner.task_body, &base_url(&headers));
    (status, Json(body)).into_response()
}

async fn launch(State(mock): State<MockClm>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    if let Some(failure) = mock.enter(Route::Launch) {
        return failure;
    }
    if let Some(denied) = mock.authorize(&headers) {
        return denied;
    }
    Redirect::temporary(&format!("/view/{id}")).into_response()
}

async fn view(Path(id): Path<String>) -> Html<String> {
    Html(format!("<html><body>document {id}</body></html>"))
}

async fn document(
    State(mock): State<MockClm>,
    Path((_account, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(failure) = mock.enter(Route::Documents) {
        return failure;
    }
    if let Some(denied) = mock.authorize(&headers) {
        return denied;
    }
    let mut inner = mock.inner();
    inner.queries.entry(Route::Documents).or_default().push(params);
    match inner.documents.get(&id) {
        Some(doc) => Json(doc.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "Message": "Document not found" }))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_failures_are_served_once() {
        let mock = MockClm::new();
        mock.fail_next(Route::Configurations, &[500]);
        let base = mock.spawn().await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{base}/v2/acc/doclauncherconfigurations");

        let first = client.get(&url).bearer_auth("t").send().await.unwrap();
        assert_eq!(first.status().as_u16(), 500);
        let second = client.get(&url).bearer_auth("t").send().await.unwrap();
        assert_eq!(second.status().as_u16(), 200);
        assert_eq!(mock.hits(Route::Configurations), 2);
    }

    #[tokio::test]
    async fn rest_routes_require_bearer() {
        let mock = MockClm::new();
        let base = mock.spawn().await.unwrap();
        let res = reqwest::get(format!("{base}/v2/acc/documents/d1")).await.unwrap();
        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn pages_are_linked_by_next() {
        let mock = MockClm::new().with_configuration_pages(vec![
            vec![json!({ "Id": "1" })],
            vec![json!({ "Id": "2" })],
        ]);
        let base = mock.spawn().await.unwrap();
        let client = reqwest::Client::new();

        let first: Value = client
            .get(format!("{base}/v2/acc/doclauncherconfigurations"))
            .bearer_auth("t")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let next = first["Next"].as_str().unwrap().to_string();
        assert!(next.starts_with(&base));
        assert!(!next.contains("limit="));

        let second: Value = client.get(&next).bearer_auth("t").send().await.unwrap().json().await.unwrap();
        assert_eq!(second["Items"][0]["Id"], "2");
        assert!(second["Next"].is_null());
    }

    #[tokio::test]
    async fn listing_limit_is_recorded_and_carried_to_next() {
        let mock = MockClm::new().with_configuration_pages(vec![vec![], vec![]]);
        let base = mock.spawn().await.unwrap();

        let first: Value = reqwest::Client::new()
            .get(format!("{base}/v2/acc/doclauncherconfigurations?limit=25"))
            .bearer_auth("t")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert!(first["Next"].as_str().unwrap().contains("limit=25&page=1"));
        assert_eq!(mock.queries(Route::Configurations)[0]["limit"], "25");
    }

    #[test]
    fn base_placeholder_is_replaced_recursively() {
        let value = json!({ "Url": "{base}/launch/1", "Nested": ["{base}"] , "N": 1 });
        let replaced = replace_base(&value, "http://h");
        assert_eq!(replaced["Url"], "http://h/launch/1");
        assert_eq!(replaced["Nested"][0], "http://h");
        assert_eq!(replaced["N"], 1);
    }
}
