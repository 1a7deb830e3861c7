//! API client for the access-control service.
//!
//! `ApiClient` holds a single default bearer credential that is applied to
//! every request issued through it. One instance is shared (via `Arc`) by the
//! session manager and every view; only the session manager attaches or
//! detaches the credential.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::{header, Client, Method, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{
    AccessLog, AccessStats, DashboardStats, Employee, LogQuery, LoginRequest, TokenResponse,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "/auth/login";
const EMPLOYEES_PATH: &str = "/employees";
const LOGS_PATH: &str = "/logs";
const LOG_STATS_PATH: &str = "/logs/stats";

/// HTTP client bound to one base URL with an attachable bearer credential.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.has_token())
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "API client created");

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ===== Credential =====

    /// Set the bearer token applied to all subsequent requests, replacing
    /// any previously attached token.
    pub fn attach(&self, token: impl Into<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.into());
    }

    /// Remove the bearer token; subsequent requests carry no credential.
    pub fn detach(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// The currently attached token, if any
    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn has_token(&self) -> bool {
        self.token.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Snapshot of the auth header. Taken once per request so a concurrent
    /// attach/detach never produces a half-updated request.
    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.token() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    // ===== Requests =====

    /// Issue one request with the attached credential, if any.
    ///
    /// No retries. Transport failures and non-2xx statuses are returned to
    /// the caller as `ApiError`.
    pub async fn request<B, Q>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: Option<&Q>,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(self.auth_headers()?);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(method = %method, url = %url, "Sending request");
        let response = builder.send().await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Request failed");
            ApiError::NetworkError(e)
        })?;

        let response = Self::check_response(response).await;
        if let Err(ref e) = response {
            debug!(method = %method, url = %url, error = %e, "Request rejected");
        }
        response
    }

    /// GET a path and decode the JSON body
    pub async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.request::<(), Q>(Method::GET, path, None, query).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    /// Exchange an email/password pair for an access token.
    ///
    /// Sent without any attached credential; the token is returned to the
    /// caller and is not attached here.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let url = self.url(LOGIN_PATH);
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse auth response: {}", e)))?;

        if parsed.access_token.is_empty() {
            return Err(ApiError::InvalidResponse("Empty access token".to_string()));
        }
        if !parsed.token_type.eq_ignore_ascii_case("bearer") {
            warn!(token_type = %parsed.token_type, "Unexpected token type, treating as bearer");
        }
        Ok(parsed.access_token)
    }

    // ===== Data Fetching Methods =====

    pub async fn fetch_employees(&self) -> Result<Vec<Employee>, ApiError> {
        self.get_json::<_, ()>(EMPLOYEES_PATH, None).await
    }

    pub async fn fetch_stats(&self) -> Result<AccessStats, ApiError> {
        self.get_json::<_, ()>(LOG_STATS_PATH, None).await
    }

    pub async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<AccessLog>, ApiError> {
        let pairs = query.to_query_pairs();
        self.get_json(LOGS_PATH, Some(&pairs)).await
    }

    /// Number of enrolled employees. Records are not decoded, so fields
    /// the dashboard never shows cannot fail the request.
    pub async fn fetch_employee_count(&self) -> Result<usize, ApiError> {
        let records: Vec<IgnoredAny> = self.get_json::<_, ()>(EMPLOYEES_PATH, None).await?;
        Ok(records.len())
    }

    /// Employee count and access statistics, fetched concurrently.
    pub async fn fetch_dashboard(&self) -> Result<DashboardStats, ApiError> {
        let (total_employees, access) =
            futures::future::try_join(self.fetch_employee_count(), self.fetch_stats()).await?;
        Ok(DashboardStats {
            total_employees,
            access,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Decision;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn has_no_auth(req: &Request) -> bool {
        !req.headers.contains_key("authorization")
    }

    #[tokio::test]
    async fn test_request_carries_attached_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/employees"))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        client.attach("abc123");
        let employees = client.fetch_employees().await.unwrap();
        assert!(employees.is_empty());
    }

    #[tokio::test]
    async fn test_detach_removes_header() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/stats"))
            .and(has_no_auth)
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_access_attempts": 0, "granted": 0, "denied": 0, "grant_rate": 0
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        client.attach("abc123");
        client.detach();
        assert!(!client.has_token());
        client.fetch_stats().await.unwrap();
    }

    #[tokio::test]
    async fn test_attach_replaces_previous_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/employees"))
            .and(header("Authorization", "Bearer second"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(format!("{}/", mock_server.uri())).unwrap();
        client.attach("first");
        client.attach("second");
        assert_eq!(client.token().as_deref(), Some("second"));
        client.fetch_employees().await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "admin@x.com", "password": "secret"})))
            .and(has_no_auth)
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "abc123",
                "token_type": "bearer"
            })))
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        let token = client.authenticate("admin@x.com", "secret").await.unwrap();
        assert_eq!(token, "abc123");
        // The client itself is left untouched
        assert!(!client.has_token());
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
            )
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        let err = client.authenticate("admin@x.com", "nope").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.detail(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_authenticate_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        let err = client.authenticate("a@b.c", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_protected_call_unauthorized_propagates() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/stats"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        client.attach("expired");
        let err = client.fetch_stats().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_fetch_logs_sends_filters() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs"))
            .and(query_param("decision", "denied"))
            .and(query_param("limit", "25"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 11,
                    "timestamp": "2024-06-01T10:00:00",
                    "employee_id": null,
                    "employee_name": null,
                    "recognition_score": 0.31,
                    "decision": "denied"
                }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        client.attach("tok");
        let query = LogQuery::default()
            .with_decision(Decision::Denied)
            .with_limit(25);
        let logs = client.fetch_logs(&query).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].decision, Decision::Denied);
    }

    #[tokio::test]
    async fn test_fetch_dashboard_counts_employees() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/employees"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "employee_id": "E1", "name": "A"},
                {"id": 2, "employee_id": "E2", "name": "B"},
                {"id": 3, "employee_id": "E3", "name": "C"}
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logs/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_access_attempts": 20, "granted": 15, "denied": 5, "grant_rate": 75.0
            })))
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        client.attach("tok");
        let stats = client.fetch_dashboard().await.unwrap();
        assert_eq!(stats.total_employees, 3);
        assert_eq!(stats.access.granted, 15);
        assert_eq!(stats.access.grant_rate, 75.0);
    }

    #[tokio::test]
    async fn test_fetch_dashboard_ignores_record_shape() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/employees"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1},
                {"id": 2, "department": "Ops"}
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logs/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_access_attempts": 0, "granted": 0, "denied": 0, "grant_rate": 0
            })))
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        client.attach("tok");
        assert!(client.fetch_employees().await.is_err());
        let stats = client.fetch_dashboard().await.unwrap();
        assert_eq!(stats.total_employees, 2);
    }

    #[tokio::test]
    async fn test_request_sends_json_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/employees"))
            .and(header("Authorization", "Bearer tok"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"employee_id": "E9", "name": "Nina"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 9, "employee_id": "E9", "name": "Nina"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(mock_server.uri()).unwrap();
        client.attach("tok");
        let body = json!({"employee_id": "E9", "name": "Nina"});
        let response = client
            .request(Method::POST, "/employees", Some(&body), None::<&()>)
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let created: Employee = response.json().await.unwrap();
        assert_eq!(created.employee_id, "E9");
    }

    #[tokio::test]
    async fn test_network_error() {
        // Nothing listens on port 9 (discard) locally
        let client = ApiClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.fetch_employees().await.unwrap_err();
        assert!(err.is_transport());
    }
}
