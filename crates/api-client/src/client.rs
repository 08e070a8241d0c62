//! API gateway client: the single entry point for all backend calls.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use platewise_core::{
    EntityKind, ReplayError, ReplayTransport, Session, StagedRecord, UserProfile, UserRole,
};
use platewise_storage_kv::{ResponseCache, SessionStore, StagingStore};

use crate::config::ApiClientConfig;
use crate::error::{ApiError, Result};
use crate::types::{ApiEnvelope, AuthResponse, LoginRequest, RegisterRequest};

const MAX_LOG_BODY_CHARS: usize = 512;

type AuthFailureListener = Box<dyn Fn() + Send + Sync>;

/// Gateway client owning request shaping, response normalization, and
/// offline degradation.
///
/// Constructed once at application start with explicit store handles; no
/// ambient lookup. The client performs no retries itself: reads degrade to
/// cached/staged data, and replaying offline writes is entirely the sync
/// engine's job.
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiClientConfig,
    session: Arc<SessionStore>,
    cache: Arc<ResponseCache>,
    staging: Arc<StagingStore>,
    auth_listeners: Mutex<Vec<AuthFailureListener>>,
}

impl ApiClient {
    pub fn new(
        config: ApiClientConfig,
        session: Arc<SessionStore>,
        cache: Arc<ResponseCache>,
        staging: Arc<StagingStore>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            config,
            session,
            cache,
            staging,
            auth_listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a hook fired after the backend rejects our credentials and
    /// the stored token has been cleared. The UI uses it to route back to
    /// the login entry point on protected routes.
    pub fn on_auth_failure(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.auth_listeners.lock().unwrap().push(Box::new(listener));
    }

    fn notify_auth_failure(&self) {
        let listeners = self.auth_listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener();
        }
    }

    fn log_response(status: StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Headers for one outgoing request. The token is re-read on every
    /// call: a concurrent 401-clear only affects requests that start
    /// after it.
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.session.token()? {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::auth("Invalid access token format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        Ok(headers)
    }

    fn transport_unreachable(err: &reqwest::Error) -> bool {
        err.is_connect() || err.is_timeout()
    }

    fn is_auth_failure(status: u16, message: &str) -> bool {
        if status == 401 {
            return true;
        }
        let lower = message.to_ascii_lowercase();
        lower.contains("jwt expired") || lower.contains("invalid token")
    }

    /// Issue one backend call.
    ///
    /// HTTP 2xx with a JSON body is returned verbatim; successful GETs are
    /// additionally captured for offline fallback. Failures are
    /// classified in priority order: application error with the server's
    /// message, application error from the status line, transport
    /// unreachability (degrading GETs to a local substitute when one
    /// exists), and authentication failure, which clears the stored token
    /// as a side effect.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        let mut request = self.http.request(method.clone(), &url).headers(self.headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                if Self::transport_unreachable(&err) && method == Method::GET {
                    if let Some(local) = self.offline_substitute(path)? {
                        warn!("GET {} unreachable, serving local fallback", path);
                        return Ok(local);
                    }
                }
                return Err(ApiError::Http(err));
            }
        };

        let status = response.status();
        let raw = response.text().await?;
        Self::log_response(status, &raw);

        if status.is_success() {
            let value: Value = if raw.is_empty() {
                json!({ "success": true })
            } else {
                serde_json::from_str(&raw)?
            };
            if method == Method::GET {
                let fingerprint = ResponseCache::fingerprint(method.as_str(), path);
                if let Err(e) = self.cache.put(&fingerprint, &value) {
                    warn!("could not capture response for offline fallback: {}", e);
                }
            }
            return Ok(value);
        }

        let message = serde_json::from_str::<ApiEnvelope>(&raw)
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or_else(|| format!("HTTP {}", status));

        if Self::is_auth_failure(status.as_u16(), &message) {
            if let Err(e) = self.session.clear_token() {
                warn!("could not clear rejected token: {}", e);
            }
            self.notify_auth_failure();
            return Err(ApiError::auth(message));
        }

        Err(ApiError::api(status.as_u16(), message))
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Local substitute for an unreachable read: the last captured
    /// response wins, else a listing synthesized from staged records.
    /// `None` means there is no safe substitute and the transport error
    /// must propagate.
    fn offline_substitute(&self, path: &str) -> Result<Option<Value>> {
        let fingerprint = ResponseCache::fingerprint("GET", path);
        if let Some(entry) = self.cache.get(&fingerprint)? {
            return Ok(Some(entry.body));
        }

        let Some(kind) = EntityKind::for_list_path(path) else {
            return Ok(None);
        };
        let records = self.staging.list_all(kind)?;
        if records.is_empty() {
            return Ok(None);
        }
        let data = records
            .iter()
            .map(|record| record.payload.to_create_body())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Some(json!({ "success": true, "data": data })))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Authentication flows (owners of the Session lifecycle)
    // ─────────────────────────────────────────────────────────────────────

    fn profile_from_email(email: &str, name: Option<String>) -> UserProfile {
        UserProfile {
            email: email.to_string(),
            name: name.unwrap_or_else(|| {
                email.split('@').next().unwrap_or(email).to_string()
            }),
            role: UserRole::Member,
        }
    }

    async fn authenticate(&self, path: &str, email: &str, name: Option<String>, body: Value) -> Result<Session> {
        let value = self.request(Method::POST, path, Some(&body)).await?;
        let auth: AuthResponse = serde_json::from_value(value)?;
        if !auth.success {
            return Err(ApiError::api(
                200,
                auth.message.unwrap_or_else(|| "Authentication failed".to_string()),
            ));
        }

        let profile = auth
            .user
            .unwrap_or_else(|| Self::profile_from_email(email, name));
        let session = Session::new(auth.token, profile);
        self.session.store(&session)?;
        info!("session established for {}", email);
        Ok(session)
    }

    /// POST /auth/login; persists the returned session, overwriting any
    /// previous one.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.authenticate("/auth/login", email, None, body).await
    }

    /// POST /auth/register; persists the returned session.
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<Session> {
        let body = serde_json::to_value(RegisterRequest {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        })?;
        self.authenticate("/auth/register", email, Some(name.to_string()), body)
            .await
    }

    /// Clear the stored session entirely.
    pub fn logout(&self) -> Result<()> {
        self.session.clear()?;
        info!("session cleared");
        Ok(())
    }
}

#[async_trait]
impl ReplayTransport for ApiClient {
    async fn replay_create(&self, record: &StagedRecord) -> std::result::Result<(), ReplayError> {
        let path = record.kind().create_path();
        let body = record
            .payload
            .to_create_body()
            .map_err(|e| ReplayError::Payload(e.to_string()))?;

        match self.request(Method::POST, path, Some(&body)).await {
            Ok(value) => {
                // A 2xx with success=false is still a rejection.
                let accepted = value.get("success").and_then(Value::as_bool).unwrap_or(true);
                if accepted {
                    Ok(())
                } else {
                    let message = value
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("create rejected")
                        .to_string();
                    Err(ReplayError::Rejected {
                        status: 200,
                        message,
                    })
                }
            }
            Err(err) => Err(match err {
                ApiError::Auth(message) => ReplayError::Auth(message),
                ApiError::Api { status, message } => ReplayError::Rejected { status, message },
                ApiError::Http(e) => ReplayError::Unreachable(e.to_string()),
                ApiError::Json(e) => ReplayError::Payload(e.to_string()),
                ApiError::Storage(e) => ReplayError::Payload(e.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platewise_core::{EntityPayload, MealPayload, MealType, MemoryKvStore};
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, VecDeque};
    use std::net::TcpListener as StdTcpListener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        method: String,
        path: String,
        authorization: Option<String>,
    }

    #[derive(Debug, Clone)]
    struct MockOutcome {
        status: u16,
        body: String,
    }

    fn outcome(status: u16, body: &str) -> MockOutcome {
        MockOutcome {
            status,
            body: body.to_string(),
        }
    }

    fn header_end_offset(buffer: &[u8]) -> Option<usize> {
        buffer.windows(4).position(|window| window == b"\r\n\r\n")
    }

    async fn read_http_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
        let mut buffer = Vec::new();
        loop {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                return None;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if header_end_offset(&buffer).is_some() {
                break;
            }
        }

        let header_end = header_end_offset(&buffer)?;
        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let mut lines = head.lines();
        let request_line = lines.next()?.to_string();
        let mut parts = request_line.split_whitespace();
        let method = parts.next()?.to_string();
        let path = parts.next()?.to_string();

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut body_read = buffer.len().saturating_sub(header_end + 4);
        while body_read < content_length {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            body_read = body_read.saturating_add(read);
        }

        Some(CapturedRequest {
            method,
            path,
            authorization: headers.get("authorization").cloned(),
        })
    }

    fn status_text(status: u16) -> &'static str {
        match status {
            200 => "OK",
            201 => "Created",
            400 => "Bad Request",
            401 => "Unauthorized",
            500 => "Internal Server Error",
            _ => "Error",
        }
    }

    async fn write_http_response(
        stream: &mut tokio::net::TcpStream,
        status: u16,
        body: &str,
    ) -> std::io::Result<()> {
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            status_text(status),
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.flush().await
    }

    async fn start_mock_server(
        outcomes: Vec<MockOutcome>,
    ) -> (
        String,
        Arc<TokioMutex<Vec<CapturedRequest>>>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let captured = Arc::new(TokioMutex::new(Vec::<CapturedRequest>::new()));
        let scripted = Arc::new(TokioMutex::new(VecDeque::from(outcomes)));
        let captured_clone = Arc::clone(&captured);
        let scripted_clone = Arc::clone(&scripted);

        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let Some(request) = read_http_request(&mut stream).await else {
                    continue;
                };
                captured_clone.lock().await.push(request);

                let next = scripted_clone
                    .lock()
                    .await
                    .pop_front()
                    .unwrap_or_else(|| outcome(500, r#"{"success":false,"message":"unexpected request"}"#));
                let _ = write_http_response(&mut stream, next.status, &next.body).await;
            }
        });

        (format!("http://{}", addr), captured, handle)
    }

    /// A base URL nothing listens on; connections are refused immediately.
    fn unreachable_base_url() -> String {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("probe bind");
        let addr = listener.local_addr().expect("probe addr");
        drop(listener);
        format!("http://{}", addr)
    }

    struct Harness {
        client: ApiClient,
        session: Arc<SessionStore>,
        cache: Arc<ResponseCache>,
        staging: Arc<StagingStore>,
    }

    fn harness(base_url: &str) -> Harness {
        let kv = Arc::new(MemoryKvStore::new());
        let session = Arc::new(SessionStore::new(kv.clone()));
        let cache = Arc::new(ResponseCache::new(kv.clone()));
        let staging = Arc::new(StagingStore::new(kv));
        let client = ApiClient::new(
            ApiClientConfig::new(base_url),
            session.clone(),
            cache.clone(),
            staging.clone(),
        );
        Harness {
            client,
            session,
            cache,
            staging,
        }
    }

    fn seeded_session(token: &str) -> Session {
        Session::new(
            Some(token.to_string()),
            UserProfile {
                email: "a@x.com".to_string(),
                name: "Ada".to_string(),
                role: UserRole::Member,
            },
        )
    }

    fn staged_meal() -> EntityPayload {
        EntityPayload::Meal(MealPayload {
            name: "Lentil soup".to_string(),
            meal_type: MealType::Dinner,
            planned_for: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            calories: 520,
            protein_g: 24.0,
            carbs_g: 61.5,
            fat_g: 14.2,
            cost: dec!(3.80),
        })
    }

    #[tokio::test]
    async fn success_body_returns_verbatim_and_is_captured() {
        let (base_url, captured, server) = start_mock_server(vec![outcome(
            200,
            r#"{"success":true,"data":[{"name":"Lentil soup"}]}"#,
        )])
        .await;

        let h = harness(&base_url);
        let value = h.client.get("/meals").await.expect("success");
        assert_eq!(value["data"][0]["name"], "Lentil soup");

        let entry = h
            .cache
            .get(&ResponseCache::fingerprint("GET", "/meals"))
            .unwrap()
            .expect("captured");
        assert_eq!(entry.body, value);

        let requests = captured.lock().await.clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/meals");
        assert_eq!(requests[0].authorization, None);

        server.abort();
    }

    #[tokio::test]
    async fn application_error_surfaces_server_message() {
        let (base_url, _captured, server) = start_mock_server(vec![outcome(
            400,
            r#"{"success":false,"message":"meal name is required"}"#,
        )])
        .await;

        let h = harness(&base_url);
        let err = h
            .client
            .post("/meals", &json!({"calories": 100}))
            .await
            .expect_err("application error");
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "meal name is required");
            }
            other => panic!("unexpected error {:?}", other),
        }

        server.abort();
    }

    #[tokio::test]
    async fn non_json_error_body_falls_back_to_status_line() {
        let (base_url, _captured, server) =
            start_mock_server(vec![outcome(500, "<html>boom</html>")]).await;

        let h = harness(&base_url);
        let err = h.client.get("/meals").await.expect_err("http error");
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("500"), "status line expected: {}", message);
            }
            other => panic!("unexpected error {:?}", other),
        }

        server.abort();
    }

    #[tokio::test]
    async fn auth_failure_clears_token_and_subsequent_requests_are_anonymous() {
        let (base_url, captured, server) = start_mock_server(vec![
            outcome(401, r#"{"success":false,"message":"jwt expired"}"#),
            outcome(200, r#"{"success":true,"data":[]}"#),
        ])
        .await;

        let h = harness(&base_url);
        h.session.store(&seeded_session("stale-token")).unwrap();

        let err = h.client.get("/meals").await.expect_err("auth error");
        assert!(matches!(err, ApiError::Auth(_)));
        assert_eq!(h.session.token().unwrap(), None);

        h.client.get("/meals").await.expect("second request");
        let requests = captured.lock().await.clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].authorization.as_deref(),
            Some("Bearer stale-token")
        );
        assert_eq!(requests[1].authorization, None);

        server.abort();
    }

    #[tokio::test]
    async fn auth_failure_notifies_listeners() {
        let (base_url, _captured, server) = start_mock_server(vec![outcome(
            401,
            r#"{"success":false,"message":"jwt expired"}"#,
        )])
        .await;

        let h = harness(&base_url);
        h.session.store(&seeded_session("stale-token")).unwrap();
        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        h.client.on_auth_failure(move || {
            fired_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let _ = h.client.get("/meals").await;
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);

        server.abort();
    }

    #[tokio::test]
    async fn unreachable_read_serves_cached_response() {
        let h = harness(&unreachable_base_url());
        let cached = json!({"success": true, "data": [{"name": "Cached soup"}]});
        h.cache
            .put(&ResponseCache::fingerprint("GET", "/meals"), &cached)
            .unwrap();

        let value = h.client.get("/meals").await.expect("fallback");
        assert_eq!(value, cached);
    }

    #[tokio::test]
    async fn unreachable_read_synthesizes_from_staged_records() {
        let h = harness(&unreachable_base_url());
        let payload = staged_meal();
        h.staging.put(&payload.natural_key(), payload).unwrap();

        let value = h.client.get("/meals").await.expect("fallback");
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["data"][0]["name"], "Lentil soup");
    }

    #[tokio::test]
    async fn unreachable_endpoint_without_substitute_propagates() {
        let h = harness(&unreachable_base_url());

        let read_err = h.client.get("/reports/weekly").await.expect_err("no substitute");
        assert!(read_err.is_unreachable(), "got {:?}", read_err);

        let write_err = h
            .client
            .post("/meals", &json!({"name": "Soup"}))
            .await
            .expect_err("writes never degrade");
        assert!(write_err.is_unreachable(), "got {:?}", write_err);
    }

    #[tokio::test]
    async fn login_persists_session() {
        let (base_url, _captured, server) = start_mock_server(vec![outcome(
            200,
            r#"{"success":true,"token":"jwt-1"}"#,
        )])
        .await;

        let h = harness(&base_url);
        let session = h.client.login("a@x.com", "pw").await.expect("login");
        assert_eq!(session.token.as_deref(), Some("jwt-1"));
        assert_eq!(h.session.token().unwrap().as_deref(), Some("jwt-1"));

        server.abort();
    }

    #[tokio::test]
    async fn failed_login_surfaces_message_and_stores_nothing() {
        let (base_url, _captured, server) = start_mock_server(vec![outcome(
            200,
            r#"{"success":false,"message":"wrong password"}"#,
        )])
        .await;

        let h = harness(&base_url);
        let err = h.client.login("a@x.com", "pw").await.expect_err("rejected");
        match err {
            ApiError::Api { message, .. } => assert_eq!(message, "wrong password"),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(h.session.load().unwrap().is_none());

        server.abort();
    }

    #[tokio::test]
    async fn replay_create_posts_to_the_kind_create_path() {
        let (base_url, captured, server) =
            start_mock_server(vec![outcome(201, r#"{"success":true}"#)]).await;

        let h = harness(&base_url);
        let payload = staged_meal();
        let record = h.staging.put(&payload.natural_key(), payload).unwrap();
        h.client.replay_create(&record).await.expect("replayed");

        let requests = captured.lock().await.clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/meals");

        server.abort();
    }

    #[tokio::test]
    async fn replay_create_maps_server_rejection() {
        let (base_url, _captured, server) = start_mock_server(vec![outcome(
            500,
            r#"{"success":false,"message":"db down"}"#,
        )])
        .await;

        let h = harness(&base_url);
        let payload = staged_meal();
        let record = h.staging.put(&payload.natural_key(), payload).unwrap();
        let err = h.client.replay_create(&record).await.expect_err("rejected");
        match err {
            ReplayError::Rejected { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "db down");
            }
            other => panic!("unexpected error {:?}", other),
        }

        server.abort();
    }
}
