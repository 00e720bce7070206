use std::collections::HashMap;
use std::io::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::time::{Duration, sleep};

pub const PATH_HELLO: &str = "/hello";
pub const PATH_TEN: &str = "/ten";
pub const PATH_CREATED: &str = "/created";
pub const PATH_ERROR: &str = "/error";
pub const PATH_MOVED: &str = "/moved";
pub const PATH_FOUND: &str = "/found";
pub const PATH_TEMPORARY: &str = "/temporary";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_ECHO: &str = "/echo";
pub const PATH_QP: &str = "/qp";
pub const PATH_HOST: &str = "/host";
pub const PATH_AUTH: &str = "/auth";
pub const PATH_FOO: &str = "/foo";
pub const PATH_COUNTER: &str = "/counter";
pub const PATH_GZIP: &str = "/gzip";

/// Body served by [`PATH_TEN`].
pub const TEN_BYTES: &str = "0123456789";
/// Body served by the redirect endpoints.
pub const REDIRECT_BODY: &str = "moved";
/// Token handed out by [`PATH_AUTH`] in the `x-token` header.
pub const AUTH_TOKEN: &str = "secret-token";
/// Body served by [`PATH_GZIP`], gzip-compressed when the client accepts it.
pub const GZIP_TEXT: &str = "hello compressed world";
/// Host value [`PATH_HOST`] accepts.
pub const EXPECTED_HOST: &str = "pummel.test";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    saw_post_header: Arc<AtomicU64>,
    saw_post_body: Arc<AtomicU64>,
    saw_user_agent: Arc<AtomicU64>,
    saw_bearer_token: Arc<AtomicU64>,
    saw_counter_header: Arc<AtomicU64>,
    max_counter: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn observe(&self, headers: &HeaderMap) {
        Self::inc(&self.requests_total);
        if headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("pummel"))
        {
            Self::inc(&self.saw_user_agent);
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn saw_post_header(&self) -> u64 {
        self.saw_post_header.load(Ordering::Relaxed)
    }

    pub fn saw_post_body(&self) -> u64 {
        self.saw_post_body.load(Ordering::Relaxed)
    }

    pub fn saw_user_agent(&self) -> u64 {
        self.saw_user_agent.load(Ordering::Relaxed)
    }

    pub fn saw_bearer_token(&self) -> u64 {
        self.saw_bearer_token.load(Ordering::Relaxed)
    }

    pub fn saw_counter_header(&self) -> u64 {
        self.saw_counter_header.load(Ordering::Relaxed)
    }

    pub fn max_counter(&self) -> u64 {
        self.max_counter.load(Ordering::Relaxed)
    }
}

async fn handle_hello(State(stats): State<TestServerStats>, headers: HeaderMap) -> &'static str {
    stats.observe(&headers);
    "Hello World!"
}

async fn handle_ten(State(stats): State<TestServerStats>, headers: HeaderMap) -> &'static str {
    stats.observe(&headers);
    TEN_BYTES
}

async fn handle_created(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
) -> (StatusCode, &'static str) {
    stats.observe(&headers);
    (StatusCode::CREATED, "created")
}

async fn handle_error(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
) -> (StatusCode, &'static str) {
    stats.observe(&headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data)?;
    enc.finish()
}

async fn handle_gzip(State(stats): State<TestServerStats>, headers: HeaderMap) -> Response {
    stats.observe(&headers);
    let accepts_gzip = headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("gzip"));
    if !accepts_gzip {
        return GZIP_TEXT.into_response();
    }

    match gzip(GZIP_TEXT.as_bytes()) {
        Ok(body) => ([(header::CONTENT_ENCODING, "gzip")], body).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn redirect(status: StatusCode) -> impl IntoResponse {
    (status, [(header::LOCATION, PATH_TEN)], REDIRECT_BODY)
}

async fn handle_moved(State(stats): State<TestServerStats>, headers: HeaderMap) -> impl IntoResponse {
    stats.observe(&headers);
    redirect(StatusCode::MOVED_PERMANENTLY)
}

async fn handle_found(State(stats): State<TestServerStats>, headers: HeaderMap) -> impl IntoResponse {
    stats.observe(&headers);
    redirect(StatusCode::FOUND)
}

async fn handle_temporary(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
) -> impl IntoResponse {
    stats.observe(&headers);
    redirect(StatusCode::TEMPORARY_REDIRECT)
}

async fn handle_slow(State(stats): State<TestServerStats>, headers: HeaderMap) -> &'static str {
    stats.observe(&headers);
    sleep(Duration::from_millis(50)).await;
    "slow"
}

async fn handle_echo(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Bytes) {
    stats.observe(&headers);

    if headers.get("x-test").and_then(|v| v.to_str().ok()) == Some("1") {
        TestServerStats::inc(&stats.saw_post_header);
    }
    if body.as_ref() == b"ping" {
        TestServerStats::inc(&stats.saw_post_body);
    }

    (StatusCode::OK, body)
}

async fn handle_qp(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    stats.observe(&headers);

    if query.get("foo").map(String::as_str) == Some("bar baz") {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn handle_host(State(stats): State<TestServerStats>, headers: HeaderMap) -> StatusCode {
    stats.observe(&headers);

    if headers.get(header::HOST).and_then(|v| v.to_str().ok()) == Some(EXPECTED_HOST) {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn handle_auth(State(stats): State<TestServerStats>, headers: HeaderMap) -> impl IntoResponse {
    stats.observe(&headers);
    (StatusCode::OK, [("x-token", AUTH_TOKEN)], "authed")
}

async fn handle_foo(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    stats.observe(&headers);

    let expected = format!("Bearer {AUTH_TOKEN}");
    let authed = headers
        .get("authentication")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authed {
        return StatusCode::UNAUTHORIZED;
    }

    TestServerStats::inc(&stats.saw_bearer_token);
    if body.as_ref() == b"foo=bar" {
        TestServerStats::inc(&stats.saw_post_body);
    }
    StatusCode::CREATED
}

async fn handle_counter(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
    Path(n): Path<u64>,
) -> StatusCode {
    stats.observe(&headers);

    if headers
        .get("x-counter")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        == Some(n)
    {
        TestServerStats::inc(&stats.saw_counter_header);
    }
    stats.max_counter.fetch_max(n, Ordering::Relaxed);

    StatusCode::OK
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_HELLO, get(handle_hello))
        .route(PATH_TEN, get(handle_ten))
        .route(PATH_CREATED, get(handle_created).post(handle_created))
        .route(PATH_ERROR, get(handle_error))
        .route(PATH_MOVED, get(handle_moved))
        .route(PATH_FOUND, get(handle_found))
        .route(PATH_TEMPORARY, get(handle_temporary))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_ECHO, post(handle_echo))
        .route(PATH_QP, get(handle_qp))
        .route(PATH_HOST, get(handle_host))
        .route(PATH_GZIP, get(handle_gzip))
        .route(PATH_AUTH, get(handle_auth))
        .route(PATH_FOO, post(handle_foo))
        .route(&format!("{PATH_COUNTER}/{{n}}"), get(handle_counter))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();

        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
