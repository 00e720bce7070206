use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use pummel_core::{
    HookResult, NoHooks, RequestConfig, ResponseView, RunConfig, ScriptHooks, SessionError,
};
use pummel_testserver::{
    GZIP_TEXT, PATH_COUNTER, PATH_ERROR, PATH_GZIP, PATH_MOVED, PATH_QP, PATH_SLOW, PATH_TEN,
    TEN_BYTES, TestServer,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn config(url: String, concurrency: usize, duration: Duration) -> RunConfig {
    let mut cfg = RunConfig {
        concurrency,
        duration,
        timeout: Duration::from_secs(2),
        ..RunConfig::default()
    };
    cfg.request.url = url;
    cfg
}

fn no_hooks(_: &RunConfig) -> HookResult<NoHooks> {
    Ok(NoHooks)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn successful_responses_are_counted_with_headers() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_TEN), 1, Duration::from_millis(300));

    let report = pummel_core::run(&cfg, no_hooks, std::future::pending()).await?;

    let stats = report.stats;
    assert!(stats.num_requests > 0);
    assert_eq!(stats.num_errors, 0);
    // Every response carries the ten byte body plus its header block.
    assert!(stats.total_response_bytes > stats.num_requests * TEN_BYTES.len() as u64);
    assert!(stats.min_request_time <= stats.max_request_time);
    assert!(!report.interrupted);
    assert!(report.failures.is_empty());
    assert_eq!(server.stats().requests_total(), stats.iterations());
    assert_eq!(server.stats().saw_user_agent(), stats.iterations());

    let summary = report.summary().ok_or("expected a summary")?;
    assert_eq!(summary.num_requests, stats.num_requests);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_errors_count_as_failures() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_ERROR), 2, Duration::from_millis(200));

    let report = pummel_core::run(&cfg, no_hooks, std::future::pending()).await?;

    assert_eq!(report.stats.num_requests, 0);
    assert!(report.stats.num_errors > 0);
    assert_eq!(report.stats.total_duration, Duration::ZERO);
    assert!(report.summary().is_none());

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocked_redirects_count_as_successes() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_MOVED), 1, Duration::from_millis(200));

    let report = pummel_core::run(&cfg, no_hooks, std::future::pending()).await?;

    assert!(report.stats.num_requests > 0);
    assert_eq!(report.stats.num_errors, 0);
    // Redirects are not followed, so the target never sees a request.
    assert_eq!(server.stats().requests_total(), report.stats.iterations());

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn query_strings_are_escaped_before_sending() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(
        format!("{}?foo=bar baz", server.url(PATH_QP)),
        1,
        Duration::from_millis(100),
    );

    let report = pummel_core::run(&cfg, no_hooks, std::future::pending()).await?;
    assert!(report.stats.num_requests > 0);
    assert_eq!(report.stats.num_errors, 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_worker_reports_once() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_TEN), 8, Duration::from_millis(200));

    let seen = Arc::new(AtomicU64::new(0));
    let report = pummel_core::run(
        &cfg,
        |worker: &RunConfig| {
            seen.fetch_or(1 << worker.id, Ordering::Relaxed);
            Ok(NoHooks)
        },
        std::future::pending(),
    )
    .await?;

    assert_eq!(report.workers, 8);
    // Worker ids are 1..=8.
    assert_eq!(seen.load(Ordering::Relaxed), 0b1_1111_1110);
    assert_eq!(server.stats().requests_total(), report.stats.iterations());

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interrupt_cuts_the_run_short() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_SLOW), 4, Duration::from_secs(30));

    let started = Instant::now();
    let report = pummel_core::run(
        &cfg,
        no_hooks,
        tokio::time::sleep(Duration::from_millis(200)),
    )
    .await?;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.interrupted);
    assert!(report.stats.num_requests > 0);

    server.shutdown().await;
    Ok(())
}

#[derive(Default)]
struct StopAfter {
    limit: u64,
    seen: u64,
}

impl ScriptHooks for StopAfter {
    fn response(&mut self, response: &ResponseView<'_>) -> HookResult<()> {
        if response.status == 200 {
            self.seen += 1;
        }
        Ok(())
    }

    fn stop(&mut self) -> HookResult<bool> {
        Ok(self.seen >= self.limit)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_hook_cancels_every_worker() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_TEN), 2, Duration::from_secs(30));

    let started = Instant::now();
    let report = pummel_core::run(
        &cfg,
        |_: &RunConfig| Ok(StopAfter { limit: 3, seen: 0 }),
        std::future::pending(),
    )
    .await?;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.interrupted);
    assert!(report.stats.num_requests >= 3);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_on_the_first_iteration_bounds_every_worker() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_TEN), 4, Duration::from_secs(30));

    let started = Instant::now();
    let report = pummel_core::run(
        &cfg,
        |_: &RunConfig| Ok(StopAfter { limit: 1, seen: 0 }),
        std::future::pending(),
    )
    .await?;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.interrupted);
    assert_eq!(report.workers, 4);
    // Each worker stops after its own first response at the latest.
    let iterations = report.stats.iterations();
    assert!(iterations >= 1);
    assert!(iterations <= cfg.concurrency as u64, "iterations={iterations}");
    assert_eq!(server.stats().requests_total(), iterations);

    server.shutdown().await;
    Ok(())
}

/// Counts responses whose body is the decoded gzip text.
struct PlainBody {
    matches: Arc<AtomicU64>,
}

impl ScriptHooks for PlainBody {
    fn response(&mut self, response: &ResponseView<'_>) -> HookResult<()> {
        if response.body == GZIP_TEXT.as_bytes() {
            self.matches.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn response_hook_sees_decoded_gzip_bodies() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_GZIP), 1, Duration::from_millis(200));
    let matches = Arc::new(AtomicU64::new(0));

    let report = pummel_core::run(
        &cfg,
        |_: &RunConfig| {
            Ok(PlainBody {
                matches: matches.clone(),
            })
        },
        std::future::pending(),
    )
    .await?;

    let stats = report.stats;
    assert!(stats.num_requests > 0);
    assert_eq!(stats.num_errors, 0);
    assert_eq!(matches.load(Ordering::Relaxed), stats.num_requests);
    // Sizes count the decoded body.
    assert!(stats.total_response_bytes > stats.num_requests * GZIP_TEXT.len() as u64);

    server.shutdown().await;
    Ok(())
}

struct Counter {
    base: String,
    n: u64,
}

impl ScriptHooks for Counter {
    fn request(&mut self, request: &mut RequestConfig) -> HookResult<()> {
        self.n += 1;
        request.url = format!("{}/{}", self.base, self.n);
        request.set_header("x-counter", self.n.to_string());
        Ok(())
    }

    fn delay(&mut self) -> HookResult<Option<Duration>> {
        Ok(Some(Duration::from_millis(10)))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn request_hook_rewrites_each_iteration() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_TEN), 1, Duration::from_millis(200));
    let base = server.url(PATH_COUNTER);

    let report = pummel_core::run(
        &cfg,
        |_: &RunConfig| {
            Ok(Counter {
                base: base.clone(),
                n: 0,
            })
        },
        std::future::pending(),
    )
    .await?;

    let iterations = report.stats.iterations();
    assert!(iterations > 1);
    // The 10ms delay keeps the loop well below one request per millisecond.
    assert!(iterations < 50, "iterations={iterations}");
    assert_eq!(server.stats().saw_counter_header(), iterations);
    assert_eq!(server.stats().max_counter(), iterations);

    server.shutdown().await;
    Ok(())
}

struct Failing;

impl ScriptHooks for Failing {
    fn response(&mut self, _: &ResponseView<'_>) -> HookResult<()> {
        Err(pummel_core::HookError::new("response hook failed"))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_hook_stops_only_its_worker_and_still_reports() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_TEN), 2, Duration::from_millis(200));

    let report = pummel_core::run(
        &cfg,
        |_: &RunConfig| Ok(Failing),
        std::future::pending(),
    )
    .await?;

    assert_eq!(report.failures.len(), 2);
    assert!(matches!(report.failures[0].error, SessionError::Hook(_)));
    // The request that triggered the hook was still recorded.
    assert_eq!(report.stats.num_requests, 2);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn bad_tls_material_fails_every_worker_without_hanging() -> Result<()> {
    let mut cfg = config(
        "https://127.0.0.1:1/".to_string(),
        3,
        Duration::from_secs(30),
    );
    cfg.transport.ca_cert = Some("/no/such/ca.pem".into());

    let report = pummel_core::run(&cfg, no_hooks, std::future::pending()).await?;

    assert_eq!(report.failures.len(), 3);
    assert!(
        report
            .failures
            .iter()
            .all(|f| matches!(f.error, SessionError::Client(_)))
    );
    assert_eq!(report.stats.iterations(), 0);
    Ok(())
}

#[tokio::test]
async fn hook_factory_errors_abort_before_any_request() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = config(server.url(PATH_TEN), 2, Duration::from_millis(100));

    let err = pummel_core::run(
        &cfg,
        |_: &RunConfig| -> HookResult<NoHooks> { Err(pummel_core::HookError::new("bad script")) },
        std::future::pending(),
    )
    .await
    .err()
    .ok_or("expected an error")?;

    assert!(matches!(err, pummel_core::Error::Hooks { worker: 1, .. }));
    assert_eq!(server.stats().requests_total(), 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_rejected_up_front() {
    let cfg = config(String::new(), 1, Duration::from_millis(100));
    let res = pummel_core::run(&cfg, no_hooks, std::future::pending()).await;
    assert!(matches!(res, Err(pummel_core::Error::MissingUrl)));
}
