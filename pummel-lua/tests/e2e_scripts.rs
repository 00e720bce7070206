mod support;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use pummel_core::{HttpVersion, RunConfig, SessionError};
use pummel_lua::Result;
use pummel_testserver::{AUTH_TOKEN, PATH_COUNTER, PATH_TEN, TestServer};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn counter_script_rewrites_url_and_header_every_iteration() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = support::config(server.url(PATH_COUNTER), 1, Duration::from_millis(200));

    let report = support::run_script("counter.lua", cfg).await?;

    let iterations = report.stats.iterations();
    assert!(iterations > 1);
    assert_eq!(report.stats.num_errors, 0);
    assert_eq!(server.stats().saw_counter_header(), iterations);
    assert_eq!(server.stats().max_counter(), iterations);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pipeline_script_authenticates_then_posts() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = support::config(server.base_url().to_string(), 2, Duration::from_millis(300));

    let report = support::run_script("pipeline.lua", cfg).await?;

    assert_eq!(report.stats.num_errors, 0, "every call should be authed");
    let posts = server.stats().saw_bearer_token();
    assert!(posts > 0, "expected bearer {AUTH_TOKEN} on /foo");
    assert_eq!(server.stats().saw_post_body(), posts);
    // One /auth call per worker, everything else is a POST.
    assert_eq!(server.stats().requests_total(), posts + 2);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_script_ends_the_run_early() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = support::config(server.url(PATH_TEN), 2, Duration::from_secs(30));

    let started = Instant::now();
    let report = support::run_script("stop.lua", cfg).await?;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.interrupted);
    assert!(report.stats.num_requests >= 3);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delay_script_paces_requests() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = support::config(server.url(PATH_TEN), 1, Duration::from_millis(300));

    let report = support::run_script("delay.lua", cfg).await?;

    // 20ms between requests caps a 300ms run at roughly 16 iterations.
    let iterations = report.stats.iterations();
    assert!(iterations >= 1);
    assert!(iterations <= 20, "iterations={iterations}");

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_response_hook_is_fatal_for_each_worker() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = support::config(server.url(PATH_TEN), 2, Duration::from_secs(30));

    let started = Instant::now();
    let report = support::run_script("broken.lua", cfg).await?;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.failures.len(), 2);
    for failure in &report.failures {
        assert!(matches!(failure.error, SessionError::Hook(_)));
        assert!(failure.error.to_string().contains("cannot handle status 200"));
    }

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unrepresentable_delay_fails_the_worker_but_it_still_reports() -> Result<()> {
    let server = TestServer::start().await?;
    let cfg = support::config(server.url(PATH_TEN), 3, Duration::from_secs(30));

    let started = Instant::now();
    let report = support::run_script("huge_delay.lua", cfg).await?;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.workers, 3);
    assert_eq!(report.failures.len(), 3);
    assert_eq!(report.stats.num_requests, 3);
    for failure in &report.failures {
        assert!(matches!(failure.error, SessionError::Hook(_)));
    }

    server.shutdown().await;
    Ok(())
}

#[test]
fn config_script_overrides_run_options() -> Result<()> {
    let script = support::load_test_script("config.lua")?;
    let mut base = RunConfig::default();
    base.request.url = "http://localhost".to_string();

    let cfg = script.probe(&base)?;

    assert_eq!(cfg.concurrency, 2);
    assert_eq!(cfg.duration, Duration::from_secs(3));
    assert_eq!(cfg.timeout, Duration::from_secs(5));
    assert!(cfg.transport.allow_redirects);
    assert!(cfg.transport.disable_compression);
    assert!(!cfg.transport.disable_keep_alive);
    assert_eq!(cfg.transport.ca_cert, None::<PathBuf>);
    assert_eq!(cfg.transport.version, HttpVersion::Http1);
    assert_eq!(cfg.request.method, "POST");
    assert_eq!(cfg.request.url, "https://example.com");
    assert_eq!(cfg.request.host, None);
    assert_eq!(cfg.request.body.as_ref(), b"k1=v1&k2=v2");
    assert_eq!(
        cfg.request.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
    Ok(())
}

#[test]
fn missing_script_is_an_io_error() {
    let err = support::load_test_script("does-not-exist.lua");
    assert!(matches!(err, Err(pummel_lua::Error::Io(_))));
}

#[test]
fn scripts_can_require_siblings() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("helper.lua"), "return { n = 7 }")?;
    let main = dir.path().join("main.lua");
    std::fs::write(&main, "local h = require('helper')\nwrk.goroutines = h.n")?;

    let script = pummel_lua::Script::read(&main)?;
    let mut base = RunConfig::default();
    base.request.url = "http://localhost".to_string();

    assert_eq!(script.probe(&base)?.concurrency, 7);
    Ok(())
}
