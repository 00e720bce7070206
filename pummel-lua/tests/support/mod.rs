#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use pummel_core::{RunConfig, RunReport};
use pummel_lua::{Result, Script};

pub fn scripts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("scripts")
}

pub fn load_test_script(name: &str) -> Result<Script> {
    Script::read(&scripts_dir().join(name))
}

pub fn config(url: String, concurrency: usize, duration: Duration) -> RunConfig {
    let mut cfg = RunConfig {
        concurrency,
        duration,
        timeout: Duration::from_secs(2),
        ..RunConfig::default()
    };
    cfg.request.url = url;
    cfg
}

/// Probe the script for run options, then run it with one state per worker.
pub async fn run_script(name: &str, base: RunConfig) -> Result<RunReport> {
    let script = load_test_script(name)?;
    let cfg = script.probe(&base)?;

    let report = pummel_core::run(
        &cfg,
        |worker: &RunConfig| Ok(script.instantiate(worker)?),
        std::future::pending(),
    )
    .await?;
    Ok(report)
}
