use anyhow::Context as _;
use bytes::Bytes;
use std::path::Path;

use pummel_core::{HttpVersion, NoHooks, RunConfig, RunReport, SessionError};
use pummel_lua::Script;

use crate::cli::Cli;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

/// Everything the flags say, before any script gets a say.
fn base_config(cli: &Cli) -> RunConfig {
    let mut cfg = RunConfig {
        duration: cli.duration,
        concurrency: cli.concurrency,
        timeout: cli.timeout,
        ..RunConfig::default()
    };

    cfg.request.method = cli.method.clone();
    cfg.request.host = cli.host.clone().filter(|h| !h.is_empty());
    if let Some(body) = &cli.body {
        cfg.request.body = Bytes::from(body.clone());
    }

    let t = &mut cfg.transport;
    t.allow_redirects = cli.redir;
    t.disable_compression = cli.no_compression;
    t.disable_keep_alive = cli.no_keepalive;
    t.skip_verify = cli.no_verify;
    t.client_cert = cli.cert.clone();
    t.client_key = cli.key.clone();
    t.ca_cert = cli.ca.clone();
    t.version = if cli.http1 {
        HttpVersion::Http1
    } else {
        HttpVersion::Http2
    };

    cfg
}

fn read_playback(path: &Path) -> Result<String, RunError> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read playback file {}", path.display()))
        .map_err(RunError::InvalidInput)?;
    Ok(text.trim().to_string())
}

/// `@path` bodies are replaced by the file content.
fn resolve_body(body: &Bytes) -> Result<Option<Bytes>, RunError> {
    let Some(path) = body.strip_prefix(b"@") else {
        return Ok(None);
    };
    let path = String::from_utf8_lossy(path).into_owned();
    let data = std::fs::read(&path)
        .with_context(|| format!("could not read body file {path:?}"))
        .map_err(RunError::InvalidInput)?;
    Ok(Some(Bytes::from(data)))
}

/// Flags, then script assignments, then header flags; the URL comes from the playback file,
/// the script, or the positional argument, in that order.
pub(crate) fn resolve_config(cli: &Cli, script: Option<&Script>) -> Result<RunConfig, RunError> {
    let base = base_config(cli);
    let mut cfg = match script {
        Some(script) => script.probe(&base)?,
        None => base,
    };

    for (name, value) in &cli.headers {
        cfg.request.set_header(name.clone(), value.clone());
    }

    if let Some(path) = &cli.playback {
        cfg.request.url = read_playback(path)?;
    } else if cfg.request.url.is_empty()
        && let Some(url) = &cli.url
    {
        cfg.request.url = url.clone();
    }

    if cfg.request.url.trim().is_empty() {
        return Err(RunError::InvalidInput(anyhow::anyhow!(
            "no target url: pass a URL, use -f <file>, or set wrk.url in the script"
        )));
    }

    if let Some(body) = resolve_body(&cfg.request.body)? {
        cfg.request.body = body;
    }

    cfg.validate()?;
    Ok(cfg)
}

async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn exit_code(report: &RunReport) -> ExitCode {
    let script_failed = report
        .failures
        .iter()
        .any(|f| matches!(f.error, SessionError::Hook(_)));
    if script_failed {
        ExitCode::ScriptError
    } else if report.failures.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::RuntimeError
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode, RunError> {
    let script = cli.script.as_deref().map(Script::read).transpose()?;
    let cfg = resolve_config(&cli, script.as_ref())?;

    let out = output::formatter(cli.output);
    out.print_header(&cfg);

    let report = match &script {
        Some(script) => {
            pummel_core::run(&cfg, |worker| Ok(script.instantiate(worker)?), interrupted()).await?
        }
        None => pummel_core::run(&cfg, |_| Ok(NoHooks), interrupted()).await?,
    };

    if report.interrupted {
        tracing::info!("run stopped before its duration elapsed");
    }

    out.print_report(&report)
        .context("failed to write report")
        .map_err(RunError::RuntimeError)?;

    Ok(exit_code(&report))
}
