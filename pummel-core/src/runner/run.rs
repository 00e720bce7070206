use std::future::Future;

use tokio::sync::mpsc;
use tracing::Instrument as _;

use super::aggregate::{Aggregator, RunReport};
use super::cancel::CancellationToken;
use super::config::RunConfig;
use super::error::{Error, Result};
use super::hooks::{HookResult, ScriptHooks};
use super::session::SessionWorker;

/// Run a load test and wait for every worker's report.
///
/// `make_hooks` is called once per worker with that worker's configuration, before any
/// request is sent. When `interrupt` resolves the run is cancelled; workers finish their
/// current iteration and still report.
pub async fn run<H, F, I>(
    config: &RunConfig,
    mut make_hooks: F,
    interrupt: I,
) -> Result<RunReport>
where
    H: ScriptHooks + 'static,
    F: FnMut(&RunConfig) -> HookResult<H>,
    I: Future<Output = ()>,
{
    config.validate()?;

    let concurrency = config.concurrency;
    let cancel = CancellationToken::new();

    let mut workers = Vec::with_capacity(concurrency);
    for id in 1..=concurrency as u64 {
        let worker_config = config.for_worker(id);
        let hooks = make_hooks(&worker_config)
            .map_err(|source| Error::Hooks { worker: id, source })?;
        workers.push(SessionWorker::new(worker_config, hooks, cancel.clone()));
    }

    tracing::info!(
        url = %config.request.url,
        concurrency,
        duration = ?config.duration,
        "starting run"
    );

    let (tx, mut rx) = mpsc::channel(concurrency);
    for worker in workers {
        let tx = tx.clone();
        let span = tracing::debug_span!("worker", id = worker.id());
        tokio::spawn(
            async move {
                let report = worker.run().await;
                if tx.send(report).await.is_err() {
                    tracing::debug!("driver stopped listening for reports");
                }
            }
            .instrument(span),
        );
    }
    drop(tx);

    let mut agg = Aggregator::new(concurrency);
    let mut interrupt = std::pin::pin!(interrupt);
    let mut interrupted = false;

    while !agg.is_complete() {
        tokio::select! {
            () = &mut interrupt, if !interrupted => {
                interrupted = true;
                if cancel.cancel() {
                    tracing::info!("interrupted, waiting for workers to report");
                }
            }
            report = rx.recv() => match report {
                Some(report) => agg.fold(report),
                None => {
                    return Err(Error::MissingReports {
                        expected: concurrency,
                        received: agg.received(),
                    });
                }
            },
        }
    }

    Ok(agg.finish(cancel.is_cancelled()))
}
