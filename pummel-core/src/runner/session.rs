use std::time::Instant;

use pummel_http::HttpClient;

use super::cancel::CancellationToken;
use super::config::RunConfig;
use super::executor::execute;
use super::hooks::{HookError, ScriptHooks};
use super::stats::RequesterStats;

/// Why a worker stopped before its budget ran out.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to build http client: {0}")]
    Client(#[source] pummel_http::Error),

    #[error("script hook failed: {0}")]
    Hook(#[from] HookError),
}

/// What a worker sends back to the driver. Always produced, even when the worker failed.
#[derive(Debug)]
pub struct SessionReport {
    pub worker: u64,
    pub stats: RequesterStats,
    pub error: Option<SessionError>,
}

/// One concurrent load generator: its own client, its own request copy, its own hooks.
pub struct SessionWorker<H> {
    config: RunConfig,
    hooks: H,
    cancel: CancellationToken,
}

impl<H: ScriptHooks> SessionWorker<H> {
    pub fn new(config: RunConfig, hooks: H, cancel: CancellationToken) -> Self {
        Self {
            config,
            hooks,
            cancel,
        }
    }

    pub fn id(&self) -> u64 {
        self.config.id
    }

    /// Loop until the duration elapses or the run is cancelled.
    ///
    /// The deadline is checked before each iteration, so an in-flight request always finishes.
    pub async fn run(mut self) -> SessionReport {
        let worker = self.config.id;
        let mut stats = RequesterStats::default();

        let client = match HttpClient::new(&self.config.client_options()) {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(worker, error = %err, "failed to build http client");
                return SessionReport {
                    worker,
                    stats,
                    error: Some(SessionError::Client(err)),
                };
            }
        };

        let error = self.iterate(&client, &mut stats).await.err();
        if let Some(err) = &error {
            tracing::warn!(worker, error = %err, "worker stopped early");
        }

        tracing::debug!(
            worker,
            requests = stats.num_requests,
            errors = stats.num_errors,
            "worker finished"
        );

        SessionReport {
            worker,
            stats,
            error,
        }
    }

    async fn iterate(
        &mut self,
        client: &HttpClient,
        stats: &mut RequesterStats,
    ) -> Result<(), SessionError> {
        let started = Instant::now();
        let duration = self.config.duration;
        let request = &mut self.config.request;

        while started.elapsed() <= duration && !self.cancel.is_cancelled() {
            self.hooks.request(request)?;

            execute(client, request, &mut self.hooks, stats).await?;

            if self.hooks.stop()? && self.cancel.cancel() {
                tracing::info!(worker = self.config.id, "stop requested by script");
            }

            if let Some(delay) = self.hooks.delay()?
                && !delay.is_zero()
                && !self.cancel.is_cancelled()
            {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = self.cancel.cancelled() => {}
                }
            }
        }

        Ok(())
    }
}
