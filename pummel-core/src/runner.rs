mod aggregate;
mod cancel;
mod config;
mod error;
mod executor;
mod hooks;
mod run;
mod session;
mod stats;

pub use aggregate::{Aggregator, RunReport, Summary, WorkerFailure};
pub use cancel::CancellationToken;
pub use config::{
    DEFAULT_CONCURRENCY, DEFAULT_DURATION, DEFAULT_TIMEOUT, MAX_CONCURRENCY, RequestConfig,
    RunConfig, TransportOptions,
};
pub use error::{Error, Result};
pub use executor::{FailureReason, Outcome, USER_AGENT, build_request, classify_status, execute};
pub use hooks::{HookError, HookResult, NoHooks, ResponseView, ScriptHooks};
pub use run::run;
pub use session::{SessionError, SessionReport, SessionWorker};
pub use stats::RequesterStats;
