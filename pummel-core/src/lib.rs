pub mod runner;

pub use pummel_http::{
    ClientOptions, Error as HttpError, HttpClient, HttpTransportErrorKind, HttpVersion,
    escape_query,
};
pub use runner::{
    Aggregator, CancellationToken, DEFAULT_CONCURRENCY, DEFAULT_DURATION, DEFAULT_TIMEOUT, Error,
    FailureReason, HookError, HookResult, MAX_CONCURRENCY, NoHooks, Outcome, RequestConfig,
    RequesterStats, ResponseView, Result, RunConfig, RunReport, ScriptHooks, SessionError,
    SessionReport, SessionWorker, Summary, TransportOptions, USER_AGENT, WorkerFailure,
    classify_status, execute, run,
};
