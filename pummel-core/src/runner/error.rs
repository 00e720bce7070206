use super::hooks::HookError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("concurrency must be between 1 and {}", super::config::MAX_CONCURRENCY)]
    InvalidConcurrency,

    #[error("duration must be greater than zero")]
    InvalidDuration,

    #[error("no target url configured")]
    MissingUrl,

    #[error("failed to load script hooks for worker {worker}: {source}")]
    Hooks { worker: u64, source: HookError },

    #[error("only {received} of {expected} workers reported statistics")]
    MissingReports { expected: usize, received: usize },
}
