use std::path::Path;

pub use pummel_core::RunConfig;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] pummel_core::Error),

    #[error("`wrk.{field}` must be {expected}")]
    InvalidOption {
        field: &'static str,
        expected: &'static str,
    },

    #[error("`delay()` must return a number of milliseconds")]
    InvalidDelay,
}

impl From<Error> for pummel_core::HookError {
    fn from(err: Error) -> Self {
        pummel_core::HookError::new(err)
    }
}

mod hooks;
mod loader;
mod wrk;

pub use hooks::LuaHooks;

/// A script read from disk, ready to be loaded into any number of Lua states.
#[derive(Debug, Clone)]
pub struct Script {
    pub path: std::path::PathBuf,
    pub text: String,
}

impl Script {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    /// Run the script once in a throwaway state and read back the run options it assigned
    /// on top of `base`.
    pub fn probe(&self, base: &RunConfig) -> Result<RunConfig> {
        LuaHooks::load(self, base)?.run_config(base)
    }

    /// A fresh state bound to one worker's configuration.
    pub fn instantiate(&self, worker: &RunConfig) -> Result<LuaHooks> {
        LuaHooks::load(self, worker)
    }
}
