use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    ScriptError(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::ScriptError(_) => ExitCode::ScriptError,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::ScriptError(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl From<pummel_core::Error> for RunError {
    fn from(err: pummel_core::Error) -> Self {
        use pummel_core::Error;

        match err {
            Error::InvalidConcurrency | Error::InvalidDuration | Error::MissingUrl => {
                Self::InvalidInput(err.into())
            }
            Error::Hooks { .. } => Self::ScriptError(err.into()),
            Error::MissingReports { .. } => Self::RuntimeError(err.into()),
        }
    }
}

impl From<pummel_lua::Error> for RunError {
    fn from(err: pummel_lua::Error) -> Self {
        match err {
            pummel_lua::Error::Io(_) => Self::InvalidInput(err.into()),
            pummel_lua::Error::Core(core) => core.into(),
            _ => Self::ScriptError(err.into()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}
