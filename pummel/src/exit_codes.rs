#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// The run completed; also used when no request succeeded.
    Success = 0,

    /// The script failed to load or one of its hooks raised an error.
    ScriptError = 20,

    /// Invalid CLI/config input (bad flags, missing URL, unreadable playback or body file).
    InvalidInput = 30,

    /// A worker failed fatally or reports went missing.
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
