use std::borrow::Cow;
use std::time::Duration;

use super::config::RequestConfig;

/// Failure raised by a hook. Fatal for the worker that ran it.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HookError(Box<dyn std::error::Error + Send + Sync>);

impl HookError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

pub type HookResult<T> = std::result::Result<T, HookError>;

/// What a response hook gets to see.
#[derive(Debug, Clone, Copy)]
pub struct ResponseView<'a> {
    pub status: u16,
    /// Lowercased header names, multiple values joined with ", ".
    pub headers: &'a [(String, String)],
    pub body: &'a [u8],
}

impl<'a> ResponseView<'a> {
    pub fn body_text(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.body)
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Per-worker extension points around each iteration.
///
/// Every method has a no-op default, so an implementation only overrides the hooks it defines.
/// A worker calls them in order: `request`, (send), `response`, `stop`, `delay`.
pub trait ScriptHooks: Send {
    /// May rewrite the worker's request before it is sent.
    fn request(&mut self, _request: &mut RequestConfig) -> HookResult<()> {
        Ok(())
    }

    /// Called once for every response that was read to completion.
    fn response(&mut self, _response: &ResponseView<'_>) -> HookResult<()> {
        Ok(())
    }

    /// `true` cancels the whole run.
    fn stop(&mut self) -> HookResult<bool> {
        Ok(false)
    }

    /// Pause before the next iteration.
    fn delay(&mut self) -> HookResult<Option<Duration>> {
        Ok(None)
    }
}

/// Runs without any script.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ScriptHooks for NoHooks {}

impl<H: ScriptHooks + ?Sized> ScriptHooks for Box<H> {
    fn request(&mut self, request: &mut RequestConfig) -> HookResult<()> {
        (**self).request(request)
    }

    fn response(&mut self, response: &ResponseView<'_>) -> HookResult<()> {
        (**self).response(response)
    }

    fn stop(&mut self) -> HookResult<bool> {
        (**self).stop()
    }

    fn delay(&mut self) -> HookResult<Option<Duration>> {
        (**self).delay()
    }
}
