use bytes::Bytes;
use pummel_http::{ClientOptions, HttpVersion};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::error::{Error, Result};

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
/// Upper bound on workers; each one owns a client, a script state and a channel slot.
pub const MAX_CONCURRENCY: usize = 100_000;

/// The part of the configuration a script may rewrite between iterations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub method: String,
    pub url: String,
    /// Overrides the `Host` header.
    pub host: Option<String>,
    /// Header name -> value, names kept as supplied.
    pub headers: BTreeMap<String, String>,
    /// Request payload; empty means no body.
    pub body: Bytes,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            url: String::new(),
            host: None,
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }
}

impl RequestConfig {
    /// Insert a header, replacing any previous value under the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportOptions {
    pub allow_redirects: bool,
    pub disable_compression: bool,
    pub disable_keep_alive: bool,
    pub skip_verify: bool,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub ca_cert: Option<PathBuf>,
    pub version: HttpVersion,
}

/// Everything a run needs. Built once, then cloned for every worker.
///
/// `Clone` is a deep copy: each clone owns its header map, so a script rewriting the request of
/// one worker never affects another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub request: RequestConfig,
    /// Wall-clock budget of every worker.
    pub duration: Duration,
    /// Number of parallel workers.
    pub concurrency: usize,
    /// Per-request deadline.
    pub timeout: Duration,
    pub transport: TransportOptions,
    /// Worker identifier; 0 for the template the workers are cloned from.
    pub id: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            request: RequestConfig::default(),
            duration: DEFAULT_DURATION,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            transport: TransportOptions::default(),
            id: 0,
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn for_worker(&self, id: u64) -> Self {
        let mut cfg = self.clone();
        cfg.id = id;
        cfg
    }

    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.timeout,
            allow_redirects: self.transport.allow_redirects,
            disable_compression: self.transport.disable_compression,
            disable_keep_alive: self.transport.disable_keep_alive,
            skip_verify: self.transport.skip_verify,
            client_cert: self.transport.client_cert.clone(),
            client_key: self.transport.client_key.clone(),
            ca_cert: self.transport.ca_cert.clone(),
            version: self.transport.version,
        }
    }

    /// Reject configurations no worker could run with.
    ///
    /// The URL itself is not parsed here; a malformed URL shows up as failed requests.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(Error::InvalidConcurrency);
        }
        if self.duration.is_zero() {
            return Err(Error::InvalidDuration);
        }
        if self.request.url.trim().is_empty() {
            return Err(Error::MissingUrl);
        }
        Ok(())
    }
}
