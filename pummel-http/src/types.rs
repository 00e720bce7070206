use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
    /// Response headers (lowercased header names). Multiple values are joined with ", ".
    pub headers: Vec<(String, String)>,
    /// Value of the `content-length` header, if the server declared one.
    pub content_length: Option<u64>,
    /// Estimated serialized size of the response header block.
    pub header_bytes: u64,
    /// Set when the response is a redirect that was not followed because redirects are disabled.
    pub redirect_blocked: bool,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Overrides the `Host` header of the first hop.
    pub host: Option<String>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: http::Method::GET,
            url: url.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
            host: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
pub enum HttpVersion {
    #[strum(serialize = "http1", serialize = "HTTP/1.1")]
    Http1,
    /// Negotiate HTTP/2 over TLS (ALPN), falling back to HTTP/1.1.
    #[default]
    #[strum(serialize = "http2", serialize = "HTTP/2")]
    Http2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Deadline for a whole request: connect, redirects and body read.
    pub timeout: Duration,
    pub allow_redirects: bool,
    pub disable_compression: bool,
    pub disable_keep_alive: bool,
    pub skip_verify: bool,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub ca_cert: Option<PathBuf>,
    pub version: HttpVersion,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            allow_redirects: false,
            disable_compression: false,
            disable_keep_alive: false,
            skip_verify: false,
            client_cert: None,
            client_key: None,
            ca_cert: None,
            version: HttpVersion::Http2,
        }
    }
}
