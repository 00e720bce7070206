use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::collections::BTreeMap;
use std::io::Read as _;
use std::time::Duration;

use super::estimate::estimate_header_bytes;
use super::tls::client_config;
use super::util::has_header;
use super::{ClientOptions, Error, HttpRequest, HttpResponse, HttpVersion, Result};

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
    allow_redirects: bool,
    compression: bool,
}

impl HttpClient {
    /// Build a client with its own connection pool.
    ///
    /// Fails on configuration problems (zero timeout, unreadable or invalid TLS material).
    pub fn new(opts: &ClientOptions) -> Result<Self> {
        if opts.timeout.is_zero() {
            return Err(Error::InvalidTimeout);
        }

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        // The OS-level TCP connect timeout can be tens of seconds; never wait longer than the
        // request deadline itself.
        http_connector.set_connect_timeout(Some(opts.timeout));

        let builder = HttpsConnectorBuilder::new()
            .with_tls_config(client_config(opts)?)
            .https_or_http();

        let https_connector = match opts.version {
            HttpVersion::Http1 => builder.enable_http1().wrap_connector(http_connector),
            HttpVersion::Http2 => builder.enable_all_versions().wrap_connector(http_connector),
        };

        let mut client = Client::builder(TokioExecutor::new());
        if opts.disable_keep_alive {
            client.pool_max_idle_per_host(0);
        }
        let inner = client.build(https_connector);

        Ok(Self {
            inner,
            timeout: opts.timeout,
            allow_redirects: opts.allow_redirects,
            compression: !opts.disable_compression,
        })
    }

    /// Send a request and read the full response, bounded by the client timeout.
    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        match tokio::time::timeout(self.timeout, self.send(req)).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }

    async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            mut method,
            url,
            mut headers,
            mut body,
            mut host,
        } = req;

        let mut current = url::Url::parse(&url).map_err(|_| Error::InvalidUrl(url.clone()))?;

        // Only a gzip encoding we asked for ourselves is decoded.
        let decode_gzip = self.compression && !has_header(&headers, "accept-encoding");
        if decode_gzip {
            headers.push(("accept-encoding".to_string(), "gzip".to_string()));
        }

        let mut hops = 0usize;
        loop {
            let res = self
                .send_once(&method, &current, &headers, &body, host.as_deref())
                .await?;

            let status = res.status();
            let location = is_redirect(status)
                .then(|| res.headers().get(http::header::LOCATION))
                .flatten()
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let Some(location) = location else {
                return read_response(res, false, decode_gzip).await;
            };

            if !self.allow_redirects {
                tracing::debug!(status = status.as_u16(), %location, "redirect blocked");
                return read_response(res, true, decode_gzip).await;
            }

            if hops == MAX_REDIRECTS {
                return Err(Error::TooManyRedirects(MAX_REDIRECTS));
            }
            hops += 1;

            current = current
                .join(&location)
                .map_err(|_| Error::InvalidRedirect(location.clone()))?;

            if matches!(
                status,
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
            ) && method != http::Method::HEAD
            {
                method = http::Method::GET;
                body = Bytes::new();
            }

            // The override only applies to the host the user targeted.
            host = None;
        }
    }

    async fn send_once(
        &self,
        method: &http::Method,
        url: &url::Url,
        headers: &[(String, String)],
        body: &Bytes,
        host: Option<&str>,
    ) -> Result<hyper::Response<Incoming>> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::UnsupportedScheme(url.to_string()));
        }

        let uri: hyper::Uri = url
            .as_str()
            .parse()
            .map_err(|_| Error::InvalidUrl(url.to_string()))?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);

        for (k, v) in headers {
            let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
            let value = http::header::HeaderValue::from_str(v)?;
            builder = builder.header(name, value);
        }

        let mut req: Request<Full<Bytes>> = builder.body(Full::new(body.clone()))?;
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            // Replaces any `Host` the caller put in the header list.
            req.headers_mut()
                .insert(http::header::HOST, http::header::HeaderValue::from_str(host)?);
        }

        Ok(self.inner.request(req).await?)
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

async fn read_response(
    res: hyper::Response<Incoming>,
    redirect_blocked: bool,
    decode_gzip: bool,
) -> Result<HttpResponse> {
    let (mut parts, body) = res.into_parts();
    let status = parts.status.as_u16();

    // Once decoded, the encoding and the compressed length no longer describe the body.
    let gzipped = decode_gzip
        && parts
            .headers
            .get(http::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"));
    if gzipped {
        parts.headers.remove(http::header::CONTENT_ENCODING);
        parts.headers.remove(http::header::CONTENT_LENGTH);
    }

    let content_length = parts
        .headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    // Normalize headers to lowercase keys for scripting ergonomics.
    // If there are multiple values for a header, join them with ", ".
    let mut merged: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in parts.headers.iter() {
        let key = name.as_str().to_ascii_lowercase();
        let v = String::from_utf8_lossy(value.as_bytes()).to_string();
        merged
            .entry(key)
            .and_modify(|cur| {
                if !cur.is_empty() {
                    cur.push_str(", ");
                }
                cur.push_str(&v);
            })
            .or_insert(v);
    }
    let headers: Vec<(String, String)> = merged.into_iter().collect();

    let header_bytes = estimate_header_bytes(&parts.headers);
    let mut body = body.collect().await?.to_bytes();
    if gzipped && !body.is_empty() {
        body = gunzip(&body)?;
    }

    Ok(HttpResponse {
        status,
        body,
        headers,
        content_length,
        header_bytes,
        redirect_blocked,
    })
}

fn gunzip(data: &[u8]) -> Result<Bytes> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(4));
    flate2::read::GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(Error::Decompress)?;
    Ok(Bytes::from(out))
}
