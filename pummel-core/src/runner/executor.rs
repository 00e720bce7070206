use std::time::{Duration, Instant};

use pummel_http::{HttpClient, HttpRequest, HttpTransportErrorKind, escape_query};

use super::config::RequestConfig;
use super::hooks::{HookResult, ResponseView, ScriptHooks};
use super::stats::RequesterStats;

/// Value of the `User-Agent` header added to every request.
pub const USER_AGENT: &str = "pummel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success { size: u64, duration: Duration },
    Failure(FailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// A response arrived with a status that does not count as success.
    Status(u16),
    /// No usable response.
    Transport(HttpTransportErrorKind),
}

/// Size of a response that counts as a success, `None` for anything else.
///
/// 200 and 201 count the body that was read. 301 and 307 only count as successes when
/// redirects are not followed; they use the declared `content-length` (0 when absent).
/// The header estimate is added in both cases.
pub fn classify_status(
    status: u16,
    body_len: u64,
    content_length: Option<u64>,
    header_bytes: u64,
) -> Option<u64> {
    match status {
        200 | 201 => Some(body_len.saturating_add(header_bytes)),
        301 | 307 => Some(content_length.unwrap_or(0).saturating_add(header_bytes)),
        _ => None,
    }
}

pub fn build_request(request: &RequestConfig) -> pummel_http::Result<HttpRequest> {
    let method = if request.method.is_empty() {
        http::Method::GET
    } else {
        http::Method::from_bytes(request.method.as_bytes())?
    };

    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    headers.push((http::header::USER_AGENT.to_string(), USER_AGENT.to_string()));

    Ok(HttpRequest {
        method,
        url: escape_query(&request.url).into_owned(),
        headers,
        body: request.body.clone(),
        host: request.host.clone().filter(|h| !h.is_empty()),
    })
}

/// Send one request, record its outcome, then hand the response to the response hook.
///
/// Transport problems are outcomes, not errors; only a failing hook returns `Err`, and by then
/// the outcome is already in `stats`.
pub async fn execute<H>(
    client: &HttpClient,
    request: &RequestConfig,
    hooks: &mut H,
    stats: &mut RequesterStats,
) -> HookResult<Outcome>
where
    H: ScriptHooks + ?Sized,
{
    let req = match build_request(request) {
        Ok(req) => req,
        Err(err) => {
            tracing::debug!(error = %err, url = %request.url, "failed to build request");
            let outcome = Outcome::Failure(FailureReason::Transport(err.transport_error_kind()));
            stats.record(&outcome);
            return Ok(outcome);
        }
    };

    let started = Instant::now();
    let res = match client.request(req).await {
        Ok(res) => res,
        Err(err) => {
            tracing::debug!(error = %err, url = %request.url, "request failed");
            let outcome = Outcome::Failure(FailureReason::Transport(err.transport_error_kind()));
            stats.record(&outcome);
            return Ok(outcome);
        }
    };
    let duration = started.elapsed();

    let outcome = match classify_status(
        res.status,
        res.body.len() as u64,
        res.content_length,
        res.header_bytes,
    ) {
        Some(size) => Outcome::Success { size, duration },
        None => {
            tracing::debug!(
                status = res.status,
                redirect_blocked = res.redirect_blocked,
                url = %request.url,
                "unexpected status"
            );
            Outcome::Failure(FailureReason::Status(res.status))
        }
    };
    stats.record(&outcome);

    hooks.response(&ResponseView {
        status: res.status,
        headers: &res.headers,
        body: &res.body,
    })?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn classify_counts_body_for_ok_and_created() {
        assert_eq!(classify_status(200, 10, Some(10), 30), Some(40));
        assert_eq!(classify_status(201, 0, None, 30), Some(30));
    }

    #[test]
    fn classify_counts_declared_length_for_blocked_redirects() {
        assert_eq!(classify_status(301, 5, Some(5), 40), Some(45));
        assert_eq!(classify_status(307, 5, None, 40), Some(40));
    }

    #[test]
    fn classify_rejects_everything_else() {
        for status in [100, 204, 302, 303, 308, 400, 404, 500, 503] {
            assert_eq!(classify_status(status, 1, Some(1), 1), None, "{status}");
        }
    }

    #[test]
    fn build_request_adds_user_agent_and_escapes_query() {
        let mut cfg = RequestConfig::default();
        cfg.url = "http://localhost/qp?foo=bar baz".to_string();
        cfg.set_header("X-Test", "1");
        cfg.host = Some(String::new());

        let req = build_request(&cfg).unwrap();
        assert_eq!(req.method, http::Method::GET);
        assert_eq!(req.url, "http://localhost/qp?foo=bar+baz");
        assert!(
            req.headers
                .iter()
                .any(|(k, v)| k == "X-Test" && v == "1")
        );
        assert!(
            req.headers
                .iter()
                .any(|(k, v)| k == "user-agent" && v == USER_AGENT)
        );
        assert_eq!(req.host, None);
    }

    #[test]
    fn build_request_rejects_bad_methods() {
        let mut cfg = RequestConfig::default();
        cfg.url = "http://localhost/".to_string();
        cfg.method = "NOT A METHOD".to_string();

        let err = build_request(&cfg).unwrap_err();
        assert_eq!(err.transport_error_kind(), HttpTransportErrorKind::InvalidMethod);
    }

    #[test]
    fn empty_method_means_get() {
        let mut cfg = RequestConfig::default();
        cfg.url = "http://localhost/".to_string();
        cfg.method = String::new();
        assert_eq!(build_request(&cfg).unwrap().method, http::Method::GET);
    }
}
