use clap::Parser;
use pummel_core::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use std::path::PathBuf;
use std::time::Duration;

const DURATION_HINT: &str = "expected e.g. 10s, 250ms, 1m";

/// Number followed by an optional unit. A bare number means `bare_unit`.
fn parse_with_units(input: &str, bare_unit: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err(format!("duration cannot be empty ({DURATION_HINT})"));
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!("invalid duration '{s}' ({DURATION_HINT})"));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' ({DURATION_HINT})"))?;

    let unit = match unit_str.trim() {
        "" => bare_unit,
        unit => unit,
    };
    let too_large = || format!("duration '{s}' is too large");

    let d = match unit {
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Duration::from_millis(value),
        "s" | "sec" | "secs" | "second" | "seconds" => Duration::from_secs(value),
        "m" | "min" | "mins" | "minute" | "minutes" => {
            Duration::from_secs(value.checked_mul(60).ok_or_else(too_large)?)
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            Duration::from_secs(value.checked_mul(60 * 60).ok_or_else(too_large)?)
        }
        _ => return Err(format!("invalid duration '{s}' ({DURATION_HINT})")),
    };

    if d.is_zero() {
        return Err(format!("duration '{s}' must be greater than zero"));
    }
    Ok(d)
}

fn parse_duration(input: &str) -> Result<Duration, String> {
    parse_with_units(input, "s")
}

fn parse_timeout(input: &str) -> Result<Duration, String> {
    parse_with_units(input, "ms")
}

fn parse_concurrency(input: &str) -> Result<usize, String> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=MAX_CONCURRENCY).contains(&n) => Ok(n),
        _ => Err(format!(
            "invalid concurrency '{input}' (expected an integer between 1 and {MAX_CONCURRENCY})"
        )),
    }
}

/// `Name: value`. Both sides are trimmed; the value may be empty.
fn parse_header(input: &str) -> Result<(String, String), String> {
    let Some((name, value)) = input.split_once(':') else {
        return Err(format!("invalid header '{input}' (expected 'Name: value')"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{input}' (empty name)"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    HumanReadable,
    /// Emit a single JSON summary line to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "pummel",
    author,
    version,
    about = "Fixed-duration HTTP load generator",
    long_about = "pummel sends HTTP requests to a single target from a fixed number of concurrent workers for a fixed duration, then prints throughput and latency figures.\n\nAn optional Lua script can rewrite each request, inspect responses, pace workers and stop the run early through the global `wrk` table and the `request`, `response`, `stop` and `delay` functions.",
    after_help = "Examples:\n  pummel http://localhost:8080/\n  pummel -c 50 -d 30s -H 'Accept: application/json' http://localhost:8080/api\n  pummel -M POST --body @payload.json http://localhost:8080/items\n  pummel -s pipeline.lua http://localhost:8080\n\nSet RUST_LOG=debug to see per-request failures on stderr."
)]
pub struct Cli {
    /// Target URL (ignored when the script sets `wrk.url` or -f is given)
    pub url: Option<String>,

    /// Number of concurrent workers
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Test duration; a bare number means seconds (e.g. 10, 250ms, 1m)
    #[arg(short = 'd', long, default_value = "10s", value_parser = parse_duration)]
    pub duration: Duration,

    /// Per-request timeout; a bare number means milliseconds
    #[arg(short = 'T', long, default_value = "1000", value_parser = parse_timeout)]
    pub timeout: Duration,

    /// HTTP method
    #[arg(short = 'M', long, default_value = "GET")]
    pub method: String,

    /// Host header override
    #[arg(long)]
    pub host: Option<String>,

    /// Header to add to each request (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Read the target URL from a file
    #[arg(short = 'f', long, value_name = "FILE")]
    pub playback: Option<PathBuf>,

    /// Request body, or @FILE to read it from a file
    #[arg(long, value_name = "BODY|@FILE")]
    pub body: Option<String>,

    /// Client certificate (PEM) for mutual TLS
    #[arg(long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Private key (PEM) for the client certificate
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,

    /// CA bundle (PEM) to verify the server against
    #[arg(long, value_name = "FILE")]
    pub ca: Option<PathBuf>,

    /// Follow redirects
    #[arg(long)]
    pub redir: bool,

    /// Do not send `Accept-Encoding: gzip`
    #[arg(long)]
    pub no_compression: bool,

    /// Open a new connection for every request
    #[arg(long)]
    pub no_keepalive: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub no_verify: bool,

    /// Only speak HTTP/1.1 (HTTP/2 is negotiated over TLS by default)
    #[arg(long)]
    pub http1: bool,

    /// Lua script with optional request/response/stop/delay hooks
    #[arg(short = 's', long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
