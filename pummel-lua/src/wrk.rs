use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use mlua::{Lua, Table, Value};
use pummel_core::{HttpVersion, RequestConfig, RunConfig};

use crate::{Error, Result};

fn path_str(path: Option<&PathBuf>) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Build the global `wrk` table a script sees at load time.
pub fn create(lua: &Lua, config: &RunConfig) -> mlua::Result<Table> {
    let wrk = lua.create_table()?;
    let req = &config.request;

    wrk.set("method", req.method.as_str())?;
    wrk.set("url", req.url.as_str())?;
    wrk.set("host", req.host.as_deref().unwrap_or_default())?;
    wrk.set("body", lua.create_string(&req.body)?)?;

    let header = lua.create_table()?;
    for (k, v) in &req.headers {
        header.set(k.as_str(), v.as_str())?;
    }
    wrk.set("header", header)?;

    wrk.set("id", config.id)?;
    wrk.set("goroutines", config.concurrency)?;
    if config.duration.subsec_nanos() == 0 {
        wrk.set("duration", config.duration.as_secs())?;
    } else {
        wrk.set("duration", config.duration.as_secs_f64())?;
    }
    wrk.set("timeoutms", u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX))?;

    let t = &config.transport;
    wrk.set("redir", t.allow_redirects)?;
    wrk.set("no_comp", t.disable_compression)?;
    wrk.set("no_keepalive", t.disable_keep_alive)?;
    wrk.set("skip_verify", t.skip_verify)?;
    wrk.set("client_cert", path_str(t.client_cert.as_ref()))?;
    wrk.set("client_key", path_str(t.client_key.as_ref()))?;
    wrk.set("ca_cert", path_str(t.ca_cert.as_ref()))?;
    wrk.set("http2", t.version == HttpVersion::Http2)?;

    Ok(wrk)
}

/// Copy the request fields of `wrk` into `req`. Fields the script cleared keep their
/// previous value.
pub fn read_request(wrk: &Table, req: &mut RequestConfig) -> Result<()> {
    if let Some(method) = get_string(wrk, "method")? {
        req.method = method;
    }
    if let Some(url) = get_string(wrk, "url")? {
        req.url = url;
    }
    if let Some(host) = get_string(wrk, "host")? {
        req.host = (!host.is_empty()).then_some(host);
    }
    if let Some(body) = get_bytes(wrk, "body")? {
        req.body = body;
    }

    match wrk.get::<Value>("header")? {
        Value::Nil => {}
        Value::Table(t) => req.headers = read_headers(&t)?,
        _ => {
            return Err(Error::InvalidOption {
                field: "header",
                expected: "a table of name -> value",
            });
        }
    }

    Ok(())
}

fn read_headers(t: &Table) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for pair in t.pairs::<Value, Value>() {
        let (k, v) = pair?;
        let Value::String(name) = k else {
            continue;
        };
        let Some(value) = scalar_to_string(&v) else {
            return Err(Error::InvalidOption {
                field: "header",
                expected: "a table of name -> string, number or boolean",
            });
        };
        out.insert(name.to_string_lossy().to_string(), value);
    }
    Ok(out)
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.to_string_lossy().to_string()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Number(n) => Some(number_to_string(*n)),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_to_string(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Read the run options a script may have assigned, on top of `base`.
pub fn read_run_config(wrk: &Table, base: &RunConfig) -> Result<RunConfig> {
    let mut out = base.clone();
    read_request(wrk, &mut out.request)?;

    if let Some(n) = get_positive(wrk, "goroutines", "a positive integer")? {
        if n.fract() != 0.0 || n > pummel_core::MAX_CONCURRENCY as f64 {
            return Err(Error::InvalidOption {
                field: "goroutines",
                expected: "a positive integer",
            });
        }
        out.concurrency = n as usize;
    }
    if let Some(d) = get_duration(wrk, "duration", 1.0, "a positive number of seconds")? {
        out.duration = d;
    }
    if let Some(d) = get_duration(wrk, "timeoutms", 1000.0, "a positive number of milliseconds")? {
        out.timeout = d;
    }

    let t = &mut out.transport;
    if let Some(v) = get_bool(wrk, "redir")? {
        t.allow_redirects = v;
    }
    if let Some(v) = get_bool(wrk, "no_comp")? {
        t.disable_compression = v;
    }
    if let Some(v) = get_bool(wrk, "no_keepalive")? {
        t.disable_keep_alive = v;
    }
    if let Some(v) = get_bool(wrk, "skip_verify")? {
        t.skip_verify = v;
    }
    if let Some(v) = get_string(wrk, "client_cert")? {
        t.client_cert = non_empty_path(v);
    }
    if let Some(v) = get_string(wrk, "client_key")? {
        t.client_key = non_empty_path(v);
    }
    if let Some(v) = get_string(wrk, "ca_cert")? {
        t.ca_cert = non_empty_path(v);
    }
    if let Some(v) = get_bool(wrk, "http2")? {
        t.version = if v {
            HttpVersion::Http2
        } else {
            HttpVersion::Http1
        };
    }

    Ok(out)
}

fn non_empty_path(v: String) -> Option<PathBuf> {
    (!v.is_empty()).then(|| PathBuf::from(v))
}

fn get_string(t: &Table, key: &'static str) -> Result<Option<String>> {
    match t.get::<Value>(key)? {
        Value::Nil => Ok(None),
        Value::String(s) => Ok(Some(s.to_string_lossy().to_string())),
        Value::Integer(i) => Ok(Some(i.to_string())),
        Value::Number(n) => Ok(Some(number_to_string(n))),
        _ => Err(Error::InvalidOption {
            field: key,
            expected: "a string",
        }),
    }
}

fn get_bytes(t: &Table, key: &'static str) -> Result<Option<Bytes>> {
    match t.get::<Value>(key)? {
        Value::Nil => Ok(None),
        Value::String(s) => Ok(Some(Bytes::copy_from_slice(&s.as_bytes()))),
        _ => Err(Error::InvalidOption {
            field: key,
            expected: "a string",
        }),
    }
}

fn get_bool(t: &Table, key: &'static str) -> Result<Option<bool>> {
    match t.get::<Value>(key)? {
        Value::Nil => Ok(None),
        Value::Boolean(b) => Ok(Some(b)),
        _ => Err(Error::InvalidOption {
            field: key,
            expected: "a boolean",
        }),
    }
}

fn get_positive(t: &Table, key: &'static str, expected: &'static str) -> Result<Option<f64>> {
    let n = match t.get::<Value>(key)? {
        Value::Nil => return Ok(None),
        Value::Integer(i) => i as f64,
        Value::Number(n) => n,
        _ => return Err(Error::InvalidOption { field: key, expected }),
    };
    if n.is_finite() && n > 0.0 {
        Ok(Some(n))
    } else {
        Err(Error::InvalidOption { field: key, expected })
    }
}

/// A positive number of `1 / per_second` units that fits in a `Duration`.
fn get_duration(
    t: &Table,
    key: &'static str,
    per_second: f64,
    expected: &'static str,
) -> Result<Option<Duration>> {
    let Some(n) = get_positive(t, key, expected)? else {
        return Ok(None);
    };
    Duration::try_from_secs_f64(n / per_second)
        .map(Some)
        .map_err(|_| Error::InvalidOption { field: key, expected })
}
