use std::time::Duration;

use mlua::{Function, Lua, Table, Value};
use pummel_core::{HookError, HookResult, RequestConfig, ResponseView, RunConfig, ScriptHooks};

use crate::loader::{chunk_name, configure_module_path};
use crate::{Error, Result, Script, wrk};

/// One Lua state running a script for one worker.
///
/// After loading, the state's `wrk` table is the source of truth for the request: whatever
/// `request()` leaves in it is what gets sent.
pub struct LuaHooks {
    lua: Lua,
    wrk: Table,
    header_meta: Table,
    request: Option<Function>,
    response: Option<Function>,
    stop: Option<Function>,
    delay: Option<Function>,
}

impl std::fmt::Debug for LuaHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaHooks")
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .field("stop", &self.stop.is_some())
            .field("delay", &self.delay.is_some())
            .finish_non_exhaustive()
    }
}

fn optional_function(lua: &Lua, name: &str) -> Result<Option<Function>> {
    Ok(lua.globals().get::<Option<Function>>(name)?)
}

/// Metatable that resolves `headers["X-Token"]` against lowercased keys.
fn case_insensitive_meta(lua: &Lua) -> mlua::Result<Table> {
    let meta = lua.create_table()?;
    let index = lua.create_function(|_, (t, key): (Table, Value)| match key {
        Value::String(s) => t.raw_get::<Value>(s.to_string_lossy().to_ascii_lowercase()),
        _ => Ok(Value::Nil),
    })?;
    meta.set("__index", index)?;
    Ok(meta)
}

impl LuaHooks {
    /// Create a state, expose `config` as `wrk`, run the script's top level and pick up
    /// whichever of `request`, `response`, `stop` and `delay` it defines.
    pub fn load(script: &Script, config: &RunConfig) -> Result<Self> {
        let lua = Lua::new();
        configure_module_path(&lua, &script.path)?;

        let wrk = wrk::create(&lua, config)?;
        lua.globals().set("wrk", wrk.clone())?;

        lua.load(script.text.as_str())
            .set_name(chunk_name(&script.path))
            .exec()?;

        let header_meta = case_insensitive_meta(&lua)?;
        let request = optional_function(&lua, "request")?;
        let response = optional_function(&lua, "response")?;
        let stop = optional_function(&lua, "stop")?;
        let delay = optional_function(&lua, "delay")?;

        tracing::debug!(
            worker = config.id,
            request = request.is_some(),
            response = response.is_some(),
            stop = stop.is_some(),
            delay = delay.is_some(),
            "script loaded"
        );

        Ok(Self {
            lua,
            wrk,
            header_meta,
            request,
            response,
            stop,
            delay,
        })
    }

    /// `base` with every option the script assigned to `wrk` applied.
    pub fn run_config(&self, base: &RunConfig) -> Result<RunConfig> {
        wrk::read_run_config(&self.wrk, base)
    }

    fn headers_table(&self, headers: &[(String, String)]) -> mlua::Result<Table> {
        let t = self.lua.create_table()?;
        for (k, v) in headers {
            t.raw_set(k.to_ascii_lowercase(), v.as_str())?;
        }
        t.set_metatable(Some(self.header_meta.clone()))?;
        Ok(t)
    }

    fn call_request(&self, request: &mut RequestConfig) -> Result<()> {
        let Some(f) = &self.request else {
            return Ok(());
        };
        f.call::<()>(())?;
        wrk::read_request(&self.wrk, request)
    }

    fn call_response(&self, response: &ResponseView<'_>) -> Result<()> {
        let Some(f) = &self.response else {
            return Ok(());
        };
        let headers = self.headers_table(response.headers)?;
        let body = self.lua.create_string(response.body)?;
        f.call::<()>((response.status, headers, body))?;
        Ok(())
    }

    fn call_stop(&self) -> Result<bool> {
        let Some(f) = &self.stop else {
            return Ok(false);
        };
        let v = f.call::<Value>(())?;
        Ok(!matches!(v, Value::Nil | Value::Boolean(false)))
    }

    fn call_delay(&self) -> Result<Option<Duration>> {
        let Some(f) = &self.delay else {
            return Ok(None);
        };
        let ms = match f.call::<Value>(())? {
            Value::Nil => return Ok(None),
            Value::Integer(i) => i as f64,
            Value::Number(n) => n,
            _ => return Err(Error::InvalidDelay),
        };
        if ms.is_nan() {
            return Err(Error::InvalidDelay);
        }
        if ms <= 0.0 {
            return Ok(None);
        }
        Duration::try_from_secs_f64(ms / 1000.0)
            .map(Some)
            .map_err(|_| Error::InvalidDelay)
    }
}

impl ScriptHooks for LuaHooks {
    fn request(&mut self, request: &mut RequestConfig) -> HookResult<()> {
        self.call_request(request).map_err(HookError::from)
    }

    fn response(&mut self, response: &ResponseView<'_>) -> HookResult<()> {
        self.call_response(response).map_err(HookError::from)
    }

    fn stop(&mut self) -> HookResult<bool> {
        self.call_stop().map_err(HookError::from)
    }

    fn delay(&mut self) -> HookResult<Option<Duration>> {
        self.call_delay().map_err(HookError::from)
    }
}
