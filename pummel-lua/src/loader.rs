use std::path::{Path, PathBuf};

use mlua::Lua;

use crate::Result;

fn prepend_package_search_path(package: &mlua::Table, key: &str, prefix: &str) -> Result<()> {
    let prefix = prefix.trim().trim_end_matches(';');
    if prefix.is_empty() {
        return Ok(());
    }

    let old: String = package.get(key)?;
    package.set(key, format!("{prefix};{old}"))?;
    Ok(())
}

fn normalize_for_lua_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

pub fn chunk_name(script_path: &Path) -> String {
    let p = script_path
        .canonicalize()
        .unwrap_or_else(|_| script_path.to_path_buf());
    format!("@{}", normalize_for_lua_path(&p))
}

/// Let `require` find modules next to the script, plus anything in `PUMMEL_LUA_PATH`.
pub fn configure_module_path(lua: &Lua, script_path: &Path) -> Result<()> {
    let package: mlua::Table = lua.globals().get("package")?;

    if let Ok(v) = std::env::var("PUMMEL_LUA_PATH").or_else(|_| std::env::var("LUA_PATH")) {
        prepend_package_search_path(&package, "path", &v)?;
    }

    let dir = script_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(PathBuf::new);
    let dir = normalize_for_lua_path(&dir);
    let dir = if dir.is_empty() { ".".to_string() } else { dir };
    prepend_package_search_path(&package, "path", &format!("{dir}/?.lua;{dir}/?/init.lua"))?;

    Ok(())
}
