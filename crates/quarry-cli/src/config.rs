//! Configuration loading for the `quarry` binary.
//!
//! Builds a [`QuarryConfig`] from a TOML file and `QUARRY_*` variables using
//! `confyg`, then overlays the well-known credential variables
//! (`OPENAI_API_KEY`, `QDRANT_URL`, ...) when `using_env_defaults` is on.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `QUARRY_CONFIG` environment variable
//! 3. XDG default: `~/.config/quarry/config.toml`
//! 4. Built-in defaults
//!
//! Nothing here writes the configuration back to disk.

use confyg::{Confygery, env};
use quarry_core::{Error, QuarryConfig, Result};
use std::path::PathBuf;

/// Env var naming the config file.
pub const CONFIG_ENV_VAR: &str = "QUARRY_CONFIG";

/// Prefix of the `confyg` env overlay.
const ENV_PREFIX: &str = "QUARRY";

/// Replacement for secret values in exports.
pub const MASK: &str = "********";

// ============================================================================
// Config loading
// ============================================================================

/// Load configuration from file, `QUARRY_*` variables and defaults, then
/// apply the credential variables of the process environment.
pub fn load(config_path: Option<&str>) -> Result<QuarryConfig> {
    let mut config = load_layers(config_path)?;
    config.apply_process_env();
    Ok(config)
}

/// Load file and `QUARRY_*` layers only.
pub fn load_layers(config_path: Option<&str>) -> Result<QuarryConfig> {
    let mut builder = Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

    if let Some(path) = resolve_config_path(config_path) {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config file");
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }
    }

    let mut env_opts = env::Options::with_top_level(ENV_PREFIX);
    env_opts.add_section("qdrant");
    env_opts.add_section("openai");
    env_opts.add_section("azure");
    env_opts.add_section("fastembed");
    env_opts.add_section("search");
    builder
        .add_env(env_opts)
        .map_err(|e| Error::config(format!("config env: {e}")))?;

    builder
        .build()
        .map_err(|e| Error::config(format!("config build: {e}")))
}

/// Resolve the config file path from explicit flag, env var, or XDG default.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    default_config_path()
}

/// Return the XDG default config path.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("quarry").join("config.toml"))
}

// ============================================================================
// Serialization helpers
// ============================================================================

/// Convert `config` to a TOML value with secrets masked.
pub fn to_masked_value(config: &QuarryConfig) -> Result<toml::Value> {
    let mut value = toml::Value::try_from(config).map_err(|e| Error::config(e.to_string()))?;
    mask_secrets(&mut value);
    Ok(value)
}

/// Serialize `config` to pretty TOML with secrets masked.
pub fn to_toml_string(config: &QuarryConfig) -> Result<String> {
    let value = to_masked_value(config)?;
    toml::to_string_pretty(&value).map_err(|e| Error::config(e.to_string()))
}

/// Flatten `config` into `QUARRY_*` variable pairs with secrets masked.
pub fn to_env_vars(config: &QuarryConfig) -> Result<Vec<(String, String)>> {
    let value = to_masked_value(config)?;
    let mut vars = Vec::new();
    flatten_toml_value(&value, ENV_PREFIX, &mut vars);
    Ok(vars)
}

/// Whether a config key holds a credential.
pub fn is_secret_key(key: &str) -> bool {
    key == "api_key" || key.ends_with(".api_key")
}

fn mask_secrets(value: &mut toml::Value) {
    if let toml::Value::Table(table) = value {
        for (key, val) in table.iter_mut() {
            match val {
                toml::Value::String(s) if is_secret_key(key) && !s.is_empty() => {
                    *s = MASK.to_string();
                }
                toml::Value::Table(_) => mask_secrets(val),
                _ => {}
            }
        }
    }
}

/// Recursively flatten a TOML value into `KEY=value` pairs.
fn flatten_toml_value(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let env_key = format!("{}_{}", prefix, key.to_uppercase());
                flatten_toml_value(val, &env_key, out);
            }
        }
        toml::Value::Array(arr) => {
            if let Ok(json) = serde_json::to_string(arr) {
                out.push((prefix.to_string(), json));
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        toml::Value::Integer(i) => out.push((prefix.to_string(), i.to_string())),
        toml::Value::Float(f) => out.push((prefix.to_string(), f.to_string())),
        toml::Value::Boolean(b) => out.push((prefix.to_string(), b.to_string())),
        toml::Value::Datetime(dt) => out.push((prefix.to_string(), dt.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
