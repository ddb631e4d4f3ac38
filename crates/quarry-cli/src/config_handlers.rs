//! Handler functions for config CLI commands.
//!
//! Implements `quarry config {path,get,show,export}` and the TOML
//! dotted-key helpers they use.

use std::io::Write;

use quarry_core::{Error, QuarryConfig, Result};

use crate::cli::ConfigAction;
use crate::config;

// ============================================================================
// Command dispatch
// ============================================================================

/// Handle a config subcommand, writing its report to `out`.
///
/// Receives the raw `--config` path because `path` works before a config
/// file exists.
pub fn handle_config_command<W: Write>(
    config_path: Option<&str>,
    action: ConfigAction,
    out: &mut W,
) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path(config_path, out),
        ConfigAction::Get { key } => {
            let config = config::load(config_path)?;
            cmd_config_get(&config, &key, out)
        }
        ConfigAction::Show => {
            let config = config::load(config_path)?;
            cmd_config_show(&config, out)
        }
        ConfigAction::Export { docker_env } => {
            let config = config::load(config_path)?;
            cmd_config_export(&config, docker_env, out)
        }
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn cmd_config_path<W: Write>(config_path: Option<&str>, out: &mut W) -> Result<()> {
    match config::resolve_config_path(config_path) {
        Some(path) => {
            writeln!(out, "{}", path.display())?;
            if !path.exists() {
                writeln!(out, "(file does not exist; built-in defaults apply)")?;
            }
            Ok(())
        }
        None => Err(Error::config(
            "Could not determine config directory for this platform",
        )),
    }
}

fn cmd_config_get<W: Write>(config: &QuarryConfig, key: &str, out: &mut W) -> Result<()> {
    let value = config::to_masked_value(config)?;
    match get_nested_value(&value, key) {
        Some(val) => {
            writeln!(out, "{}", format_toml_value(val))?;
            Ok(())
        }
        None => Err(Error::config(format!(
            "Key '{key}' not found in configuration"
        ))),
    }
}

/// Print the active configuration status report.
pub fn cmd_config_show<W: Write>(config: &QuarryConfig, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "Using: {}",
        if config.using_env_defaults {
            "Environment Variables"
        } else {
            "Custom Settings"
        }
    )?;
    writeln!(out, "Embedding Provider: {}", config.provider.as_str().to_uppercase())?;
    for entry in config.status() {
        writeln!(
            out,
            "- {}: {}",
            entry.label,
            if entry.set { "Set" } else { "Not Set" }
        )?;
    }
    Ok(())
}

fn cmd_config_export<W: Write>(config: &QuarryConfig, docker_env: bool, out: &mut W) -> Result<()> {
    for (key, value) in config::to_env_vars(config)? {
        if docker_env {
            writeln!(out, "--env {key}={value}")?;
        } else {
            writeln!(out, "{key}={value}")?;
        }
    }
    Ok(())
}

// ============================================================================
// TOML dotted-key helpers
// ============================================================================

/// Navigate a dotted key path in a TOML value tree.
fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    let mut current = value;
    for part in key.split('.') {
        current = current.as_table()?.get(part)?;
    }
    Some(current)
}

/// Format a TOML value for display on stdout.
fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
