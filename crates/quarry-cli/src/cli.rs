//! CLI argument parsing and command definitions.
//!
//! Without a subcommand `quarry` starts the interactive shell.

use clap::{Parser, Subcommand};
use quarry_core::{Error, Result};
use quarry_filter::Operator;

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "quarry", author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "QUARRY_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the interactive search shell (default).
    Shell,

    /// Run a single filtered search and print the hits.
    Search(SearchArgs),

    /// List the collections on the Qdrant server.
    Collections,

    /// Show the filterable payload keys of a collection.
    Keys {
        /// Collection name.
        collection: String,
    },

    /// Configuration operations.
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

/// Arguments of a one-shot search.
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Query text.
    pub query: String,

    /// Collection to search.
    #[arg(short = 'C', long)]
    pub collection: String,

    /// Maximum number of hits.
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=30))]
    pub limit: u64,

    /// Minimum similarity score (ignored with server-side embedding).
    #[arg(short = 't', long)]
    pub score_threshold: Option<f32>,

    /// Condition every hit must satisfy, as `key:operator:value`.
    #[arg(long = "must", value_name = "KEY:OP:VALUE")]
    pub must: Vec<String>,

    /// Condition no hit may satisfy, as `key:operator:value`.
    #[arg(long = "must-not", value_name = "KEY:OP:VALUE")]
    pub must_not: Vec<String>,

    /// Condition of which at least one should hold, as `key:operator:value`.
    #[arg(long = "should", value_name = "KEY:OP:VALUE")]
    pub should: Vec<String>,

    /// Embedding provider: openai, azure or fastembed.
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Print hits as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands. None of them write to disk.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Get a configuration value by dotted key.
    Get {
        /// Dotted key (e.g., "qdrant.url").
        key: String,
    },

    /// Show which credentials are set for the active provider.
    Show,

    /// Export configuration as environment variables (secrets masked).
    Export {
        /// Format as Docker --env flags.
        #[arg(long)]
        docker_env: bool,
    },
}

// ============================================================================
// Filter arguments
// ============================================================================

/// A filter condition given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterArg {
    /// Payload key.
    pub key: String,
    /// Operator; `match` when omitted.
    pub operator: Operator,
    /// Raw value text, parsed for the operator by the builder.
    pub value: String,
}

/// Parse `key:operator:value` or `key:value` (a `match`).
///
/// The value is everything after the operator, so it may contain colons.
pub fn parse_filter_arg(s: &str) -> Result<FilterArg> {
    let mut parts = s.splitn(3, ':');
    let raw_key = parts.next().unwrap_or_default();
    let key = raw_key.trim();
    if key.is_empty() {
        return Err(Error::validation(format!("Filter '{s}' has no key")));
    }

    let (operator, value) = match (parts.next(), parts.next()) {
        (Some(op), Some(value)) => match op.parse::<Operator>() {
            Ok(operator) => (operator, value.to_string()),
            // `key:value:with:colons` where the middle part is not an operator
            Err(_) => (Operator::Match, s[raw_key.len() + 1..].to_string()),
        },
        (Some(value), None) => (Operator::Match, value.to_string()),
        _ => {
            return Err(Error::validation(format!(
                "Filter '{s}' must look like key:operator:value"
            )));
        }
    };

    Ok(FilterArg {
        key: key.to_string(),
        operator,
        value,
    })
}

// ============================================================================
// Tests
// ============================================================================
