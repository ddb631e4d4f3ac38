//! Command-line front-end for Quarry.
//!
//! - `cli`: clap argument types
//! - `config`: config file and environment loading
//! - `config_handlers`: read-only `quarry config` subcommands
//! - `session`: the state one search form edits
//! - `shell`: the interactive command loop
//! - `render`: hit and error output
//! - `app`: top-level dispatch

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod render;
pub mod session;
pub mod shell;

pub use app::QuarryCli;
pub use cli::CliArgs;
pub use session::Session;
