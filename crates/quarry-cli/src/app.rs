//! The `quarry` application.
//!
//! [`QuarryCli`] owns the loaded configuration and dispatches parsed
//! arguments to the shell, the one-shot search or the config handlers.

use std::io::Write;

use quarry_core::{QuarryConfig, Result};
use quarry_filter::Category;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command, SearchArgs, parse_filter_arg};
use crate::session::Session;
use crate::{config, config_handlers, render, shell};

// ============================================================================
// QuarryCli
// ============================================================================

/// CLI application over one configuration.
pub struct QuarryCli {
    name: String,
    config: QuarryConfig,
    version: String,
}

impl QuarryCli {
    /// Create from CLI args, loading config from file and environment.
    pub fn from_args(name: impl Into<String>, args: &CliArgs) -> Result<Self> {
        let config = config::load(args.config.as_deref())?;
        Ok(Self::new(name, config))
    }

    /// Create a new CLI application.
    pub fn new(name: impl Into<String>, config: QuarryConfig) -> Self {
        Self {
            name: name.into(),
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // Ignore error if a subscriber is already set (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);
        let mut out = std::io::stdout();

        match args.command {
            Some(Command::Version) => {
                writeln!(out, "{} {}", self.name, self.version)?;
                Ok(())
            }
            Some(Command::Config(config_cmd)) => config_handlers::handle_config_command(
                args.config.as_deref(),
                config_cmd.command,
                &mut out,
            ),
            Some(Command::Collections) => {
                let mut session = Session::new(self.config.clone());
                for name in session.list_collections().await? {
                    writeln!(out, "{name}")?;
                }
                Ok(())
            }
            Some(Command::Keys { collection }) => {
                let mut session = Session::new(self.config.clone());
                for key in session.use_collection(&collection).await? {
                    writeln!(out, "{key}")?;
                }
                Ok(())
            }
            Some(Command::Search(search)) => self.search(search, &mut out).await,
            Some(Command::Shell) | None => self.shell(&mut out, args.quiet).await,
        }
    }

    async fn shell<W: Write>(&self, out: &mut W, quiet: bool) -> Result<()> {
        if !quiet {
            writeln!(out, "{} {} (type `help` for commands)", self.name, self.version)?;
        }
        let mut session = Session::new(self.config.clone());
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        shell::run(&mut session, input, out, true).await
    }

    /// One-shot search. Search failures are rendered like in the shell.
    async fn search<W: Write>(&self, args: SearchArgs, out: &mut W) -> Result<()> {
        let mut config = self.config.clone();
        if let Some(provider) = &args.provider {
            config.provider = provider.parse()?;
        }

        let mut session = Session::new(config);
        let outcome = run_search(&mut session, &args).await;

        if args.json {
            match &outcome {
                Ok(hits) => render::render_json(out, hits)?,
                Err(err) => render::render_json_error(out, err, session.mode())?,
            }
        } else {
            render::render_outcome(out, &outcome, session.mode())?;
        }
        Ok(())
    }
}

/// Apply `args` to a fresh session and run the search.
pub async fn run_search(session: &mut Session, args: &SearchArgs) -> Result<Vec<quarry_qdrant::Hit>> {
    session.use_collection(&args.collection).await?;
    session.set_query(args.query.clone());
    session.set_limit(args.limit);
    session.set_score_threshold(args.score_threshold)?;

    for (category, specs) in [
        (Category::Must, &args.must),
        (Category::MustNot, &args.must_not),
        (Category::Should, &args.should),
    ] {
        for spec in specs {
            let filter = parse_filter_arg(spec)?;
            let filters = session.filters_mut();
            filters.add_row(category)?;
            let index = filters.len(category) - 1;
            filters.set_key(category, index, &filter.key)?;
            filters.set_operator(category, index, filter.operator)?;
            filters.set_value_text(category, index, &filter.value)?;
        }
    }

    session.search().await
}

// ============================================================================
// Tests
// ============================================================================
