//! Interactive search shell.
//!
//! Each input line is one command. Commands edit the [`Session`] form or
//! trigger remote calls; processing is strictly sequential and a search
//! blocks the prompt until the server answers.

use std::io::Write;

use quarry_core::{Error, ProviderKind, Result};
use quarry_filter::{Category, Operator, RowId};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config_handlers::cmd_config_show;
use crate::render;
use crate::session::{SETTABLE_FIELDS, Session};

const HELP: &str = "\
Commands:
  collections                      list collections
  use <collection>                 select a collection and load its keys
  keys                             show filterable keys
  query <text>                     set the query text
  limit <n>                        set the result limit
  threshold <x>|off                set or clear the score threshold
  add <category>                   add a filter row (must, must_not, should)
  remove <category> <i> [<j> ...]  remove filter rows by index
  key <category> <i> <key>         set a row's key
  op <category> <i> <operator>     set a row's operator (match, range, values_count, geo_radius)
  value <category> <i> <text>      set a row's value (range: lo..hi, geo_radius: JSON)
  filters                          show filter rows and the compiled filter
  clear                            remove all filter rows
  provider <openai|azure|fastembed>
  env on|off                       use environment variables for credentials
  set <field> <value>              set a credential or endpoint
  status                           show session status
  search                           run the search
  help                             show this help
  quit                             leave the shell";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Blank line.
    Empty,
    /// List collections.
    Collections,
    /// Select a collection.
    Use(String),
    /// Show filterable keys.
    Keys,
    /// Set the query text.
    Query(String),
    /// Set the result limit.
    Limit(u64),
    /// Set or clear the score threshold.
    Threshold(Option<f32>),
    /// Add a filter row.
    Add(Category),
    /// Remove filter rows by index.
    Remove(Category, Vec<usize>),
    /// Set a row's key.
    Key(Category, usize, String),
    /// Set a row's operator.
    Op(Category, usize, Operator),
    /// Set a row's value from text.
    Value(Category, usize, String),
    /// Show the filters.
    Filters,
    /// Remove all filter rows.
    Clear,
    /// Select the embedding provider.
    Provider(ProviderKind),
    /// Toggle environment defaults.
    Env(bool),
    /// Set a credential or endpoint.
    Set(String, String),
    /// Show session status.
    Status,
    /// Run the search.
    Search,
    /// Show help.
    Help,
    /// Leave the shell.
    Quit,
}

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Stop.
    Quit,
}

// ============================================================================
// Parsing
// ============================================================================

fn usage(text: &str) -> Error {
    Error::validation(format!("usage: {text}"))
}

fn parse_index(s: &str) -> Result<usize> {
    s.parse()
        .map_err(|_| Error::validation(format!("'{s}' is not a row index")))
}

/// Split `s` at the first run of whitespace.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (s, ""),
    }
}

/// Parse `<category> <index> <rest>`.
fn parse_row_target(args: &str, what: &str) -> Result<(Category, usize, String)> {
    let (category, rest) = split_word(args);
    let (index, rest) = split_word(rest);
    if category.is_empty() || index.is_empty() || rest.is_empty() {
        return Err(usage(what));
    }
    Ok((category.parse()?, parse_index(index)?, rest.to_string()))
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<ShellCommand> {
    let (name, args) = split_word(line);

    let cmd = match name.to_ascii_lowercase().as_str() {
        "" => ShellCommand::Empty,
        "collections" => ShellCommand::Collections,
        "use" if !args.is_empty() => ShellCommand::Use(args.to_string()),
        "use" => return Err(usage("use <collection>")),
        "keys" => ShellCommand::Keys,
        "query" => ShellCommand::Query(args.to_string()),
        "limit" => ShellCommand::Limit(
            args.parse()
                .map_err(|_| Error::validation(format!("'{args}' is not a positive number")))?,
        ),
        "threshold" => match args {
            "off" | "none" => ShellCommand::Threshold(None),
            _ => ShellCommand::Threshold(Some(args.parse().map_err(|_| {
                Error::validation(format!("'{args}' is not a score threshold"))
            })?)),
        },
        "add" => ShellCommand::Add(args.parse()?),
        "remove" | "rm" => {
            let (category, rest) = split_word(args);
            if category.is_empty() || rest.is_empty() {
                return Err(usage("remove <category> <index> [<index> ...]"));
            }
            let indices = rest
                .split_whitespace()
                .map(parse_index)
                .collect::<Result<Vec<_>>>()?;
            ShellCommand::Remove(category.parse()?, indices)
        }
        "key" => {
            let (c, i, key) = parse_row_target(args, "key <category> <index> <key>")?;
            ShellCommand::Key(c, i, key)
        }
        "op" => {
            let (c, i, op) = parse_row_target(args, "op <category> <index> <operator>")?;
            ShellCommand::Op(c, i, op.parse()?)
        }
        "value" => {
            let (c, i, value) = parse_row_target(args, "value <category> <index> <text>")?;
            ShellCommand::Value(c, i, value)
        }
        "filters" => ShellCommand::Filters,
        "clear" => ShellCommand::Clear,
        "provider" => ShellCommand::Provider(args.parse()?),
        "env" => match args {
            "on" => ShellCommand::Env(true),
            "off" => ShellCommand::Env(false),
            _ => return Err(usage("env on|off")),
        },
        "set" => {
            let (field, value) = split_word(args);
            if field.is_empty() {
                return Err(usage("set <field> <value>"));
            }
            ShellCommand::Set(field.to_string(), value.to_string())
        }
        "status" => ShellCommand::Status,
        "search" | "go" => ShellCommand::Search,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => {
            return Err(Error::validation(format!(
                "Unknown command '{other}' (type `help`)"
            )));
        }
    };

    Ok(cmd)
}

// ============================================================================
// Execution
// ============================================================================

/// Execute one command against `session`, writing its output to `out`.
///
/// Search failures are rendered, not returned; other failures are returned
/// for the caller to report.
pub async fn execute<W: Write>(
    session: &mut Session,
    command: ShellCommand,
    out: &mut W,
) -> Result<Flow> {
    match command {
        ShellCommand::Empty => {}
        ShellCommand::Collections => {
            let names = session.list_collections().await?;
            if names.is_empty() {
                writeln!(out, "No collections")?;
            }
            for name in names {
                writeln!(out, "{name}")?;
            }
        }
        ShellCommand::Use(collection) => {
            let keys = session.use_collection(&collection).await?;
            writeln!(out, "Using collection '{collection}'")?;
            write_keys(out, keys)?;
        }
        ShellCommand::Keys => write_keys(out, session.filters().metadata_keys())?,
        ShellCommand::Query(text) => session.set_query(text),
        ShellCommand::Limit(n) => {
            let limit = session.set_limit(n);
            writeln!(out, "Limit: {limit}")?;
        }
        ShellCommand::Threshold(t) => session.set_score_threshold(t)?,
        ShellCommand::Add(category) => {
            let id = session.filters_mut().add_row(category)?;
            let index = session.filters().len(category) - 1;
            writeln!(out, "Added {} row {index} ({id})", category.as_str())?;
        }
        ShellCommand::Remove(category, indices) => {
            remove_rows(session, category, &indices, out)?;
        }
        ShellCommand::Key(category, index, key) => {
            session.filters_mut().set_key(category, index, &key)?;
        }
        ShellCommand::Op(category, index, operator) => {
            session.filters_mut().set_operator(category, index, operator)?;
        }
        ShellCommand::Value(category, index, text) => {
            session.filters_mut().set_value_text(category, index, &text)?;
        }
        ShellCommand::Filters => write_filters(session, out)?,
        ShellCommand::Clear => session.filters_mut().clear(),
        ShellCommand::Provider(kind) => {
            session.set_provider(kind);
            writeln!(out, "Embedding provider: {kind}")?;
        }
        ShellCommand::Env(enabled) => {
            session.set_env_defaults(enabled, |name| std::env::var(name).ok());
            writeln!(
                out,
                "Environment variables {}",
                if enabled { "on" } else { "off" }
            )?;
        }
        ShellCommand::Set(field, value) => {
            session.set_field(&field, &value)?;
            writeln!(out, "Updated {field}")?;
        }
        ShellCommand::Status => write_status(session, out)?,
        ShellCommand::Search => {
            let mode = session.mode();
            let outcome = session.search().await;
            match &outcome {
                Err(err) if err.is_remote() => tracing::warn!(error = %err, "remote search call failed"),
                Err(err) => tracing::debug!(error = %err, "search rejected before any remote call"),
                Ok(hits) => tracing::debug!(hits = hits.len(), "search finished"),
            }
            render::render_outcome(out, &outcome, mode)?;
        }
        ShellCommand::Help => {
            writeln!(out, "{HELP}")?;
            writeln!(out, "Settable fields: {}", SETTABLE_FIELDS.join(", "))?;
        }
        ShellCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Remove rows by position. Positions are resolved to row ids first so
/// every index refers to the list as displayed.
fn remove_rows<W: Write>(
    session: &mut Session,
    category: Category,
    indices: &[usize],
    out: &mut W,
) -> Result<()> {
    let rows = session.filters().rows(category);
    let ids: Vec<RowId> = indices
        .iter()
        .filter_map(|&i| rows.get(i).map(|row| row.id))
        .collect();

    let mut removed = 0;
    for id in ids {
        if session.filters_mut().remove_row_by_id(id).is_some() {
            removed += 1;
        }
    }
    writeln!(out, "Removed {removed} {} row(s)", category.as_str())?;
    Ok(())
}

fn write_keys<W: Write>(out: &mut W, keys: &[String]) -> Result<()> {
    if keys.is_empty() {
        writeln!(out, "No filterable keys (filters unavailable)")?;
    } else {
        writeln!(out, "Keys: {}", keys.join(", "))?;
    }
    Ok(())
}

fn write_filters<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let filters = session.filters();
    for category in Category::ALL {
        writeln!(out, "{}:", category.title())?;
        let rows = filters.rows(category);
        if rows.is_empty() {
            writeln!(out, "  (none)")?;
        }
        for (i, row) in rows.iter().enumerate() {
            writeln!(out, "  [{i}] {} {} {}", row.key, row.operator(), row.value)?;
        }
    }

    let compiled = filters.compile();
    writeln!(out, "{}", serde_json::to_string_pretty(&compiled)?)?;
    if let Err(err) = filters.validate() {
        writeln!(out, "Warning: {err}")?;
    }
    Ok(())
}

fn write_status<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    cmd_config_show(session.config(), out)?;
    writeln!(out, "Collection: {}", session.collection().unwrap_or("(none)"))?;
    writeln!(out, "Query: {}", session.query())?;
    writeln!(out, "Limit: {}", session.limit())?;
    match session.score_threshold() {
        Some(t) => writeln!(out, "Score threshold: {t}")?,
        None => writeln!(out, "Score threshold: off")?,
    }
    let counts: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("{} {}", c.as_str(), session.filters().len(*c)))
        .collect();
    writeln!(out, "Filters: {}", counts.join(", "))?;
    Ok(())
}

// ============================================================================
// Read loop
// ============================================================================

/// Read commands from `input` until `quit` or end of input.
///
/// Errors from individual commands are printed and the loop continues.
pub async fn run<R, W>(session: &mut Session, input: R, out: &mut W, prompt: bool) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if prompt {
            write!(out, "quarry> ")?;
            out.flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let flow = match parse_command(&line) {
            Ok(command) => execute(session, command, out).await,
            Err(err) => Err(err),
        };

        match flow {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(err) => writeln!(out, "error: {err}")?,
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
