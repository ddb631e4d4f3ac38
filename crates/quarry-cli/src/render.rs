//! Result rendering.
//!
//! Hits are printed in the order the executor returned them: one labelled
//! record per hit, then a summary table with one column per payload field.
//! A failed search prints exactly one error line and no hits.

use std::io::{self, Write};

use quarry_core::{EmbedMode, Error, Result};
use quarry_qdrant::Hit;
use serde_json::Value;

/// Placeholder for a payload field a hit does not have.
const MISSING: &str = "N/A";

/// Note appended to errors when the server embeds the query.
pub const SERVER_SIDE_NOTE: &str =
    "Note: Make sure server-side embedding (FastEmbed) is configured on your Qdrant server";

/// Render the outcome of one search.
pub fn render_outcome<W: Write>(out: &mut W, outcome: &Result<Vec<Hit>>, mode: EmbedMode) -> io::Result<()> {
    match outcome {
        Ok(hits) => render_hits(out, hits),
        Err(err) => render_error(out, err, mode),
    }
}

/// Render hits as labelled records followed by a summary table.
pub fn render_hits<W: Write>(out: &mut W, hits: &[Hit]) -> io::Result<()> {
    if hits.is_empty() {
        return writeln!(out, "No results found");
    }

    for (i, hit) in hits.iter().enumerate() {
        writeln!(out, "Result {} (score: {:.4})", i + 1, hit.score)?;
        let payload = serde_json::to_string_pretty(&hit.payload).map_err(io::Error::other)?;
        writeln!(out, "{payload}")?;
        writeln!(out)?;
    }

    write_table(out, &SummaryTable::from_hits(hits))
}

/// Render hits as a JSON array.
pub fn render_json<W: Write>(out: &mut W, hits: &[Hit]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(hits).map_err(io::Error::other)?;
    writeln!(out, "{json}")
}

/// Render a search failure as a JSON object with an `error` field, plus
/// a `note` in server-side mode.
pub fn render_json_error<W: Write>(out: &mut W, err: &Error, mode: EmbedMode) -> io::Result<()> {
    let mut body = serde_json::Map::new();
    body.insert("error".to_string(), Value::String(err.to_string()));
    if mode == EmbedMode::ServerSide {
        body.insert("note".to_string(), Value::String(SERVER_SIDE_NOTE.to_string()));
    }
    let json = serde_json::to_string_pretty(&body).map_err(io::Error::other)?;
    writeln!(out, "{json}")
}

/// Render a search failure as a single line, plus the server-side note.
pub fn render_error<W: Write>(out: &mut W, err: &Error, mode: EmbedMode) -> io::Result<()> {
    writeln!(out, "Error during search: {err}")?;
    if mode == EmbedMode::ServerSide {
        writeln!(out, "{SERVER_SIDE_NOTE}")?;
    }
    Ok(())
}

// ============================================================================
// Summary table
// ============================================================================

/// Tabular view of hits: payload fields in first-seen order, then score.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    /// Column headers.
    pub columns: Vec<String>,
    /// One row of cells per hit.
    pub rows: Vec<Vec<String>>,
}

impl SummaryTable {
    /// Build the table for `hits`.
    pub fn from_hits(hits: &[Hit]) -> Self {
        let mut fields: Vec<&str> = Vec::new();
        for hit in hits {
            for key in hit.payload.keys() {
                if !fields.contains(&key.as_str()) {
                    fields.push(key);
                }
            }
        }

        let rows = hits
            .iter()
            .map(|hit| {
                let mut row: Vec<String> = fields
                    .iter()
                    .map(|f| hit.payload.get(*f).map_or_else(|| MISSING.to_string(), cell))
                    .collect();
                row.push(format!("{:.4}", hit.score));
                row
            })
            .collect();

        let mut columns: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        columns.push("score".to_string());

        Self { columns, rows }
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_table<W: Write>(out: &mut W, table: &SummaryTable) -> io::Result<()> {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, header)| {
            table
                .rows
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(&table.columns))?;
    writeln!(
        out,
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    )?;
    for row in &table.rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
