//! Output formatting: table, JSON, YAML, plain.
//!
//! Records are untyped JSON objects, so tables are built column by column
//! from the keys the records actually carry.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use sgivu_core::ListPageState;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of records in the chosen format.
///
/// `plain` emits one identifier per line.
pub fn render_list(format: &OutputFormat, data: &[Value]) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(render_table(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(record_id).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single record; tables become a field / value listing.
pub fn render_single(format: &OutputFormat, data: &Value) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(render_detail(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(record_id(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// One-line page summary for stderr.
pub fn page_summary(state: &ListPageState<Value>, color: bool) -> String {
    let pages = state
        .pager
        .as_ref()
        .and_then(|p| p.total_pages)
        .map_or_else(|| "?".into(), |n| n.to_string());
    let page = format!("page {} of {pages}", state.current_page + 1);
    let total = format!("{} total", state.total);
    let active = format!("{} active", state.active);
    let inactive = format!("{} inactive", state.inactive);

    if color {
        format!(
            "{} · {} · {} · {}",
            page.bold(),
            total,
            active.green(),
            inactive.yellow()
        )
    } else {
        format!("{page} · {total} · {active} · {inactive}")
    }
}

// ── Format-specific renderers ────────────────────────────────────────

/// Identifier column used by `plain` output.
pub fn record_id(record: &Value) -> String {
    record.get("id").map(cell).unwrap_or_default()
}

fn render_table(records: &[Value]) -> String {
    let columns = columns(records);
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(String::as_str));
    for record in records {
        builder.push_record(
            columns
                .iter()
                .map(|key| record.get(key).map(cell).unwrap_or_default()),
        );
    }
    builder.build().with(Style::rounded()).to_string()
}

fn render_detail(record: &Value) -> String {
    let Value::Object(fields) = record else {
        return cell(record);
    };
    let width = fields.keys().map(String::len).max().unwrap_or(0);
    fields
        .iter()
        .map(|(key, value)| format!("{key:<width$}  {}", cell(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Column keys in first-seen order, `id` first.
fn columns(records: &[Value]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for record in records {
        if let Value::Object(fields) = record {
            for key in fields.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
    }
    if let Some(pos) = keys.iter().position(|k| k == "id") {
        let id = keys.remove(pos);
        keys.insert(0, id);
    }
    keys
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}
