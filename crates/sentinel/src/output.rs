//! Rendering for `--output`.
//!
//! Lists become a `tabled` table, a single record becomes key/value text.
//! `json`, `json-compact` and `yaml` serialize the records themselves, and
//! `plain` prints one id per line for piping into other commands.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use sentinel_core::LinkState;

use crate::cli::{ColorMode, OutputFormat};

// ── Color ───────────────────────────────────────────────────────────

/// Color is on for `always`, off for `never`, and for `auto` only when
/// stderr is a terminal and `NO_COLOR` is unset.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Link state label, colored green / yellow / red when enabled.
pub fn link_state(state: LinkState, color: bool) -> String {
    let label = state.to_string();
    if !color {
        return label;
    }
    match state {
        LinkState::Connected => label.green().to_string(),
        LinkState::Connecting => label.yellow().to_string(),
        LinkState::Disconnected => label.red().to_string(),
    }
}

// ── Rendering ───────────────────────────────────────────────────────

/// Render a collection. `to_row` builds the table row, `id_fn` the plain line.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
        structured => serialize(structured, data),
    }
}

/// Render one record. `detail_fn` produces the human-readable view.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Plain => id_fn(data),
        structured => serialize(structured, data),
    }
}

/// Write `output` to stdout unless it is empty or `--quiet` is set.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    // A closed pipe (`sentinel soldiers list | head`) is not an error.
    let _ = writeln!(io::stdout().lock(), "{output}");
}

/// `None` as an empty cell.
pub fn opt(value: Option<&str>) -> String {
    value.unwrap_or_default().to_owned()
}

fn serialize<T: serde::Serialize + ?Sized>(format: &OutputFormat, data: &T) -> String {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
    };
    rendered.unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}
