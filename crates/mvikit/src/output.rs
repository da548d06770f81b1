//! Output formatting: text, JSON, YAML, TOML.
//!
//! Structured formats go through serde; text is produced by the console
//! host as the session runs.

use std::io::{self, IsTerminal, Write};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a document in a structured format. `Text` falls back to TOML,
/// which reads well for configuration-shaped data.
pub fn render_document<T>(format: OutputFormat, data: &T) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Text => render_toml(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
    }
}

/// Print the rendered output to stdout.
pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", output.trim_end());
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render {
        reason: e.to_string(),
    })
}

pub fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render {
        reason: e.to_string(),
    })
}

fn render_toml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    toml::to_string_pretty(data).map_err(|e| CliError::Render {
        reason: e.to_string(),
    })
}
