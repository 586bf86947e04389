//! Output renderers and formatting helpers for CLI commands.

use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::Serialize;
use serde_json::Value;
use sluice_options::OptionValue;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

/// Options of one torrent as reported after any edits were applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TorrentOptionsReport {
    pub(crate) id: String,
    pub(crate) options: BTreeMap<String, OptionValue>,
    pub(crate) changed: Vec<String>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_methods(names: &[String], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(names)?,
        OutputFormat::Table => {
            for name in names {
                println!("{name}");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_value(value: &Value, format: OutputFormat) -> CliResult<()> {
    match (format, value) {
        (OutputFormat::Table, Value::String(text)) => println!("{text}"),
        (OutputFormat::Table, Value::Null) => {}
        (OutputFormat::Table, Value::Bool(_) | Value::Number(_)) => println!("{value}"),
        _ => print_json(value)?,
    }
    Ok(())
}

pub(crate) fn render_settings(settings: &BTreeMap<String, Value>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(settings)?,
        OutputFormat::Table => {
            let width = key_width(settings.keys());
            println!("{:<width$} VALUE", "KEY");
            for (key, value) in settings {
                println!("{key:<width$} {}", format_json_cell(value));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_changes(changes: &BTreeMap<String, OptionValue>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(changes)?,
        OutputFormat::Table => {
            if changes.is_empty() {
                println!("no changes");
                return Ok(());
            }
            let width = key_width(changes.keys());
            for (key, value) in changes {
                println!("{key:<width$} {}", format_option(value));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_torrent_options(reports: &[TorrentOptionsReport], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(reports)?,
        OutputFormat::Table => {
            for (index, report) in reports.iter().enumerate() {
                if index > 0 {
                    println!();
                }
                println!("torrent: {}", report.id);
                let width = key_width(report.options.keys());
                for (key, value) in &report.options {
                    let marker = if report.changed.contains(key) { "*" } else { " " };
                    println!("{marker} {key:<width$} {}", format_option(value));
                }
            }
        }
    }
    Ok(())
}

fn key_width<'a>(keys: impl Iterator<Item = &'a String>) -> usize {
    keys.map(String::len).max().unwrap_or(0).max(3)
}

/// Render an option value for a table cell; empty text is shown as `""`.
pub(crate) fn format_option(value: &OptionValue) -> String {
    match value {
        OptionValue::Text(text) if text.is_empty() => "\"\"".to_string(),
        other => other.to_string(),
    }
}

fn format_json_cell(value: &Value) -> String {
    match value {
        Value::String(text) if text.is_empty() => "\"\"".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn option_cells_make_empty_text_visible() {
        assert_eq!(format_option(&OptionValue::from("")), "\"\"");
        assert_eq!(format_option(&OptionValue::Number(-1.0)), "-1");
        assert_eq!(format_option(&OptionValue::Number(2.5)), "2.5");
        assert_eq!(format_option(&OptionValue::Bool(true)), "true");
    }

    #[test]
    fn json_cells_render_composites_inline() {
        assert_eq!(format_json_cell(&json!([6881, 6891])), "[6881,6891]");
        assert_eq!(format_json_cell(&json!("/downloads")), "/downloads");
        assert_eq!(format_json_cell(&json!("")), "\"\"");
    }

    #[test]
    fn renderers_accept_both_formats() -> anyhow::Result<()> {
        let report = TorrentOptionsReport {
            id: "abc".into(),
            options: BTreeMap::from([("stop_ratio".to_string(), OptionValue::Number(2.0))]),
            changed: vec!["stop_ratio".into()],
        };
        for format in [OutputFormat::Table, OutputFormat::Json] {
            render_torrent_options(std::slice::from_ref(&report), format)?;
            render_value(&json!({"a": 1}), format)?;
            render_methods(&["core.get_config".to_string()], format)?;
        }
        Ok(())
    }
}
