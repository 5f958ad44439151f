//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits a single bare value.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use powerlink_api::CanonicalStatus;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Status word, colored by how armed the panel is.
pub fn paint_status(status: CanonicalStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        CanonicalStatus::Disarmed => text.green().to_string(),
        CanonicalStatus::ArmedHome | CanonicalStatus::ArmedAway => text.red().bold().to_string(),
        CanonicalStatus::ExitDelay => text.yellow().to_string(),
        CanonicalStatus::Unknown => text.dimmed().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, plain uses `plain_fn`.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => plain_fn(data),
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

// ── Format-specific renderers ────────────────────────────────────────

/// Two-column key/value table.
#[derive(Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub fn render_fields(rows: Vec<FieldRow>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Sample {
        status: CanonicalStatus,
    }

    fn sample() -> Sample {
        Sample {
            status: CanonicalStatus::ExitDelay,
        }
    }

    fn render(format: &OutputFormat) -> String {
        render_single(format, &sample(), |_| "detail".into(), |s| s.status.to_string())
    }

    #[test]
    fn structured_formats_use_snake_case_status() {
        assert_eq!(render(&OutputFormat::JsonCompact), r#"{"status":"exit_delay"}"#);
        assert!(render(&OutputFormat::Json).contains("\"exit_delay\""));
        assert_eq!(render(&OutputFormat::Yaml).trim(), "status: exit_delay");
    }

    #[test]
    fn plain_and_table_use_callbacks() {
        assert_eq!(render(&OutputFormat::Plain), "exit delay");
        assert_eq!(render(&OutputFormat::Table), "detail");
    }

    #[test]
    fn uncolored_status_is_bare_word() {
        assert_eq!(paint_status(CanonicalStatus::ArmedAway, false), "away");
    }

    #[test]
    fn field_table_lists_every_row() {
        let table = render_fields(vec![
            FieldRow {
                field: "Profile",
                value: "home".into(),
            },
            FieldRow {
                field: "Status",
                value: "disarmed".into(),
            },
        ]);
        assert!(table.contains("Profile"));
        assert!(table.contains("disarmed"));
    }
}
