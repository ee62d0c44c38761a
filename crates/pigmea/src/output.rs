//! Output formatting: table or JSON.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! JSON serializes the original records via serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use pigmea_core::{Priority, Stage, StagePhase};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Stage title, tinted by how far along production it is.
pub fn paint_stage(stage: &Stage, color: bool) -> String {
    let title = stage.title();
    if !color {
        return title.into_owned();
    }
    match stage.phase() {
        StagePhase::Preparation => title.dimmed().to_string(),
        StagePhase::Printing => title.cyan().to_string(),
        StagePhase::PostPress => title.magenta().to_string(),
        StagePhase::Delivery => title.yellow().to_string(),
        StagePhase::Done => title.green().to_string(),
        StagePhase::Archived => title.bright_black().to_string(),
        StagePhase::Unknown => title.into_owned(),
    }
}

pub fn paint_priority(priority: Priority, color: bool) -> String {
    let label = priority.to_string();
    if !color {
        return label;
    }
    match priority {
        Priority::Urgente => label.red().bold().to_string(),
        Priority::Alta => label.yellow().to_string(),
        Priority::Normal | Priority::Baja => label,
    }
}

pub fn paint_flag(active: bool, color: bool) -> String {
    match (active, color) {
        (true, true) => "yes".green().to_string(),
        (false, true) => "no".red().to_string(),
        (true, false) => "yes".into(),
        (false, false) => "no".into(),
    }
}

/// `-` for absent optional cells.
pub fn cell(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_owned()
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data),
    }
}

/// Render a single item; table mode uses `detail_fn`'s pre-formatted text.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data),
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

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub(crate) fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Single-line JSON, for streaming output.
pub(crate) fn render_json_line<T: serde::Serialize + ?Sized>(
    data: &T,
) -> Result<String, CliError> {
    Ok(serde_json::to_string(data)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Item {
        id: u32,
        name: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Name")]
        name: String,
    }

    #[test]
    fn table_and_json_render_the_same_items() {
        let items = [Item { id: 1, name: "Acme" }, Item { id: 2, name: "Beta" }];
        let to_row = |i: &Item| Row {
            name: i.name.to_owned(),
        };

        let table = render_list(OutputFormat::Table, &items, to_row).unwrap();
        assert!(table.contains("Name"));
        assert!(table.contains("Beta"));

        let json = render_list(OutputFormat::Json, &items, to_row).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[1]["id"], 2);
    }

    #[test]
    fn uncolored_helpers_are_plain_text() {
        assert_eq!(paint_stage(&Stage::Impresion, false), "Impresión");
        assert_eq!(paint_stage(&Stage::ImpresionWm3, false), "Impresión WM3");
        assert_eq!(
            paint_stage(&Stage::Other("POST_SELLADO_K2".into()), true),
            "POST SELLADO K2"
        );
        assert_eq!(paint_priority(Priority::Urgente, false), "Urgente");
        assert_eq!(paint_flag(false, false), "no");
        assert_eq!(cell(Some("")), "-");
        assert_eq!(cell(None), "-");
    }
}
