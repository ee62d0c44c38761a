//! `pigmea check <kind> <value>`: one-shot uniqueness check.
//!
//! Runs the same guard the editors use, with the delay removed.

use std::time::Duration;

use owo_colors::OwoColorize;
use serde::Serialize;

use pigmea_core::{Entity, Repository, ValidationConfig, ValidationState, Workspace};

use crate::cli::{CheckArgs, GlobalOpts, KindArg, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    kind: &'static str,
    field: &'static str,
    value: &'a str,
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn state_name(state: &ValidationState) -> &'static str {
    match state {
        ValidationState::Idle => "idle",
        ValidationState::Pending => "pending",
        ValidationState::Available => "available",
        ValidationState::Conflict => "conflict",
        ValidationState::Failed(_) => "failed",
    }
}

fn render_line(report: &CheckReport<'_>, color: bool) -> String {
    let verdict = match (report.state, color) {
        ("available", true) => "Available".green().to_string(),
        ("conflict", true) => "Conflict".red().bold().to_string(),
        ("failed", true) => "Failed".yellow().to_string(),
        ("available", false) => "Available".into(),
        ("conflict", false) => "Conflict".into(),
        ("failed", false) => "Failed".into(),
        (other, _) => other.into(),
    };
    match &report.error {
        Some(err) => format!("{verdict}: {} = {:?} ({err})", report.field, report.value),
        None => format!("{verdict}: {} = {:?}", report.field, report.value),
    }
}

pub async fn handle(
    workspace: &Workspace,
    args: CheckArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.kind {
        KindArg::Clients => run(workspace.clients(), workspace, &args.value, global).await,
        KindArg::Reps => run(workspace.sales_reps(), workspace, &args.value, global).await,
        KindArg::Orders => run(workspace.orders(), workspace, &args.value, global).await,
    }
}

async fn run<K: Entity>(
    repo: &Repository<K>,
    workspace: &Workspace,
    value: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let min_length = workspace.config().validation.min_length;
    let guard = repo.uniqueness_guard_with(ValidationConfig {
        delay: Duration::ZERO,
        min_length,
    });

    guard.input(value);
    let state = guard.settled().await;

    if state == ValidationState::Idle {
        return Err(CliError::Validation {
            field: K::unique_field().into(),
            reason: format!("values shorter than {min_length} characters are not checked"),
        });
    }

    let report = CheckReport {
        kind: K::KIND.wire_name(),
        field: K::unique_field(),
        value: value.trim(),
        state: state_name(&state),
        error: match &state {
            ValidationState::Failed(message) => Some(message.clone()),
            _ => None,
        },
    };
    let out = match global.output {
        OutputFormat::Table => render_line(&report, output::should_color(global.color)),
        OutputFormat::Json => output::render_json(&report)?,
    };
    output::print_output(&out, global.quiet);

    match state {
        ValidationState::Failed(message) => Err(CliError::ApiError { message }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line_names_field_and_verdict() {
        let report = CheckReport {
            kind: "cliente",
            field: "nombre",
            value: "Acme",
            state: "conflict",
            error: None,
        };
        assert_eq!(render_line(&report, false), r#"Conflict: nombre = "Acme""#);

        let failed = CheckReport {
            state: "failed",
            error: Some("offline".into()),
            ..report
        };
        assert_eq!(
            render_line(&failed, false),
            r#"Failed: nombre = "Acme" (offline)"#
        );
    }
}
