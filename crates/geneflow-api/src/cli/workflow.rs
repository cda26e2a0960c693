//! CLI workflow subcommands: run, validate and list.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use geneflow_types::workflow::{WorkflowRunResult, WorkflowRunStatus};

use crate::cli::parse_json_arg;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Execute `name` and print the result. Returns the run status so the
/// caller can pick the exit code.
pub async fn handle_run(
    state: &AppState,
    name: &str,
    input: Option<&str>,
    input_file: Option<&Path>,
    json: bool,
) -> Result<WorkflowRunStatus> {
    let input = match input_file {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read input file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?
        }
        None => parse_json_arg(input, "--input")?,
    };

    let result = state
        .engine
        .execute_workflow(name, input)
        .await
        .with_context(|| format!("Failed to run workflow '{name}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_run_result(&result)?;
    }
    Ok(result.status)
}

fn status_style(status: WorkflowRunStatus) -> console::StyledObject<String> {
    let text = status.to_string();
    match status {
        WorkflowRunStatus::Succeeded => style(text).green(),
        WorkflowRunStatus::PartiallyFailed => style(text).yellow(),
        WorkflowRunStatus::Failed => style(text).red(),
        WorkflowRunStatus::Pending | WorkflowRunStatus::Running => style(text).dim(),
    }
}

fn print_run_result(result: &WorkflowRunResult) -> Result<()> {
    println!();
    println!(
        "  {} Workflow '{}' {}",
        style("*").bold(),
        style(&result.workflow).cyan(),
        status_style(result.status).bold()
    );
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {}ms", result.duration_ms);

    if !result.outputs.is_empty() {
        println!();
        println!("  {}", style("Outputs").bold());
        for (key, value) in &result.outputs {
            let rendered = serde_json::to_string_pretty(value)?;
            println!("  {} = {}", style(key).cyan(), rendered.replace('\n', "\n    "));
        }
    }
    for warning in &result.warnings {
        println!("  {} {warning}", style("!").yellow());
    }
    for error in &result.errors {
        println!("  {} {error}", style("x").red());
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

/// Re-validate every loaded workflow. Returns whether all of them passed.
pub fn handle_validate(state: &AppState, json: bool) -> Result<bool> {
    let manager = state.manager();
    let mut report = Vec::new();
    for name in manager.available_workflows() {
        let Some(workflow) = manager.get_workflow(&name) else {
            continue;
        };
        let errors = manager.workflow_errors(&workflow);
        report.push((name, errors));
    }
    let valid = report.iter().all(|(_, errors)| errors.is_empty());

    if json {
        let out: Vec<_> = report
            .iter()
            .map(|(name, errors)| {
                serde_json::json!({"workflow": name, "valid": errors.is_empty(), "errors": errors})
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({"valid": valid, "workflows": out}))?
        );
        return Ok(valid);
    }

    println!();
    if let Some(path) = &state.config_path {
        println!("  Configuration: {}", style(path.display()).dim());
    }
    if report.is_empty() {
        println!("  No workflows loaded.");
    }
    for (name, errors) in &report {
        if errors.is_empty() {
            println!("  {} {}", style("✓").green(), style(name).cyan());
        } else {
            println!("  {} {}", style("✗").red(), style(name).cyan());
            for error in errors {
                println!("      {error}");
            }
        }
    }
    println!();
    Ok(valid)
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

pub fn handle_list(state: &AppState, json: bool) -> Result<()> {
    let manager = state.manager();
    let workflows: Vec<_> = manager
        .available_workflows()
        .into_iter()
        .filter_map(|name| manager.get_workflow(&name))
        .collect();

    if json {
        let out: Vec<_> = workflows
            .iter()
            .map(|wf| {
                serde_json::json!({
                    "name": wf.name,
                    "description": wf.description,
                    "steps": wf.steps.len(),
                    "global_timeout": wf.global_timeout,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!();
        println!("  No workflows loaded.");
        println!(
            "  Point at a configuration with: {}",
            style("geneflow --config <file.yaml> workflows").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Steps"),
            Cell::new("Operations"),
            Cell::new("Timeout"),
            Cell::new("Description"),
        ]);
    for wf in &workflows {
        let operations: usize = wf.steps.iter().map(|s| s.operations.len()).sum();
        table.add_row(vec![
            Cell::new(&wf.name).fg(Color::Cyan),
            Cell::new(wf.steps.len()),
            Cell::new(operations),
            Cell::new(format!("{}s", wf.global_timeout)),
            Cell::new(wf.description.as_deref().unwrap_or("-")).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
