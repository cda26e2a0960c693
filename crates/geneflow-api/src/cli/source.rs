//! `geneflow sources` -- list configured data sources, optionally probing
//! their health.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use futures_util::future::join_all;
use serde_json::{Value, json};

use geneflow_core::config::ConfigurationManager;

use crate::state::AppState;

/// One row of the source listing.
pub struct SourceSummary {
    pub name: String,
    pub source_type: String,
    pub healthy: Option<bool>,
    pub connection_info: Value,
}

/// Describe every source; health checks run concurrently when requested.
pub async fn collect_sources(manager: &ConfigurationManager, health: bool) -> Vec<SourceSummary> {
    let probes = manager.data_sources().iter().map(|(name, source)| async move {
        let healthy = if health {
            Some(source.health_check().await)
        } else {
            None
        };
        SourceSummary {
            name: name.to_string(),
            source_type: source.source_type().to_string(),
            healthy,
            connection_info: source.connection_info(),
        }
    });
    let mut summaries = join_all(probes).await;
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    summaries
}

pub fn summary_json(summary: &SourceSummary) -> Value {
    let mut out = json!({
        "name": summary.name,
        "type": summary.source_type,
        "connection": summary.connection_info,
    });
    if let Some(healthy) = summary.healthy {
        out["healthy"] = json!(healthy);
    }
    out
}

pub async fn handle_sources(state: &AppState, health: bool, json: bool) -> Result<()> {
    let summaries = collect_sources(state.manager(), health).await;

    if json {
        let out: Vec<_> = summaries.iter().map(summary_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!();
        println!("  No data sources configured.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![Cell::new("Name").fg(Color::Cyan), Cell::new("Type")];
    if health {
        header.push(Cell::new("Health"));
    }
    table.set_header(header);

    for summary in &summaries {
        let mut row = vec![
            Cell::new(&summary.name).fg(Color::Cyan),
            Cell::new(&summary.source_type),
        ];
        match summary.healthy {
            Some(true) => row.push(Cell::new("● healthy").fg(Color::Green)),
            Some(false) => row.push(Cell::new("○ unreachable").fg(Color::Red)),
            None => {}
        }
        table.add_row(row);
    }

    println!();
    println!("{table}");
    if !health {
        println!(
            "  Probe connectivity with: {}",
            style("geneflow sources --health").dim()
        );
    }
    println!();
    Ok(())
}
