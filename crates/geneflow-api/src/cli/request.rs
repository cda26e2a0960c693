//! `geneflow request` -- run the API request handler from the command line.

use anyhow::Result;
use console::style;
use serde_json::json;

use geneflow_core::request::process_api_request;

use crate::cli::parse_json_arg;
use crate::state::AppState;

/// Validate `{name: endpoint, parameters}` and print the response.
/// Returns whether the request was accepted.
pub fn handle_request(
    state: &AppState,
    endpoint: &str,
    params: Option<&str>,
    json: bool,
) -> Result<bool> {
    let parameters = parse_json_arg(params, "--params")?;
    let response = process_api_request(
        state.manager(),
        &json!({"name": endpoint, "parameters": parameters}),
    );
    let success = response["success"].as_bool().unwrap_or(false);

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(success);
    }

    println!();
    if success {
        println!(
            "  {} Request accepted for '{}'",
            style("✓").green(),
            style(endpoint).cyan()
        );
        println!(
            "  Resolved parameters: {}",
            serde_json::to_string(&response["resolved_parameters"])?
        );
    } else {
        println!(
            "  {} {}",
            style("✗").red(),
            response["error"]["message"].as_str().unwrap_or("request rejected")
        );
        if let Some(details) = response["error"]["details"].as_array() {
            for detail in details.iter().skip(1).filter_map(|d| d.as_str()) {
                println!("      {detail}");
            }
        }
    }
    println!();
    Ok(success)
}
