//! CLI command definitions and dispatch for the `geneflow` binary.
//!
//! Uses clap derive macros for argument parsing. Every command accepts
//! `--json` for machine-readable output.

pub mod request;
pub mod source;
pub mod workflow;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

/// Run declarative data workflows over REST APIs, databases and files.
#[derive(Parser)]
#[command(name = "geneflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workflow configuration file (.json, .yaml or .toml).
    #[arg(long, short, global = true, env = "GENEFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow and print its result.
    Run {
        /// Workflow name.
        workflow: String,

        /// Input as a JSON object.
        #[arg(long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read the input JSON from a file.
        #[arg(long)]
        input_file: Option<PathBuf>,
    },

    /// Validate every loaded workflow.
    Validate,

    /// Validate an API request against an endpoint's rules.
    Request {
        /// Endpoint name, e.g. `getResearchAssociations`.
        endpoint: String,

        /// Parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
    },

    /// List configured data sources.
    Sources {
        /// Probe every source with a health check.
        #[arg(long)]
        health: bool,
    },

    /// List loaded workflows.
    #[command(alias = "ls")]
    Workflows,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8700")]
        port: u16,

        /// Host address to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

/// Parse a JSON argument, defaulting to `{}` when absent.
pub fn parse_json_arg(raw: Option<&str>, what: &str) -> anyhow::Result<serde_json::Value> {
    match raw {
        Some(raw) => serde_json::from_str(raw).with_context(|| format!("Invalid JSON for {what}")),
        None => Ok(serde_json::json!({})),
    }
}
