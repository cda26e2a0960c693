//! GeneFlow CLI and REST API entry point.
//!
//! Binary name: `geneflow`
//!
//! Parses CLI arguments, loads engine settings and the workflow
//! configuration, then dispatches to the command handler or starts the
//! REST API server.

mod cli;
mod http;
mod state;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use geneflow_types::workflow::WorkflowRunStatus;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,geneflow_core=debug,geneflow_infra=debug",
        _ => "trace",
    };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(filter));
    geneflow_observe::init_tracing_with_filter(cli.otel, filter)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let state = AppState::init(cli.config.as_deref()).await?;
    let code = dispatch(cli, state).await;

    geneflow_observe::shutdown_tracing();
    code
}

async fn dispatch(cli: Cli, state: AppState) -> anyhow::Result<ExitCode> {
    let ok = |passed: bool| {
        if passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    };

    match cli.command {
        Commands::Run {
            workflow,
            input,
            input_file,
        } => {
            let status = cli::workflow::handle_run(
                &state,
                &workflow,
                input.as_deref(),
                input_file.as_deref(),
                cli.json,
            )
            .await?;
            Ok(ok(status != WorkflowRunStatus::Failed))
        }

        Commands::Validate => Ok(ok(cli::workflow::handle_validate(&state, cli.json)?)),

        Commands::Request { endpoint, params } => Ok(ok(cli::request::handle_request(
            &state,
            &endpoint,
            params.as_deref(),
            cli.json,
        )?)),

        Commands::Sources { health } => {
            cli::source::handle_sources(&state, health, cli.json).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Workflows => {
            cli::workflow::handle_list(&state, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} GeneFlow API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}/api/v1")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
