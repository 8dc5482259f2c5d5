//! libris CLI and HTTP query API entry point.
//!
//! Parses CLI arguments, initializes tracing, the database and services, then
//! dispatches to the command handler or starts the HTTP server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,libris=debug",
        _ => "trace",
    };
    if let Err(e) = libris_observe::tracing_setup::init_tracing(filter, cli.otel) {
        eprintln!("Warning: failed to initialise tracing: {e}");
    }

    let result = run(cli).await;
    libris_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "libris", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.data_dir.clone()).await?;

    match cli.command {
        Commands::Sync => {
            cli::sync::sync(&state, cli.json, cli.quiet).await?;
        }

        Commands::Embed {
            mode,
            concurrency,
            purge,
        } => {
            cli::embed::embed(&state, mode.into(), concurrency, purge, cli.json, cli.quiet)
                .await?;
        }

        Commands::Purge { force } => {
            cli::embed::purge(&state, force, cli.json).await?;
        }

        Commands::Search { text, k } => {
            cli::search::search(&state, &text, k, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::record::show(&state, id, cli.json).await?;
        }

        Commands::List { limit } => {
            cli::record::list(&state, limit, cli.json).await?;
        }

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} libris API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}/api/v1")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let db_pool = state.db_pool.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            db_pool.close().await;
            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
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
