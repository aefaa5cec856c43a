//! `wt` — fleet controller for behavioral twins.

use clap::Parser;

use wondertwin::cli::args::{Cli, Commands};
use wondertwin::cli::commands;
use wondertwin::error::ExitCode;
use wondertwin::observability::{init_logging, LogFormat};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        // The bridge owns stdout for JSON-RPC; its logs go to stderr
        // as JSON so an agent harness can collect them.
        let format = if matches!(cli.command, Commands::Mcp) {
            LogFormat::Json
        } else {
            LogFormat::Human
        };
        init_logging(format, cli.verbose);
    }

    // Spawn signal handler for graceful shutdown. `logs` handles
    // Ctrl-C itself so it can forward the signal to its tail child.
    if !matches!(cli.command, Commands::Logs(_)) {
        tokio::spawn(async {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");

            tokio::select! {
                _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
                _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
            }
        });
    }

    let result = commands::dispatch(cli).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
