//! autodraft CLI entry point.
//!
//! Binary name: `adraft`
//!
//! Parses CLI arguments, loads configuration, opens the configured draft
//! store, then dispatches to the appropriate command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = autodraft_observe::tracing_setup::verbosity_filter(cli.verbose, cli.quiet);
    if let Err(e) = autodraft_observe::tracing_setup::init_tracing(filter, cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let result = run(cli).await;
    autodraft_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "adraft", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.data_dir.clone()).await?;

    match cli.command {
        Commands::Show { key } => cli::draft::show(&state, &key, cli.json).await?,
        Commands::Save { key, value } => cli::draft::save(&state, &key, &value, cli.json).await?,
        Commands::Clear { key } => cli::draft::clear(&state, &key, cli.json).await?,
        Commands::List => cli::draft::list(&state, cli.json).await?,
        Commands::Watch { key, delay_ms } => {
            cli::watch::watch(&state, &key, delay_ms, cli.json).await?
        }
        Commands::Check { key, server } => {
            cli::draft::check(&state, &key, server.as_deref(), cli.json).await?
        }
        Commands::Resolve { key, server, keep } => {
            cli::draft::resolve(&state, &key, &server, keep, cli.json).await?
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
