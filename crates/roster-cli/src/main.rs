//! roster: list, add, edit and remove users kept in a REST store

use std::sync::Arc;

use clap::Parser;
use roster_client::{Experience, HttpStore, User};
use roster_cli::{execute_command, CliConfig, Overrides, RosterCommands, TerminalPrompter};
use roster_sdk::{ResolveMode, RosterController};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Manage users and their experiences over a REST store")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "roster.toml")]
    config: String,

    /// REST API base URL (overrides config file)
    #[arg(long, env = "ROSTER_BASE_URL")]
    base_url: Option<String>,

    /// Reference resolution: eager or lazy (overrides config file)
    #[arg(long)]
    mode: Option<ResolveMode>,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: RosterCommands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roster=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::load(&cli.config)?;
    config.apply(Overrides {
        base_url: cli.base_url,
        mode: cli.mode,
    });

    info!(
        base_url = %config.store.base_url,
        mode = %config.roster.resolve_mode,
        "Starting roster"
    );

    let controller = RosterController::new(
        Arc::new(HttpStore::<User>::new(config.store.clone())?),
        Arc::new(HttpStore::<Experience>::new(config.store.clone())?),
        Arc::new(TerminalPrompter::new(cli.yes)),
        config.roster.clone(),
    )?;

    if let Some(report) = controller.load().await? {
        if !report.is_complete() {
            warn!(
                unresolved = report.failures.len(),
                "some experience references could not be resolved"
            );
        }
    }

    match execute_command(&controller, cli.command).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) if e.is_local() => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
