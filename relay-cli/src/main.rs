//! Relay — exercise the async-service / polling-host bridge.
//!
//! # Usage
//!
//! ```text
//! relay check [--period-ms <ms>]
//! relay run [--period-ms <ms>] [--ping-every <n>] [--stop-after <n>] [--grace <n>] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    about = "Bridge a polling host to a background service",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scripted bridge checks phase by phase.
    Check(CheckArgs),

    /// Drive a timer-based poll loop against a live service.
    Run(RunArgs),
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => args.run(),
        Commands::Run(args) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
