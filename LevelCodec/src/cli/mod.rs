//! LevelCodec CLI - Command-line interface for level asset tools

pub mod commands;

use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "levelcodec")]
#[command(about = "LevelCodec: mesh, rig, collision and texture tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Log sub-block offsets and counts while decoding
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Run the LevelCodec CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    cli.command.execute()?;

    Ok(())
}
