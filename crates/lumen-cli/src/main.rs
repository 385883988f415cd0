mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lumen", about = "Multi-frame video denoiser")]
#[command(version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show track metadata
    Info(commands::info::InfoArgs),
    /// Denoise a frame sequence
    Denoise(commands::denoise::DenoiseArgs),
    /// Print the default config as TOML, or check a config file
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Denoise(args) => commands::denoise::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
