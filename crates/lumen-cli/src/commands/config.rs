use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use lumen_core::pipeline::{DenoiseConfig, WindowSpec};

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the default config here instead of stdout
    #[arg(short, long, conflicts_with = "check")]
    pub output: Option<PathBuf>,

    /// Validate an existing config file and print the resolved strategies
    #[arg(long)]
    pub check: Option<PathBuf>,
}

pub fn run(args: &ConfigArgs) -> Result<()> {
    if let Some(path) = &args.check {
        return check(path);
    }

    let text = DenoiseConfig::default().to_toml()?;
    match &args.output {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            println!("Default config saved to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = DenoiseConfig::from_toml(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    let spec = WindowSpec::from_config(&config)
        .with_context(|| format!("Invalid config {}", path.display()))?;

    println!("{}: ok", path.display());
    println!("  radius       {}", spec.radius);
    println!("  spatial      {}", spec.spatial);
    println!("  temporal     {}", spec.temporal);
    println!("  integration  {}", spec.integration);
    Ok(())
}
