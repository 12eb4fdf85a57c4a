//! `capsa-gen`: write capsule headers for the modules in a manifest.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use capsa_gen::{Generator, Manifest, ModuleOutcome};
use capsa_telemetry::{LogConfig, LogFormat};
use clap::Parser;

/// Generate C import headers and export tables from `CAPSULE_API` declarations
#[derive(Parser)]
#[command(name = "capsa-gen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Manifest file (.json or .toml)
    #[arg(short, long, env = "CAPSA_MANIFEST", default_value = "capsules.json")]
    manifest: PathBuf,

    /// Directory module paths are resolved against [default: manifest directory]
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Parse and render without writing files
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log format: compact (default), pretty, json or full
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().with_format(cli.log_format);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = capsa_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let manifest = Manifest::load(&cli.manifest)
        .with_context(|| format!("loading {}", cli.manifest.display()))?;
    let root = cli.root.unwrap_or_else(|| {
        cli.manifest
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default()
    });

    let outcomes = Generator::new(root)
        .dry_run(cli.dry_run)
        .run(&manifest)
        .context("generating capsule headers")?;

    for outcome in outcomes {
        match outcome {
            ModuleOutcome::Generated {
                module,
                output,
                hash_keys,
                ..
            } => {
                println!("{module}: {} ({})", output.display(), hash_keys.join(", "));
            },
            ModuleOutcome::Skipped { module } => {
                println!("{module}: no declarations");
            },
        }
    }
    Ok(())
}
