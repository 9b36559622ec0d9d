use anyhow::{Context, Result};
use clap::Parser;
use solubility::*;
use std::fs::File;
use std::path::PathBuf;
use tracing::*;

/// Convert a table of SMILES and measured solubilities into a training table
/// with the four descriptor columns and `logS`.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// CSV with a SMILES column and a measured LogS column
    input: PathBuf,

    /// Where to write the training CSV
    #[arg(short, long, default_value = "delaney-descriptors.csv")]
    output: PathBuf,

    #[arg(long, default_value = "SMILES")]
    smiles_column: String,

    #[arg(long, default_value = "measured log(solubility:mol/L)")]
    label_column: String,

    /// Increase verbosity (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    });

    let input = File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let output = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let written = build_training_csv(input, output, &args.smiles_column, &args.label_column)
        .context("failed to build the training table")?;
    info!("Training table written to {}", args.output.display());
    println!("{written} rows written to {}", args.output.display());
    Ok(())
}
