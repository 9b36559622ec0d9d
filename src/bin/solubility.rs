use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use solubility::*;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use tracing::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Predict the aqueous solubility (LogS) of molecules from SMILES strings."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute descriptors, train the model and print predicted LogS values.
    Predict(PredictArgs),
    /// Compute and print the molecular descriptors only.
    Describe(DescribeArgs),
    /// Read SMILES from stdin; an empty line runs a prediction on what was entered.
    Interactive(InteractiveArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// SMILES strings to evaluate
    smiles: Vec<String>,

    /// Read one SMILES per line from a file, or from stdin with `-`
    #[arg(short, long, value_name = "PATH", conflicts_with = "smiles")]
    input: Option<PathBuf>,

    /// Leave out molecules that cannot be parsed instead of failing
    #[arg(long)]
    skip_invalid: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Regression algorithm
    #[arg(short, long, value_enum)]
    algorithm: Option<Algorithm>,

    /// Training table, as a URL or a local path
    #[arg(long, value_name = "URL_OR_PATH")]
    dataset: Option<String>,

    /// Number of trees in the random forest
    #[arg(long, value_name = "N")]
    n_estimators: Option<usize>,

    /// Random forest seed
    #[arg(long)]
    seed: Option<u64>,
}

impl ModelArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            algorithm: self.algorithm,
            dataset: self.dataset.clone(),
            n_estimators: self.n_estimators,
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct DescribeArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Args, Debug)]
struct InteractiveArgs {
    #[command(flatten)]
    model: ModelArgs,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn read_input(args: &InputArgs) -> Result<Vec<String>> {
    let block = match &args.input {
        Some(path) if path == Path::new("-") => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
            text
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read SMILES from {}", path.display()))?,
        None if !args.smiles.is_empty() => args.smiles.join("\n"),
        None => {
            info!("No input given, using the default molecules");
            DEFAULT_SMILES_BLOCK.to_owned()
        }
    };
    Ok(read_smiles_block(&block))
}

fn descriptor_table(smiles: &[String], skip_invalid: bool) -> Result<DescriptorTable> {
    let table = if skip_invalid {
        let (table, skipped) = generate_lenient(smiles);
        if !skipped.is_empty() {
            eprintln!("Skipped {} invalid molecule(s)", skipped.len());
        }
        table
    } else {
        generate(smiles).context("failed to compute descriptors")?
    };
    if table.is_empty() {
        bail!("no valid molecules to evaluate");
    }
    Ok(table)
}

fn predict(config_path: Option<&Path>, args: &PredictArgs) -> Result<()> {
    let config = AppConfig::load(config_path, &args.model.overrides())?;
    let smiles = read_input(&args.input)?;
    let table = descriptor_table(&smiles, args.input.skip_invalid)?;
    let dataset = TrainingSet::fetch(&config.dataset.source, &config.dataset.label_column)?;
    let predictions = train_and_predict(&dataset, &table, &config.model)?;
    print!("{}", render(&table, Some(&predictions), args.input.format)?);
    Ok(())
}

fn describe(args: &DescribeArgs) -> Result<()> {
    let smiles = read_input(&args.input)?;
    let table = descriptor_table(&smiles, args.input.skip_invalid)?;
    print!("{}", render(&table, None, args.input.format)?);
    Ok(())
}

/// State kept between the runs of an interactive session.
struct Session {
    config: AppConfig,
    format: OutputFormat,
    dataset: Option<TrainingSet>,
    cache: ModelCache,
}

impl Session {
    fn new(config: AppConfig, format: OutputFormat) -> Self {
        Self {
            config,
            format,
            dataset: None,
            cache: ModelCache::new(),
        }
    }

    fn run(&mut self, smiles: &[String], out: &mut impl Write) -> Result<()> {
        let table = generate(smiles)?;
        if self.dataset.is_none() {
            self.dataset = Some(TrainingSet::fetch(
                &self.config.dataset.source,
                &self.config.dataset.label_column,
            )?);
        }
        let Some(dataset) = &self.dataset else {
            bail!("training data unavailable");
        };
        let predictions = if self.config.model.cache {
            self.cache.predict(dataset, &table, &self.config.model)?
        } else {
            train_and_predict(dataset, &table, &self.config.model)?
        };
        write!(out, "{}", render(&table, Some(&predictions), self.format)?)?;
        Ok(())
    }

    /// Handle a `:command` line. Returns false when the session should end.
    fn command(&mut self, line: &str, out: &mut impl Write) -> Result<bool> {
        let mut words = line.trim_start_matches(':').split_whitespace();
        match (words.next(), words.next()) {
            (Some("quit" | "q" | "exit"), _) => return Ok(false),
            (Some("algorithm"), Some(name)) => {
                self.config.model.algorithm = name.parse()?;
                writeln!(out, "Using {}", self.config.model.algorithm)?;
            }
            (Some("algorithm"), None) => writeln!(out, "Using {}", self.config.model.algorithm)?,
            _ => bail!("unknown command '{line}' (try :algorithm <random-forest|svr> or :quit)"),
        }
        Ok(true)
    }
}

/// Drive a session from `input` until EOF or `:quit`.
///
/// SMILES lines accumulate and an empty line predicts them. Lines still pending
/// at EOF are predicted before returning; `:quit` drops them. A failed batch is
/// reported on stderr and the session goes on.
fn run_session(session: &mut Session, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    let mut pending: Vec<String> = Vec::new();
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();

        let result = if line.starts_with(':') {
            match session.command(line, out) {
                Ok(true) => Ok(()),
                Ok(false) => return Ok(()),
                Err(e) => Err(e),
            }
        } else if line.is_empty() {
            if pending.is_empty() {
                continue;
            }
            session.run(&std::mem::take(&mut pending), out)
        } else {
            pending.push(line.to_owned());
            Ok(())
        };
        if let Err(e) = result {
            eprintln!("Error: {e:#}");
        }
    }

    if !pending.is_empty() {
        session.run(&pending, out)?;
    }
    Ok(())
}

fn interactive(config_path: Option<&Path>, args: &InteractiveArgs) -> Result<()> {
    let config = AppConfig::load(config_path, &args.model.overrides())?;
    let mut session = Session::new(config, args.format);
    println!("Enter one SMILES per line and an empty line to predict. :algorithm <name> switches models, :quit exits.");
    run_session(&mut session, io::stdin().lock(), &mut io::stdout())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(log_level(cli.verbose, cli.quiet));
    debug!("Parsed arguments: {:?}", cli);

    let config = cli.config.as_deref();
    match &cli.command {
        Commands::Predict(args) => predict(config, args),
        Commands::Describe(args) => describe(args),
        Commands::Interactive(args) => interactive(config, args),
    }
}
