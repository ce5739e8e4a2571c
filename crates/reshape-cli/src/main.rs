//! # reshape-cli
//!
//! Command-line front end for the reshape projection engine.
//!
//! Reads a JSON document, projects it through a YAML configuration and
//! writes the result as JSON.

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use reshape_core::{ConfigDsl, Either, Registry, Transformer};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status used when the document fails validation.
const EXIT_INVALID: u8 = 3;

#[derive(Parser)]
#[command(name = "reshape")]
#[command(about = "Project nested JSON documents into well-defined shapes")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a JSON document
    Transform {
        /// Input JSON file path
        input: PathBuf,

        /// Projection config file path
        #[arg(short, long)]
        config: PathBuf,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Parse and validate a projection config
    Check {
        /// Projection config file path
        config: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_transformer(config: &Path) -> anyhow::Result<Transformer> {
    let registry = Registry::with_builtins();
    let config = ConfigDsl::parse_file(config, &registry)
        .with_context(|| format!("failed to load config {}", config.display()))?;
    Ok(Transformer::new(config)?)
}

fn run_transform(
    input: &Path,
    config: &Path,
    output: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<ExitCode> {
    tracing::info!("Transforming {} with {}", input.display(), config.display());
    let transformer = load_transformer(config)?;

    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read input {}", input.display()))?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("input {} is not valid JSON", input.display()))?;

    let value = match transformer.transform(&document) {
        Either::Right(value) => value,
        Either::Left(errors) => {
            tracing::warn!(count = errors.len(), "document failed validation");
            let mut stderr = std::io::stderr().lock();
            for error in &errors {
                writeln!(stderr, "error: {error}")?;
            }
            return Ok(ExitCode::from(EXIT_INVALID));
        }
    };

    let mut rendered = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    rendered.push('\n');

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("failed to write output {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => std::io::stdout().lock().write_all(rendered.as_bytes())?,
    }
    Ok(ExitCode::SUCCESS)
}

fn run_check(config: &Path) -> anyhow::Result<ExitCode> {
    let transformer = load_transformer(config)?;
    println!(
        "{}: ok ({} fields)",
        config.display(),
        transformer.config().fields.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Transform {
            input,
            config,
            output,
            pretty,
        } => run_transform(&input, &config, output.as_deref(), pretty),
        Commands::Check { config } => run_check(&config),
    }
}
