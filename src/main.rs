use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use sheet_exporter::config::DEFAULT_CONFIG_FILE;
use sheet_exporter::generator::GeneratorRegistry;
use sheet_exporter::{Configuration, Engine, ExportError, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&cli.log) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            error!(fatal = error.is_fatal(), "{error}");
            std::process::exit(1);
        }
    }
}

/// Returns whether every sheet was exported.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Export(args) => execute_export(&cli.config, args),
        Command::Init { force } => execute_init(&cli.config, force),
        Command::Generators => {
            for name in GeneratorRegistry::builtin().names() {
                println!("{name}");
            }
            Ok(true)
        }
    }
}

fn execute_export(config_path: &Path, args: ExportArgs) -> Result<bool> {
    let mut config = if config_path.exists() {
        Configuration::load(config_path)?
    } else {
        info!(config = %config_path.display(), "configuration file not found, using defaults");
        Configuration::default()
    };
    if let Some(generator) = args.generator {
        config.generator = generator;
    }
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(output) = args.output {
        config.output = output;
    }

    let engine = Engine::from_registry(config, &GeneratorRegistry::builtin())?;
    let report = if args.files.is_empty() {
        engine.export_all()?
    } else {
        engine.export_files(&args.files)?
    };

    for failure in &report.failures {
        let sheet = failure.sheet.as_deref().unwrap_or("*");
        eprintln!("failed: {}:{sheet}: {}", failure.workbook.display(), failure.reason);
    }
    Ok(report.is_clean())
}

fn execute_init(config_path: &Path, force: bool) -> Result<bool> {
    if config_path.exists() && !force {
        return Err(ExportError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists, pass --force to overwrite", config_path.display()),
        )));
    }
    Configuration::default().save(config_path)?;
    info!(config = %config_path.display(), "default configuration written");
    Ok(true)
}

fn init_logging(options: &LogOptions) -> Result<()> {
    let default_level = if options.quiet {
        "error"
    } else if options.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|error| ExportError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export spreadsheet configuration tables into typed artifacts."
)]
struct Cli {
    /// Configuration file.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    log: LogOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LogOptions {
    /// Log debug details.
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Export the given workbooks, or every workbook under the input root.
    Export(ExportArgs),
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// List the built-in generators.
    Generators,
}

#[derive(Args)]
struct ExportArgs {
    /// Workbooks to export; all workbooks under the input root when empty.
    files: Vec<PathBuf>,

    /// Overrides the configured generator.
    #[arg(long)]
    generator: Option<String>,

    /// Overrides the configured input root.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Overrides the configured output root.
    #[arg(long)]
    output: Option<PathBuf>,
}
