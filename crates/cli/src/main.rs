// switchrecon CLI - reconcile a switch register against the RTA master and brokerage schedules
//
// Commands:
//   run       load inputs, enrich the register, write the processed table
//   validate  check a *.switch.toml without loading any data
//   columns   show which header each semantic field resolves to in a file

mod columns;
mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_LOAD, EXIT_MALFORMED_INPUT, EXIT_SUCCESS, EXIT_USAGE, EXIT_WRITE};
use switchrecon::ReconError;
use switchrecon_io::IoError;

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  switchrecon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  switchrecon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

#[derive(Parser)]
#[command(name = "switchrecon")]
#[command(about = "Reconcile mutual fund switch transactions against brokerage schedules")]
#[command(version, long_version = long_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a switch register and write the processed table
    #[command(after_help = "\
Examples:
  switchrecon run march.switch.toml
  switchrecon run march.switch.toml --json
  switchrecon run march.switch.toml --output out.csv --fallback-output ~/out.csv
  switchrecon run --register reg.xlsx --reference master.csv \\
      --schedule q1.xlsx --schedule q2.xlsx --output processed.xlsx")]
    Run {
        /// Path to the .switch.toml config file
        #[arg(conflicts_with_all = ["register", "reference", "schedules"])]
        config: Option<PathBuf>,

        /// Switch register file (without a config)
        #[arg(long, requires_all = ["reference", "schedules", "output"])]
        register: Option<PathBuf>,

        /// RTA master file (without a config)
        #[arg(long, requires = "register")]
        reference: Option<PathBuf>,

        /// Brokerage schedule file; repeat for several (without a config)
        #[arg(long = "schedule", requires = "register")]
        schedules: Vec<PathBuf>,

        /// Output file (.xlsx or .csv); overrides the config's output.file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Second destination tried when the output cannot be written
        #[arg(long)]
        fallback_output: Option<PathBuf>,

        /// Print the run report as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Suppress the human summary on stderr
        #[arg(long, short)]
        quiet: bool,
    },

    /// Validate a run config without loading data
    #[command(after_help = "\
Examples:
  switchrecon validate march.switch.toml")]
    Validate {
        /// Path to the .switch.toml config file
        config: PathBuf,
    },

    /// Show how a file's headers resolve to the fields the engine reads
    #[command(after_help = "\
Examples:
  switchrecon columns switch_register.xlsx
  switchrecon columns brokerage.xlsx --sheet Q2 --json")]
    Columns {
        /// Register, master or schedule file
        file: PathBuf,

        /// Worksheet to read (spreadsheets only)
        #[arg(long)]
        sheet: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            register,
            reference,
            schedules,
            output,
            fallback_output,
            json,
            quiet,
        } => {
            let source = match (config, register, reference) {
                (Some(config), _, _) => Ok(recon::RunSource::Config(config)),
                (None, Some(register), Some(reference)) => Ok(recon::RunSource::AdHoc {
                    register,
                    reference,
                    schedules,
                }),
                _ => Err(CliError::args("either a config file or --register/--reference/--schedule is required")
                    .with_hint("switchrecon run --help")),
            };
            source.and_then(|source| {
                recon::cmd_run(recon::RunArgs {
                    source,
                    output,
                    fallback_output,
                    json,
                    quiet,
                })
            })
        }
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Columns { file, sheet, json } => columns::cmd_columns(file, sheet, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Map an IO error to the exit code of the stage it happened in.
    pub fn io(err: IoError) -> Self {
        let code = match &err {
            IoError::Write { .. } => EXIT_WRITE,
            IoError::Read { .. } | IoError::Empty { .. } => EXIT_LOAD,
            IoError::UnsupportedFormat { .. } => EXIT_USAGE,
        };
        let hint = match &err {
            IoError::Empty { .. } => Some("the first row must hold the column names".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError) -> Self {
        match err {
            ReconError::DuplicateHeaders { .. } => Self {
                code: EXIT_MALFORMED_INPUT,
                message: err.to_string(),
                hint: Some("rename or remove the repeated columns and run again".to_string()),
            },
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => Self::config(err.to_string()),
            ReconError::Parse { .. } => Self { code: EXIT_LOAD, message: err.to_string(), hint: None },
        }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }
}
