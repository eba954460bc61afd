//! `switchrecon run` / `switchrecon validate`: load, reconcile, write.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use switchrecon::config::{DatasetConfig, OutputConfig};
use switchrecon::{ReconInput, RunConfig, RunReport, Stage, Table};
use switchrecon_io::IoError;

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_WRITE};
use crate::CliError;

/// Name given to runs assembled from command-line paths.
const AD_HOC_NAME: &str = "ad-hoc run";

pub enum RunSource {
    Config(PathBuf),
    AdHoc {
        register: PathBuf,
        reference: PathBuf,
        schedules: Vec<PathBuf>,
    },
}

pub struct RunArgs {
    pub source: RunSource,
    pub output: Option<PathBuf>,
    pub fallback_output: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Stdout / summary file shape for `--json` and `output.summary_json`.
#[derive(Serialize)]
struct RunSummary<'a> {
    name: &'a str,
    run_at: String,
    output: String,
    report: &'a RunReport,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Command-line paths are relative to the working directory, not the config file.
fn from_cwd(path: &Path) -> Result<String, CliError> {
    if path.is_absolute() {
        return Ok(path_string(path));
    }
    let cwd = std::env::current_dir()
        .map_err(|e| CliError::general(format!("cannot read current directory: {e}")))?;
    Ok(path_string(&cwd.join(path)))
}

fn read_config(config_path: &Path) -> Result<RunConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    RunConfig::from_toml(&config_str).map_err(CliError::recon)
}

/// Build the effective config and the directory its paths are relative to.
fn resolve_run(args: &RunArgs) -> Result<(RunConfig, PathBuf), CliError> {
    match &args.source {
        RunSource::Config(config_path) => {
            let mut config = read_config(config_path)?;
            if let Some(output) = &args.output {
                config.output.file = from_cwd(output)?;
            }
            if let Some(fallback) = &args.fallback_output {
                config.output.fallback = Some(from_cwd(fallback)?);
            }
            config.validate().map_err(CliError::recon)?;
            let base_dir = config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            Ok((config, base_dir))
        }
        RunSource::AdHoc { register, reference, schedules } => {
            let output = args
                .output
                .as_ref()
                .ok_or_else(|| CliError::args("--output is required without a config file"))?;
            let dataset = |path: &PathBuf| DatasetConfig {
                file: path_string(path),
                sheet: None,
            };
            let config = RunConfig {
                name: AD_HOC_NAME.into(),
                register: dataset(register),
                reference: dataset(reference),
                schedules: schedules.iter().map(dataset).collect(),
                output: OutputConfig {
                    file: path_string(output),
                    fallback: args.fallback_output.as_deref().map(path_string),
                    summary_json: None,
                },
            };
            config
                .validate()
                .map_err(|e| CliError::args(e.to_string()).with_hint("switchrecon run --help"))?;
            Ok((config, PathBuf::new()))
        }
    }
}

fn load_dataset(base_dir: &Path, dataset: &DatasetConfig) -> Result<Table, CliError> {
    let path = RunConfig::resolve_path(base_dir, &dataset.file);
    switchrecon_io::load_table(&path, dataset.sheet.as_deref()).map_err(CliError::io)
}

fn load_input(config: &RunConfig, base_dir: &Path) -> Result<ReconInput, CliError> {
    Ok(ReconInput {
        register: load_dataset(base_dir, &config.register)?,
        reference: load_dataset(base_dir, &config.reference)?,
        schedules: config
            .schedules
            .iter()
            .map(|s| load_dataset(base_dir, s))
            .collect::<Result<_, _>>()?,
    })
}

/// Write to `primary`, then to `fallback` if that fails. Returns the path written.
fn write_output(table: &Table, primary: &Path, fallback: Option<&Path>) -> Result<PathBuf, CliError> {
    let first = match switchrecon_io::write_table(table, primary) {
        Ok(()) => return Ok(primary.to_path_buf()),
        Err(e) => e,
    };
    let Some(fallback) = fallback else {
        return Err(CliError::io(first));
    };

    log::warn!("{first}; retrying at {}", fallback.display());
    match switchrecon_io::write_table(table, fallback) {
        Ok(()) => Ok(fallback.to_path_buf()),
        Err(second) => Err(recon_err(
            EXIT_WRITE,
            format!("{first}; fallback also failed: {second}"),
        )),
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let (config, base_dir) = resolve_run(&args)?;

    log::info!("stage: {}", Stage::Load);
    let input = load_input(&config, &base_dir)?;

    let output = switchrecon::run_with_progress(&input, &mut |stage| log::info!("stage: {stage}"))
        .map_err(CliError::recon)?;

    log::info!("stage: {}", Stage::Write);
    let primary = RunConfig::resolve_path(&base_dir, &config.output.file);
    let fallback = config
        .output
        .fallback
        .as_deref()
        .map(|f| RunConfig::resolve_path(&base_dir, f));
    let written = write_output(&output.table.table, &primary, fallback.as_deref())?;

    let summary = RunSummary {
        name: &config.name,
        run_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        output: path_string(&written),
        report: &output.report,
    };
    let json_str = serde_json::to_string_pretty(&summary)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    if let Some(summary_path) = &config.output.summary_json {
        let path = RunConfig::resolve_path(&base_dir, summary_path);
        std::fs::write(&path, &json_str).map_err(|e| {
            CliError::io(IoError::Write { path: path.clone(), message: e.to_string() })
        })?;
        if !args.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if args.json {
        println!("{json_str}");
    }

    if !args.quiet {
        print_summary(&config.name, &written, &output.report);
    }
    Ok(())
}

fn print_summary(name: &str, written: &Path, report: &RunReport) {
    eprintln!(
        "{name}: wrote {} row(s) to {} ({} register row(s), {} schedule row(s))",
        report.output_rows,
        written.display(),
        report.register_rows,
        report.schedule_rows,
    );
    for (side, stats) in [
        ("switch in ", &report.statistics.switch_in),
        ("switch out", &report.statistics.switch_out),
    ] {
        eprintln!(
            "  {side}: {} of {} matched ({} missing key, {} no schedule, {} outside period)",
            stats.matched,
            stats.total(),
            stats.missing_key,
            stats.no_candidate,
            stats.outside_period,
        );
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    for note in &report.notes {
        eprintln!("note: {note}");
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: '{}' with {} schedule file(s), output {}",
        config.name,
        config.schedules.len(),
        config.output.file,
    );
    Ok(())
}
