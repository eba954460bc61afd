use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReconError;

/// Extensions the writer can produce.
pub const OUTPUT_EXTENSIONS: &[&str] = &["xlsx", "csv"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A reconciliation run described in TOML (`*.switch.toml`).
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub register: DatasetConfig,
    pub reference: DatasetConfig,
    #[serde(default)]
    pub schedules: Vec<DatasetConfig>,
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Datasets + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetConfig {
    /// Path, relative to the config file unless absolute.
    pub file: String,
    /// Worksheet to read; first sheet when absent. Ignored for delimited files.
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    pub file: String,
    /// Second destination tried when writing `file` fails.
    #[serde(default)]
    pub fallback: Option<String>,
    /// Where to write the run report as JSON.
    #[serde(default)]
    pub summary_json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        require_file("register", &self.register.file)?;
        require_file("reference", &self.reference.file)?;

        if self.schedules.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one [[schedules]] entry is required".into(),
            ));
        }
        for (i, schedule) in self.schedules.iter().enumerate() {
            require_file(&format!("schedules[{i}]"), &schedule.file)?;
        }

        require_file("output", &self.output.file)?;
        require_output_extension("output.file", &self.output.file)?;
        if let Some(fallback) = &self.output.fallback {
            require_file("output.fallback", fallback)?;
            require_output_extension("output.fallback", fallback)?;
        }

        Ok(())
    }

    /// Resolve a configured path against the directory holding the config file.
    pub fn resolve_path(base_dir: &Path, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }
}

fn require_file(section: &str, file: &str) -> Result<(), ReconError> {
    if file.trim().is_empty() {
        return Err(ReconError::ConfigValidation(format!(
            "{section}: file must not be empty"
        )));
    }
    Ok(())
}

fn require_output_extension(section: &str, file: &str) -> Result<(), ReconError> {
    let ext = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if OUTPUT_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ReconError::ConfigValidation(format!(
            "{section}: '{file}' must end in .xlsx or .csv"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
