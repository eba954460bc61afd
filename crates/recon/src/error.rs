use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// A dataset carries the same header text more than once. Fatal for the run.
    #[error("{dataset} has duplicate column names: {}", .names.join(", "))]
    DuplicateHeaders { dataset: String, names: Vec<String> },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty file path, no schedules, bad output extension).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Delimited text could not be read into a table.
    #[error("{dataset}: cannot read delimited data: {message}")]
    Parse { dataset: String, message: String },
}

pub type Result<T> = std::result::Result<T, ReconError>;
