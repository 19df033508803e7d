use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("failed to open tick archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("failed to read tick archive: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid date '{value}' for {key}: expected YYYY-MM-DD")]
    InvalidDate {
        key: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid date window: start {start} is after end {end}")]
    InvalidWindow { start: String, end: String },

    #[error("sampling period must be at least one second, got {0}")]
    InvalidPeriod(i64),

    #[error("missing input key '{0}'")]
    MissingInput(String),
}
