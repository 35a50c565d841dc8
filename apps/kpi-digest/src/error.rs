use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid date {value:?} on line {line}")]
    InvalidDate { value: String, line: u64 },
    #[error("missing column {0:?}")]
    MissingColumn(String),
    #[error("no data source: set a database URL or a CSV path")]
    NoSource,
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = DigestError> = std::result::Result<T, E>;
