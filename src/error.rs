use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, DictError>;

/// Enum representing all possible errors in the yomidict_rs library.
#[derive(Error, Debug)]
pub enum DictError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Required data file not found: {0}")]
    DataFileNotFound(String),

    #[error("Failed to parse data: {0}")]
    ParseError(String), // Generic parsing error for non-JSON issues

    #[error("Entry not found: {0}")]
    EntryNotFound(i64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String), // For unexpected situations
}
