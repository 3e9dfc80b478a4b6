use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type covering the different failure cases that can occur when the
/// tool ingests exports, reconciles them against the CMDB, or archives the
/// source files.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Errors bubbled up from the CSV reader implementation.
    #[error("CSV read error: {0}")]
    CsvRead(#[from] csv::Error),

    /// Errors bubbled up from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when the configuration file cannot be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Raised when an input table does not follow the expected conventions.
    #[error("invalid input table: {0}")]
    InvalidTable(String),

    /// Raised when an asset row references a type tag outside the catalog.
    #[error("unknown asset type tag '{0}'")]
    UnknownType(String),

    /// Raised when a relationship row references a type tag outside the
    /// catalog.
    #[error("unknown relationship type tag '{0}'")]
    UnknownRelationshipType(String),

    /// Raised when a relationship endpoint name has no remote counterpart.
    #[error("no remote asset named '{name}' (source '{source_name}', target '{target_name}')")]
    Resolution {
        name: String,
        source_name: String,
        target_name: String,
    },

    /// Raised when a create, update, delete, or associate call is rejected
    /// by the remote API.
    #[error("remote call failed for '{subject}': {status}")]
    RemoteCall { subject: String, status: String },

    /// Raised when a listing page fetch fails while building the remote
    /// asset index. Fatal for the whole run: the index would be incomplete.
    #[error("failed to fetch asset listing page {page}: {reason}")]
    Pagination { page: u32, reason: String },

    /// Raised when an archive upload is rejected by the storage service.
    #[error("archive upload failed for '{file}': {reason}")]
    Archive { file: String, reason: String },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when an input file carries an extension the readers do not
    /// understand.
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(PathBuf),
}

impl From<toml::de::Error> for SyncError {
    fn from(error: toml::de::Error) -> Self {
        SyncError::Config(error.to_string())
    }
}
