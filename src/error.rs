use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Error type covering the different failure cases that can occur when the
/// exporter reads workbooks, converts their cells, or writes artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization fails inside a generator.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the configuration file is not valid TOML.
    #[error("configuration error: {0}")]
    ConfigRead(#[from] toml::de::Error),

    /// Raised when the configuration cannot be serialised back to TOML.
    #[error("configuration error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Errors bubbled up from the spreadsheet reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::Error),

    /// Raised when the input directory cannot be walked.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Raised when a column declares a type token the grammar does not accept.
    #[error("malformed type '{token}': {reason}")]
    MalformedType { token: String, reason: String },

    /// Raised when a cell cannot be coerced into its declared type.
    #[error("cannot convert field '{field}' of row {row} to {declared} (raw value '{raw}'): {reason}")]
    Conversion {
        row: String,
        field: String,
        declared: String,
        raw: String,
        reason: String,
    },

    /// Raised when a sheet does not follow the three header row layout.
    #[error("illegal sheet '{sheet}': {reason}")]
    IllegalSheet { sheet: String, reason: String },

    /// Raised when a workbook lies outside the configured input root.
    #[error("{file} is not located under the input directory {root}")]
    IllegalFile { file: PathBuf, root: PathBuf },

    /// Raised when the configured generator is unknown or incomplete.
    #[error("illegal generator '{name}': {reason}")]
    IllegalGenerator { name: String, reason: String },

    /// Raised when the user provides a path that does not exist.
    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ExportError {
    /// Returns true for misconfiguration errors that must abort the whole run
    /// instead of being recovered at sheet level.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExportError::IllegalFile { .. }
                | ExportError::IllegalGenerator { .. }
                | ExportError::MissingInput(_)
        )
    }
}
