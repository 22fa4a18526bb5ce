//! Error types for the conversion pipeline.
//!
//! One enum per layer, mirroring the stages a conversion goes through:
//!
//! - [`ReaderError`] - the tabular source cannot be opened or read
//! - [`SchemaError`] - a sheet does not have the shape the configuration expects
//! - [`SerializationError`] - a value cannot be written as JSON
//! - [`ConfigError`] - the conversion configuration is unreadable or inconsistent
//! - [`PipelineError`] - top-level error returned by [`crate::convert`]
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Reader Errors
// =============================================================================

/// Errors while obtaining rows from a tabular source.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The source cannot be opened at all.
    #[error("Cannot open source '{source_name}': {message}")]
    SourceUnavailable { source_name: String, message: String },

    /// The requested sheet does not exist in the source.
    #[error("Sheet '{sheet}' not found (available: {})", available.join(", "))]
    SheetNotFound { sheet: String, available: Vec<String> },

    /// The header row offset points past the last non-blank row.
    #[error("Header row {header_row} is out of range for sheet '{sheet}' ({rows} non-blank rows)")]
    HeaderRowOutOfRange {
        sheet: String,
        header_row: usize,
        rows: usize,
    },

    /// The sheet content could not be decoded.
    #[error("Cannot decode sheet '{sheet}': {message}")]
    Decode { sheet: String, message: String },
}

// =============================================================================
// Schema Errors
// =============================================================================

/// A sheet does not match the expected schema.
///
/// Almost always caused by an upstream change to the spreadsheet layout.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A required column is absent after normalization.
    #[error("Column '{column}' not found in sheet '{sheet}' (columns: {})", available.join(", "))]
    MissingColumn {
        sheet: String,
        column: String,
        available: Vec<String>,
    },

    /// Two rows share a join key and the configuration rejects duplicates.
    #[error("Duplicate join key '{key}' in sheet '{sheet}'")]
    DuplicateKey { sheet: String, key: String },
}

// =============================================================================
// Serialization Errors
// =============================================================================

/// A record cannot be represented as JSON.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// NaN or infinite numbers have no JSON representation.
    #[error("Non-finite number in field '{field}'")]
    NonFinite { field: String },

    /// JSON encoder failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors loading or validating a [`crate::ConversionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid JSON for the expected shape.
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration is well-formed but inconsistent.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Coarse classification of a failed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    Schema,
    Serialization,
    Config,
}

/// Top-level pipeline error.
///
/// This is the error type returned by [`crate::convert`]. Every variant is
/// fatal to the current conversion; no JSON is produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source reading error.
    #[error("Source error: {0}")]
    Reader(#[from] ReaderError),

    /// Schema error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Reader(_) => ErrorKind::SourceUnavailable,
            PipelineError::Schema(_) => ErrorKind::Schema,
            PipelineError::Serialization(_) => ErrorKind::Serialization,
            PipelineError::Config(_) => ErrorKind::Config,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for reader operations.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Result type for schema checks.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for serialization.
pub type SerializationResult<T> = Result<T, SerializationError>;

/// Result type for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
