//! # airisk - MIT AI Risk Repository to JSON
//!
//! Converts the AI Risk Repository spreadsheet (a facts sheet plus an
//! "Included resources" metadata sheet) into a normalized JSON document for
//! web UIs, search indexes, and analysis tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Workbook   │────▶│  Normalize  │────▶│    Merge    │────▶│   Project   │────▶│    JSON     │
//! │ (2 sheets)  │     │  (headers)  │     │ (left join) │     │  (nesting)  │     │  (ordered)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use airisk::{convert_source, ConversionConfig, Source};
//!
//! let source = Source::Path("ai_risk_repository.xlsx".into());
//! let conversion = convert_source(&source, &ConversionConfig::default()).unwrap();
//! println!("Converted {} records", conversion.records.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - Cell values, rows, tables, output records
//! - [`reader`] - Workbook and CSV sheet readers
//! - [`config`] - Sheet layout, rename tables, nesting groups
//! - [`transform`] - Normalize, merge, project, serialize, pipeline
//! - [`logs`] - Progress log broadcasting

// Core modules
pub mod error;
pub mod models;

// Input
pub mod config;
pub mod reader;

// Transformation
pub mod transform;

// Progress reporting
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ErrorKind, PipelineError, PipelineResult, ReaderError, SchemaError,
    SerializationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, Field, JoinKey, Record, Row, Table};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ConversionConfig, DuplicateKeyPolicy, GroupField, NestingGroup, SheetConfig};

// =============================================================================
// Re-exports - Readers
// =============================================================================

pub use reader::{open_source, CsvDirectoryReader, Source, TabularReader, WorkbookReader};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    convert, convert_source, convert_tables, merge, normalize, project, serialize, Conversion,
    ConversionStats, MergeOutcome,
};
