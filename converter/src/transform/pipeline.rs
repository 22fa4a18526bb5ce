//! High-level pipeline API.
//!
//! Chains every stage for one conversion run:
//!
//! ```text
//! source ─▶ read ×2 ─▶ normalize ×2 ─▶ merge ─▶ project ─▶ serialize ─▶ JSON
//! ```
//!
//! Any failure aborts the run before JSON is produced.
//!
//! # Example
//!
//! ```rust,ignore
//! use airisk::{convert_source, ConversionConfig, Source};
//!
//! let source = Source::Path("ai_risk_repository.xlsx".into());
//! let conversion = convert_source(&source, &ConversionConfig::default())?;
//! std::fs::write("ai_risk.json", &conversion.json)?;
//! ```

use serde::Serialize;

use super::merge::merge;
use super::normalize::normalize;
use super::project::project;
use super::serialize::serialize;
use crate::config::{ConversionConfig, SheetConfig};
use crate::error::PipelineResult;
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{Record, Table};
use crate::reader::{open_source, Source, TabularReader};

/// Counters describing one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStats {
    pub primary_rows: usize,
    pub metadata_rows: usize,
    /// Records that found metadata.
    pub matched: usize,
    pub unmatched: usize,
    /// Metadata keys that appeared more than once.
    pub duplicate_keys: usize,
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub records: Vec<Record>,
    /// The serialized output document.
    pub json: String,
    pub stats: ConversionStats,
}

/// Open `source` and convert it.
pub fn convert_source(source: &Source, config: &ConversionConfig) -> PipelineResult<Conversion> {
    log_info(format!("📖 Opening {}", source));
    let mut reader = open_source(source)?;
    convert(reader.as_mut(), config)
}

/// Read both sheets from `reader` and convert them.
pub fn convert(reader: &mut dyn TabularReader, config: &ConversionConfig) -> PipelineResult<Conversion> {
    config.validate()?;

    let primary = read_sheet(reader, &config.primary)?;
    let metadata = read_sheet(reader, &config.metadata)?;

    convert_tables(&primary, &metadata, config)
}

/// Convert two already-read sheets.
pub fn convert_tables(
    primary: &Table,
    metadata: &Table,
    config: &ConversionConfig,
) -> PipelineResult<Conversion> {
    config.validate()?;

    log_info("🔤 Normalizing column names...");
    let primary = normalize(primary, &config.primary, &config.join_key)?;
    let metadata = normalize(metadata, &config.metadata, &config.join_key)?;
    log_info_indent(format!("{}: {}", primary.sheet, primary.columns.join(", ")), 1);
    log_info_indent(format!("{}: {}", metadata.sheet, metadata.columns.join(", ")), 1);

    log_info(format!("🔗 Merging on '{}'...", config.join_key));
    let merged = merge(
        &primary,
        &metadata,
        &config.join_key,
        &config.id_field,
        config.duplicate_keys,
    )?;
    log_success(format!(
        "{} records, {} with metadata, {} without",
        merged.rows.len(),
        merged.matched,
        merged.unmatched
    ));

    warn_undeclared_group_members(&merged.columns, config);

    let stats = ConversionStats {
        primary_rows: primary.len(),
        metadata_rows: metadata.len(),
        matched: merged.matched,
        unmatched: merged.unmatched,
        duplicate_keys: merged.duplicate_keys.len(),
    };

    log_info("📦 Nesting grouped fields...");
    let records = project(merged.rows, &config.groups)?;

    log_info("📝 Serializing JSON...");
    let json = serialize(&records)?;
    log_success(format!("{} records serialized", records.len()));

    Ok(Conversion { records, json, stats })
}

fn read_sheet(reader: &mut dyn TabularReader, sheet: &SheetConfig) -> PipelineResult<Table> {
    log_info(format!("Reading sheet '{}' (header row {})", sheet.name, sheet.header_row));
    let table = reader.read_sheet(&sheet.name, sheet.header_row)?;
    log_success(format!("{} rows, {} columns", table.len(), table.columns.len()));
    Ok(table)
}

/// Group members that neither sheet provides will always be null.
fn warn_undeclared_group_members(columns: &[String], config: &ConversionConfig) {
    let absent: Vec<String> = config
        .groups
        .iter()
        .flat_map(|g| g.fields.iter().map(move |f| (g, f)))
        .filter(|(_, f)| !columns.contains(&f.field))
        .map(|(g, f)| format!("{}.{}", g.name, f.output_key()))
        .collect();

    if !absent.is_empty() {
        log_warning(format!("No source column for: {}", absent.join(", ")));
    }
}
