//! Column normalization: raw sheet headers to canonical field names.
//!
//! ```text
//! "QuickRef"         → quickRef      (renamed via the mapping table)
//! " Risk category "  → riskCategory  (trimmed, then renamed)
//! "Notes"            → Notes         (not mapped: passes through)
//! "Notes"            → Metadata_Notes (passes through with `unmapped_prefix`)
//! ```

use crate::config::SheetConfig;
use crate::error::{SchemaError, SchemaResult};
use crate::logs::log_warning;
use crate::models::{CellValue, Row, Table};

/// Canonical name for a raw header, or `None` when the column is dropped.
///
/// The header is trimmed before lookup. Unmapped headers keep their trimmed
/// name, behind `sheet.unmapped_prefix` if set, unless `drop_unmapped` is set.
/// `keep` is never dropped nor prefixed.
pub fn canonical_name(raw: &str, sheet: &SheetConfig, keep: &str) -> Option<String> {
    let trimmed = raw.trim();
    match sheet.columns.get(trimmed) {
        Some(canonical) => Some(canonical.clone()),
        None if trimmed == keep => Some(trimmed.to_string()),
        None if sheet.drop_unmapped => None,
        None => match &sheet.unmapped_prefix {
            Some(prefix) => Some(format!("{}{}", prefix, trimmed)),
            None => Some(trimmed.to_string()),
        },
    }
}

/// Rename the columns of `table` according to `sheet.columns`.
///
/// Fails with [`SchemaError::MissingColumn`] when `join_key` is not among the
/// resulting columns. The input table is left untouched.
pub fn normalize(table: &Table, sheet: &SheetConfig, join_key: &str) -> SchemaResult<Table> {
    // (raw column, canonical name) in sheet order
    let mut plan: Vec<(&str, String)> = Vec::with_capacity(table.columns.len());

    for raw in &table.columns {
        let Some(canonical) = canonical_name(raw, sheet, join_key) else {
            continue;
        };

        if plan.iter().any(|(_, c)| *c == canonical) {
            log_warning(format!(
                "Sheet '{}': column '{}' also maps to '{}', keeping the first one",
                table.sheet, raw, canonical
            ));
            continue;
        }
        plan.push((raw.as_str(), canonical));
    }

    let columns: Vec<String> = plan.iter().map(|(_, c)| c.clone()).collect();

    if !columns.iter().any(|c| c == join_key) {
        return Err(SchemaError::MissingColumn {
            sheet: table.sheet.clone(),
            column: join_key.to_string(),
            available: columns,
        });
    }

    let rows = table
        .rows
        .iter()
        .map(|row| {
            plan.iter()
                .map(|(raw, canonical)| {
                    let value = row.get(*raw).cloned().unwrap_or(CellValue::Missing);
                    (canonical.clone(), value)
                })
                .collect::<Row>()
        })
        .collect();

    Ok(Table::new(table.sheet.clone(), columns, rows))
}
