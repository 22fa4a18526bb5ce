//! Left join of the primary sheet against the metadata sheet.
//!
//! ```text
//! primary                    metadata                 merged
//! ┌──────────┬───────┐       ┌──────────┬──────┐      ┌────┬──────────┬───────┬──────┐
//! │ quickRef │ title │       │ quickRef │ year │      │ id │ quickRef │ title │ year │
//! │ A1       │ X     │   ⋈   │ A1       │ 2020 │  →   │ 1  │ A1       │ X     │ 2020 │
//! │ A2       │ Y     │       └──────────┴──────┘      │ 2  │ A2       │ Y     │ null │
//! └──────────┴───────┘                                └────┴──────────┴───────┴──────┘
//! ```
//!
//! Every primary row yields exactly one merged row, in primary order, with
//! `id` = 1-based position. Unmatched rows carry every metadata column as
//! missing so all rows share one shape.

use std::collections::{HashMap, HashSet};

use crate::config::DuplicateKeyPolicy;
use crate::error::{SchemaError, SchemaResult};
use crate::logs::log_warning;
use crate::models::{CellValue, JoinKey, Row, Table};

/// Merged rows plus join statistics.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Merged rows in primary order.
    pub rows: Vec<Row>,
    /// Column order shared by every merged row.
    pub columns: Vec<String>,
    /// Primary rows that found a metadata row.
    pub matched: usize,
    pub unmatched: usize,
    /// Keys that appeared more than once in the metadata sheet.
    pub duplicate_keys: Vec<String>,
}

/// First metadata row per join key.
struct Lookup<'a> {
    index: HashMap<JoinKey, &'a Row>,
    duplicates: Vec<String>,
}

fn build_lookup<'a>(
    secondary: &'a Table,
    key: &str,
    policy: DuplicateKeyPolicy,
) -> SchemaResult<Lookup<'a>> {
    let mut index: HashMap<JoinKey, &'a Row> = HashMap::with_capacity(secondary.len());
    let mut reported: HashSet<JoinKey> = HashSet::new();
    let mut duplicates = Vec::new();

    for row in &secondary.rows {
        let Some(join_key) = row.get(key).and_then(CellValue::join_key) else {
            continue;
        };

        if index.contains_key(&join_key) {
            if policy == DuplicateKeyPolicy::Reject {
                return Err(SchemaError::DuplicateKey {
                    sheet: secondary.sheet.clone(),
                    key: join_key.to_string(),
                });
            }
            if reported.insert(join_key.clone()) {
                duplicates.push(join_key.to_string());
            }
            continue;
        }

        index.insert(join_key, row);
    }

    Ok(Lookup { index, duplicates })
}

/// Left-join `primary` with `secondary` on `key` and number the rows.
///
/// Secondary column names must not overlap primary ones; when they do, the
/// secondary value overwrites the primary one on matched rows.
pub fn merge(
    primary: &Table,
    secondary: &Table,
    key: &str,
    id_field: &str,
    policy: DuplicateKeyPolicy,
) -> SchemaResult<MergeOutcome> {
    let lookup = build_lookup(secondary, key, policy)?;

    if !lookup.duplicates.is_empty() {
        log_warning(format!(
            "{} duplicate key(s) in sheet '{}', first row wins: {}",
            lookup.duplicates.len(),
            secondary.sheet,
            lookup.duplicates.join(", ")
        ));
    }

    // The id slot always belongs to the record number
    let secondary_columns: Vec<&String> = secondary
        .columns
        .iter()
        .filter(|c| *c != key && *c != id_field)
        .collect();

    let collisions: Vec<&str> = secondary_columns
        .iter()
        .filter(|c| primary.has_column(c.as_str()))
        .map(|c| c.as_str())
        .collect();
    if !collisions.is_empty() {
        log_warning(format!(
            "Columns present in both sheets, metadata values overwrite: {}",
            collisions.join(", ")
        ));
    }
    for table in [primary, secondary] {
        if table.has_column(id_field) {
            log_warning(format!(
                "Sheet '{}' has its own '{}' column, it is replaced by the record id",
                table.sheet, id_field
            ));
        }
    }

    let mut columns = vec![id_field.to_string()];
    columns.extend(primary.columns.iter().filter(|c| *c != id_field).cloned());
    for column in &secondary_columns {
        if !columns.contains(column) {
            columns.push((*column).clone());
        }
    }

    let mut outcome = MergeOutcome {
        rows: Vec::with_capacity(primary.len()),
        columns,
        duplicate_keys: lookup.duplicates.clone(),
        ..Default::default()
    };

    for (idx, row) in primary.rows.iter().enumerate() {
        let mut merged = Row::with_capacity(outcome.columns.len());
        merged.insert(id_field.to_string(), CellValue::Number((idx + 1) as f64));

        for (name, value) in row {
            if name != id_field {
                merged.insert(name.clone(), value.clone());
            }
        }

        let matched = row
            .get(key)
            .and_then(CellValue::join_key)
            .and_then(|k| lookup.index.get(&k).copied());

        match matched {
            Some(found) => {
                outcome.matched += 1;
                for column in &secondary_columns {
                    let value = found.get(column.as_str()).cloned().unwrap_or(CellValue::Missing);
                    merged.insert((*column).clone(), value);
                }
            }
            None => {
                outcome.unmatched += 1;
                for column in &secondary_columns {
                    if !merged.contains_key(column.as_str()) {
                        merged.insert((*column).clone(), CellValue::Missing);
                    }
                }
            }
        }

        outcome.rows.push(merged);
    }

    Ok(outcome)
}
