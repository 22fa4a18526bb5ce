//! Domain models for the conversion pipeline.
//!
//! This module contains the core data structures passed between stages:
//!
//! - [`CellValue`] - a single spreadsheet cell (text, number, date, or missing)
//! - [`JoinKey`] - the hashable form of a cell used for cross-sheet matching
//! - [`Row`] / [`Table`] - rows of one sheet, keyed by column name
//! - [`Field`] / [`Record`] - output entities after nesting projection

use chrono::{NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use std::fmt;

/// Largest integer magnitude that survives a round trip through `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

// =============================================================================
// Cell Values
// =============================================================================

/// A scalar cell value as read from a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Text content, kept verbatim.
    Text(String),
    /// Any numeric cell. Integers are stored as `f64` like spreadsheets do.
    Number(f64),
    /// A date or date-time cell.
    Date(NaiveDateTime),
    /// Empty cell, or a column absent from the row.
    Missing,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the value has a JSON representation.
    pub fn is_representable(&self) -> bool {
        match self {
            CellValue::Number(n) => n.is_finite(),
            _ => true,
        }
    }

    /// Key used for join matching. Missing cells never match anything.
    pub fn join_key(&self) -> Option<JoinKey> {
        match self {
            CellValue::Text(s) => Some(JoinKey::Text(s.clone())),
            // -0.0 and 0.0 compare equal, so they must hash equal too
            CellValue::Number(n) if *n == 0.0 => Some(JoinKey::Number(0.0f64.to_bits())),
            CellValue::Number(n) => Some(JoinKey::Number(n.to_bits())),
            CellValue::Date(d) => Some(JoinKey::Date(*d)),
            CellValue::Missing => None,
        }
    }

    /// Integral numbers within the safe range, as `i64`.
    fn as_safe_integer(n: f64) -> Option<i64> {
        if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            Some(n as i64)
        } else {
            None
        }
    }
}

fn format_date(d: &NaiveDateTime) -> String {
    if d.time() == NaiveTime::MIN {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => match CellValue::as_safe_integer(*n) {
                Some(i) => write!(f, "{}", i),
                None => write!(f, "{}", n),
            },
            CellValue::Date(d) => f.write_str(&format_date(d)),
            CellValue::Missing => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) if !n.is_finite() => {
                Err(S::Error::custom(format!("non-finite number {}", n)))
            }
            CellValue::Number(n) => match CellValue::as_safe_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            CellValue::Date(d) => serializer.serialize_str(&format_date(d)),
            CellValue::Missing => serializer.serialize_none(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        CellValue::Date(d)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Missing)
    }
}

// =============================================================================
// Join Keys
// =============================================================================

/// Exact-match key derived from a [`CellValue`].
///
/// No case folding or numeric coercion: `Text("1")` and `Number(1.0)` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinKey {
    Text(String),
    /// Bit pattern of the `f64`.
    Number(u64),
    Date(NaiveDateTime),
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKey::Text(s) => f.write_str(s),
            JoinKey::Number(bits) => fmt::Display::fmt(&CellValue::Number(f64::from_bits(*bits)), f),
            JoinKey::Date(d) => f.write_str(&format_date(d)),
        }
    }
}

// =============================================================================
// Rows and Tables
// =============================================================================

/// One sheet row: column name to value, in column order.
pub type Row = IndexMap<String, CellValue>;

/// Rows read from one sheet, with the header row's column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Sheet the rows came from (used in error messages).
    pub sheet: String,
    /// Column names in sheet order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(sheet: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            sheet: sheet.into(),
            columns,
            rows,
        }
    }

    /// Build a table from positional rows, padding short rows with `Missing`.
    pub fn from_rows(
        sheet: impl Into<String>,
        columns: Vec<String>,
        rows: impl IntoIterator<Item = Vec<CellValue>>,
    ) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut values| {
                values.resize(columns.len(), CellValue::Missing);
                columns.iter().cloned().zip(values).collect()
            })
            .collect();
        Self::new(sheet, columns, rows)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// Output Records
// =============================================================================

/// A top-level slot of a [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    Value(CellValue),
    Group(IndexMap<String, CellValue>),
}

/// One output entity: scalar fields plus nested group sub-objects.
///
/// Key order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        self.fields.insert(name.into(), field);
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Top-level scalar value, if `name` is not a group.
    pub fn value(&self, name: &str) -> Option<&CellValue> {
        match self.fields.get(name)? {
            Field::Value(v) => Some(v),
            Field::Group(_) => None,
        }
    }

    /// Nested sub-object, if `name` is a group.
    pub fn group(&self, name: &str) -> Option<&IndexMap<String, CellValue>> {
        match self.fields.get(name)? {
            Field::Group(g) => Some(g),
            Field::Value(_) => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_number_serialization() {
        assert_eq!(serde_json::to_value(CellValue::from(2020i64)).unwrap(), json!(2020));
        assert_eq!(serde_json::to_value(CellValue::from(1.5)).unwrap(), json!(1.5));
        assert_eq!(serde_json::to_value(CellValue::Missing).unwrap(), json!(null));
        assert!(serde_json::to_value(CellValue::Number(f64::NAN)).is_err());
    }

    #[test]
    fn test_numeric_text_stays_text() {
        let value = serde_json::to_value(CellValue::from("2020")).unwrap();
        assert_eq!(value, json!("2020"));
    }

    #[test]
    fn test_date_format() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 28).unwrap();
        let midnight = CellValue::Date(day.and_hms_opt(0, 0, 0).unwrap());
        let afternoon = CellValue::Date(day.and_hms_opt(14, 30, 5).unwrap());
        assert_eq!(midnight.to_string(), "2024-05-28");
        assert_eq!(afternoon.to_string(), "2024-05-28T14:30:05");
    }

    #[test]
    fn test_join_key_is_exact() {
        assert_eq!(CellValue::from("A1").join_key(), CellValue::from("A1").join_key());
        assert_ne!(CellValue::from("a1").join_key(), CellValue::from("A1").join_key());
        assert_ne!(CellValue::from("1").join_key(), CellValue::from(1i64).join_key());
        assert_eq!(CellValue::Number(-0.0).join_key(), CellValue::Number(0.0).join_key());
        assert_eq!(CellValue::Missing.join_key(), None);
    }

    #[test]
    fn test_table_from_rows_pads() {
        let table = Table::from_rows(
            "Sheet1",
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::from("x")]],
        );
        assert_eq!(table.rows[0]["a"], CellValue::from("x"));
        assert_eq!(table.rows[0]["b"], CellValue::Missing);
        assert!(table.has_column("b"));
    }

    #[test]
    fn test_record_serializes_in_insertion_order() {
        let mut group = IndexMap::new();
        group.insert("year".to_string(), CellValue::from(2020i64));

        let mut record = Record::new();
        record.insert("id", Field::Value(CellValue::from(1i64)));
        record.insert("quickRef", Field::Value(CellValue::from("A1")));
        record.insert("metadata", Field::Group(group));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":1,"quickRef":"A1","metadata":{"year":2020}}"#);
        assert_eq!(record.group("metadata").unwrap()["year"], CellValue::from(2020i64));
        assert!(record.value("metadata").is_none());
    }
}
