//! JSON output.
//!
//! The document is a pretty-printed array with a fixed four-space indent.
//! Key order is the record order, so identical input always produces
//! byte-identical output.

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{SerializationError, SerializationResult};
use crate::models::{Field, Record};

const INDENT: &[u8] = b"    ";

/// Serialize records into the output JSON document.
pub fn serialize(records: &[Record]) -> SerializationResult<String> {
    check_representable(records)?;

    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    records.serialize(&mut serializer)?;

    String::from_utf8(buf).map_err(|e| SerializationError::Json(serde_json::Error::custom(e)))
}

/// Find the first value with no JSON form, naming its field path.
fn check_representable(records: &[Record]) -> SerializationResult<()> {
    for record in records {
        for (name, field) in record.iter() {
            match field {
                Field::Value(value) if !value.is_representable() => {
                    return Err(SerializationError::NonFinite { field: name.to_string() });
                }
                Field::Group(sub) => {
                    if let Some((key, _)) = sub.iter().find(|(_, v)| !v.is_representable()) {
                        return Err(SerializationError::NonFinite {
                            field: format!("{}.{}", name, key),
                        });
                    }
                }
                Field::Value(_) => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use indexmap::IndexMap;

    fn record(id: i64, quick_ref: &str, year: CellValue) -> Record {
        let mut metadata = IndexMap::new();
        metadata.insert("year".to_string(), year);

        let mut record = Record::new();
        record.insert("id", Field::Value(id.into()));
        record.insert("quickRef", Field::Value(quick_ref.into()));
        record.insert("metadata", Field::Group(metadata));
        record
    }

    #[test]
    fn test_layout() {
        let json = serialize(&[record(1, "A1", 2020i64.into())]).unwrap();
        let expected = "[\n    {\n        \"id\": 1,\n        \"quickRef\": \"A1\",\n        \"metadata\": {\n            \"year\": 2020\n        }\n    }\n]";
        assert_eq!(json, expected);
    }

    #[test]
    fn test_missing_is_null() {
        let json = serialize(&[record(1, "A1", CellValue::Missing)]).unwrap();
        assert!(json.contains("\"year\": null"));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(serialize(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_deterministic() {
        let records = vec![record(1, "A1", 2020i64.into()), record(2, "A2", CellValue::Missing)];
        assert_eq!(serialize(&records).unwrap(), serialize(&records).unwrap());
    }

    #[test]
    fn test_non_finite_names_field() {
        let err = serialize(&[record(1, "A1", CellValue::Number(f64::INFINITY))]).unwrap_err();
        match err {
            SerializationError::NonFinite { field } => assert_eq!(field, "metadata.year"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
