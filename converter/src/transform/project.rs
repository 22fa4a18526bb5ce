//! Nesting projection: collapse grouped flat fields into sub-objects.
//!
//! ```text
//! { id, quickRef, categoryLevel, riskCategory, title, year }
//!                    └──── category ────┘              └ metadata ┘
//!   ↓
//! { id, quickRef, category: { level, risk }, title, metadata: { year } }
//! ```
//!
//! A group takes the slot of its first member in the row. Declared members
//! missing from the row become `null`, so every record has the same shape.
//! A group may not share its name with an ungrouped field.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::config::NestingGroup;
use crate::error::{ConfigError, ConfigResult};
use crate::models::{CellValue, Field, Record, Row};

/// Project every merged row into a [`Record`].
pub fn project(rows: Vec<Row>, groups: &[NestingGroup]) -> ConfigResult<Vec<Record>> {
    let owners = group_owners(groups);
    rows.into_iter()
        .map(|row| project_row(row, groups, &owners))
        .collect()
}

/// Field name to index of the group that declares it.
fn group_owners(groups: &[NestingGroup]) -> HashMap<&str, usize> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(idx, group)| group.fields.iter().map(move |f| (f.field.as_str(), idx)))
        .collect()
}

fn project_row(
    row: Row,
    groups: &[NestingGroup],
    owners: &HashMap<&str, usize>,
) -> ConfigResult<Record> {
    let mut record = Record::new();
    let mut grouped: HashMap<String, CellValue> = HashMap::new();
    let mut placed = vec![false; groups.len()];

    for (name, value) in row {
        match owners.get(name.as_str()) {
            Some(&idx) => {
                if !placed[idx] {
                    // Reserve the slot; filled below
                    record.insert(groups[idx].name.clone(), Field::Group(IndexMap::new()));
                    placed[idx] = true;
                }
                grouped.insert(name, value);
            }
            None if groups.iter().any(|g| g.name == name) => {
                return Err(ConfigError::Invalid(format!(
                    "group '{}' has the same name as an ungrouped field",
                    name
                )));
            }
            None => record.insert(name, Field::Value(value)),
        }
    }

    // Groups without any member in the row are appended at the end
    for group in groups {
        let sub: IndexMap<String, CellValue> = group
            .fields
            .iter()
            .map(|member| {
                let value = grouped.remove(&member.field).unwrap_or(CellValue::Missing);
                (member.output_key().to_string(), value)
            })
            .collect();
        record.insert(group.name.clone(), Field::Group(sub));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupField;
    use serde_json::json;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn groups() -> Vec<NestingGroup> {
        vec![
            NestingGroup::new("metadata", [GroupField::new("year"), GroupField::renamed("paperTitle", "title")]),
            NestingGroup::new(
                "category",
                [GroupField::renamed("riskCategory", "risk"), GroupField::renamed("categoryLevel", "level")],
            ),
        ]
    }

    #[test]
    fn test_group_takes_first_member_slot() {
        let rows = vec![row(&[
            ("id", 1i64.into()),
            ("quickRef", "A1".into()),
            ("categoryLevel", "Risk Category".into()),
            ("title", "X".into()),
            ("riskCategory", "Bias".into()),
            ("year", 2020i64.into()),
            ("paperTitle", "Paper".into()),
        ])];

        let records = project(rows, &groups()).unwrap();
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["id", "quickRef", "category", "title", "metadata"]);

        let value = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(value["category"], json!({ "risk": "Bias", "level": "Risk Category" }));
        assert_eq!(value["metadata"], json!({ "year": 2020, "title": "Paper" }));
    }

    #[test]
    fn test_sub_object_key_order_follows_declaration() {
        let rows = vec![row(&[("categoryLevel", "L".into()), ("riskCategory", "R".into())])];
        let records = project(rows, &groups()).unwrap();
        let category = records[0].group("category").unwrap();
        let keys: Vec<&String> = category.keys().collect();
        assert_eq!(keys, vec!["risk", "level"]);
    }

    #[test]
    fn test_absent_members_are_null() {
        let rows = vec![row(&[("id", 1i64.into()), ("year", CellValue::Missing)])];
        let records = project(rows, &groups()).unwrap();

        let value = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(value["metadata"], json!({ "year": null, "title": null }));
        // No category member in the row: group appended at the end
        assert_eq!(value["category"], json!({ "risk": null, "level": null }));
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["id", "metadata", "category"]);
    }

    #[test]
    fn test_ungrouped_fields_untouched() {
        let rows = vec![row(&[("quickRef", "A1".into()), ("Notes", "free text".into())])];
        let records = project(rows, &[]).unwrap();
        assert_eq!(records[0].value("Notes"), Some(&CellValue::from("free text")));
        assert_eq!(records[0].len(), 2);
    }

    #[test]
    fn test_uniform_shape_across_records() {
        let rows = vec![
            row(&[("quickRef", "A1".into()), ("year", 2020i64.into())]),
            row(&[("quickRef", "A2".into()), ("year", CellValue::Missing)]),
        ];
        let records = project(rows, &groups()).unwrap();
        let first: Vec<&str> = records[0].keys().collect();
        let second: Vec<&str> = records[1].keys().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_group_clashing_with_field_is_an_error() {
        let rows = vec![row(&[("quickRef", "A1".into()), ("title", "X".into()), ("year", 2020i64.into())])];
        let clashing = vec![NestingGroup::new("title", [GroupField::new("year")])];

        let err = project(rows, &clashing).unwrap_err();
        assert!(err.to_string().contains("'title'"));
    }

    #[test]
    fn test_group_clashing_with_id_is_an_error() {
        let rows = vec![row(&[("id", 1i64.into()), ("year", 2020i64.into())])];
        let clashing = vec![NestingGroup::new("id", [GroupField::new("year")])];
        assert!(project(rows, &clashing).is_err());
    }
}
