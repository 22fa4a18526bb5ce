//! Conversion configuration.
//!
//! Everything the pipeline needs to know about the source layout lives here,
//! so the stages themselves stay schema-agnostic:
//!
//! - which sheets to read and at which header row
//! - how raw headers map to canonical field names
//! - which field joins the two sheets
//! - which fields collapse into nested groups, in which order
//!
//! [`ConversionConfig::default`] is the MIT AI Risk Repository layout.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Sheet layout for one side of the join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Sheet name inside the workbook.
    pub name: String,

    /// Number of non-blank rows above the header row.
    #[serde(default)]
    pub header_row: usize,

    /// Raw header (trimmed) to canonical field name, in output order.
    #[serde(default)]
    pub columns: IndexMap<String, String>,

    /// Drop columns whose header is not in `columns`.
    #[serde(default)]
    pub drop_unmapped: bool,

    /// Prepended to unmapped headers that are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmapped_prefix: Option<String>,
}

impl SheetConfig {
    pub fn new(name: impl Into<String>, header_row: usize) -> Self {
        Self {
            name: name.into(),
            header_row,
            columns: IndexMap::new(),
            drop_unmapped: false,
            unmapped_prefix: None,
        }
    }

    /// Add a raw header to canonical name mapping.
    pub fn with_column(mut self, raw: &str, canonical: &str) -> Self {
        self.columns.insert(raw.to_string(), canonical.to_string());
        self
    }

    pub fn drop_unmapped(mut self, drop: bool) -> Self {
        self.drop_unmapped = drop;
        self
    }

    /// Namespace unmapped passthrough columns, e.g. `Metadata_`.
    pub fn with_unmapped_prefix(mut self, prefix: &str) -> Self {
        self.unmapped_prefix = Some(prefix.to_string());
        self
    }
}

/// What to do when several metadata rows share a join key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Keep the first row seen for each key.
    #[default]
    FirstWins,
    /// Abort the conversion with a schema error.
    Reject,
}

/// A member of a nesting group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupField {
    /// Canonical field name in the merged row.
    pub field: String,

    /// Key inside the sub-object (defaults to `field`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl GroupField {
    pub fn new(field: &str) -> Self {
        Self { field: field.to_string(), key: None }
    }

    pub fn renamed(field: &str, key: &str) -> Self {
        Self { field: field.to_string(), key: Some(key.to_string()) }
    }

    pub fn output_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.field)
    }
}

impl From<&str> for GroupField {
    fn from(field: &str) -> Self {
        GroupField::new(field)
    }
}

/// A named set of fields collapsed into one sub-object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestingGroup {
    pub name: String,
    /// Members in sub-object key order.
    pub fields: Vec<GroupField>,
}

impl NestingGroup {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = GroupField>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().collect(),
        }
    }
}

fn default_join_key() -> String {
    "quickRef".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

/// Complete configuration for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Facts sheet; every row becomes one record.
    pub primary: SheetConfig,

    /// Metadata sheet, left-joined onto the primary rows.
    pub metadata: SheetConfig,

    /// Canonical field matched across both sheets.
    #[serde(default = "default_join_key")]
    pub join_key: String,

    /// Field receiving the sequential record id.
    #[serde(default = "default_id_field")]
    pub id_field: String,

    #[serde(default)]
    pub duplicate_keys: DuplicateKeyPolicy,

    #[serde(default)]
    pub groups: Vec<NestingGroup>,
}

impl ConversionConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Override the sheet names, keeping everything else.
    pub fn with_sheet_names(mut self, primary: Option<&str>, metadata: Option<&str>) -> Self {
        if let Some(name) = primary {
            self.primary.name = name.to_string();
        }
        if let Some(name) = metadata {
            self.metadata.name = name.to_string();
        }
        self
    }

    /// Check internal consistency.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.join_key.trim().is_empty() {
            return Err(ConfigError::Invalid("join key is empty".into()));
        }
        if self.id_field.trim().is_empty() {
            return Err(ConfigError::Invalid("id field is empty".into()));
        }
        if self.join_key == self.id_field {
            return Err(ConfigError::Invalid(format!(
                "join key and id field are both '{}'",
                self.join_key
            )));
        }

        let mut group_names = HashSet::new();
        let mut grouped_fields = HashSet::new();
        let canonical: HashSet<&str> = self
            .primary
            .columns
            .values()
            .chain(self.metadata.columns.values())
            .map(String::as_str)
            .collect();

        for group in &self.groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate group '{}'", group.name)));
            }
            if group.name == self.id_field
                || group.name == self.join_key
                || canonical.contains(group.name.as_str())
            {
                return Err(ConfigError::Invalid(format!(
                    "group '{}' has the same name as a field",
                    group.name
                )));
            }
            if group.fields.is_empty() {
                return Err(ConfigError::Invalid(format!("group '{}' has no fields", group.name)));
            }

            let mut keys = HashSet::new();
            for member in &group.fields {
                if member.field == self.join_key || member.field == self.id_field {
                    return Err(ConfigError::Invalid(format!(
                        "group '{}' cannot contain '{}'",
                        group.name, member.field
                    )));
                }
                if !grouped_fields.insert(member.field.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "field '{}' belongs to more than one group",
                        member.field
                    )));
                }
                if !keys.insert(member.output_key()) {
                    return Err(ConfigError::Invalid(format!(
                        "group '{}' has duplicate key '{}'",
                        group.name,
                        member.output_key()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// MIT AI Risk Repository layout.
impl Default for ConversionConfig {
    fn default() -> Self {
        let primary = SheetConfig::new("AI Risk Database v2", 2)
            .drop_unmapped(true)
            .with_column("Title", "title")
            .with_column("QuickRef", "quickRef")
            .with_column("Ev_ID", "evId")
            .with_column("Category level", "categoryLevel")
            .with_column("Risk category", "riskCategory")
            .with_column("Risk subcategory", "riskSubcategory")
            .with_column("Description", "description")
            .with_column("Additional ev.", "additionalEvidence")
            .with_column("Entity", "entity")
            .with_column("Intent", "intent")
            .with_column("Timing", "timing")
            .with_column("Domain", "domain")
            .with_column("Sub-domain", "subDomain");

        // Metadata names are prefixed where they would collide with the primary sheet
        let metadata = SheetConfig::new("Included resources", 11)
            .drop_unmapped(true)
            .with_column("QuickRef", "quickRef")
            .with_column("Included", "included")
            .with_column("Paper_ID", "paperId")
            .with_column("Title", "paperTitle")
            .with_column("Authors (full)", "authorsFull")
            .with_column("Authors (short)", "authorsShort")
            .with_column("Year", "year")
            .with_column("DOI", "doi")
            .with_column("URL", "url")
            .with_column("Citations (28 May 2024)", "citations")
            .with_column("Cites/yr", "citesPerYear")
            .with_column("Item type", "itemType");

        let groups = vec![
            NestingGroup::new(
                "metadata",
                [
                    GroupField::new("included"),
                    GroupField::new("paperId"),
                    GroupField::renamed("paperTitle", "title"),
                    GroupField::new("authorsFull"),
                    GroupField::new("authorsShort"),
                    GroupField::new("year"),
                    GroupField::new("doi"),
                    GroupField::new("url"),
                    GroupField::new("citations"),
                    GroupField::new("citesPerYear"),
                    GroupField::new("itemType"),
                ],
            ),
            NestingGroup::new(
                "category",
                [
                    GroupField::renamed("categoryLevel", "level"),
                    GroupField::renamed("riskCategory", "risk"),
                    GroupField::renamed("riskSubcategory", "subcategory"),
                ],
            ),
        ];

        Self {
            primary,
            metadata,
            join_key: default_join_key(),
            id_field: default_id_field(),
            duplicate_keys: DuplicateKeyPolicy::FirstWins,
            groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConversionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.primary.header_row, 2);
        assert_eq!(config.metadata.header_row, 11);
        assert_eq!(config.join_key, "quickRef");
        assert_eq!(config.metadata.columns["Title"], "paperTitle");
        assert!(config.primary.drop_unmapped && config.metadata.drop_unmapped);
    }

    #[test]
    fn test_group_named_like_id_rejected() {
        let mut config = ConversionConfig::default();
        config.groups = vec![NestingGroup::new("id", [GroupField::new("year")])];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("group 'id'"));

        config.groups = vec![NestingGroup::new("quickRef", [GroupField::new("year")])];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_group_named_like_column_rejected() {
        let mut config = ConversionConfig::default();
        // "title" is a canonical primary column
        config.groups = vec![NestingGroup::new("title", [GroupField::new("year")])];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        // ...and "paperId" a canonical metadata column
        config.groups = vec![NestingGroup::new("paperId", [GroupField::new("year")])];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unmapped_prefix_wire_format() {
        let json = r#"{
            "primary": { "name": "Facts" },
            "metadata": { "name": "Meta", "unmapped_prefix": "Metadata_" }
        }"#;
        let config = ConversionConfig::from_json(json).unwrap();
        assert_eq!(config.metadata.unmapped_prefix.as_deref(), Some("Metadata_"));
        assert_eq!(config.primary.unmapped_prefix, None);
        assert!(!config.to_json().unwrap().contains("\"unmapped_prefix\": null"));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = ConversionConfig::default();
        let json = config.to_json().unwrap();
        let parsed = ConversionConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
        // Key order of the rename table survives
        let raw: Vec<&String> = parsed.primary.columns.keys().collect();
        assert_eq!(raw[0], "Title");
        assert_eq!(raw[1], "QuickRef");
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "primary": { "name": "Facts" },
            "metadata": { "name": "Meta", "header_row": 3 }
        }"#;
        let config = ConversionConfig::from_json(json).unwrap();
        assert_eq!(config.join_key, "quickRef");
        assert_eq!(config.id_field, "id");
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::FirstWins);
        assert_eq!(config.primary.header_row, 0);
        assert!(config.groups.is_empty());
    }

    #[test]
    fn test_duplicate_policy_wire_format() {
        let json = r#"{
            "primary": { "name": "Facts" },
            "metadata": { "name": "Meta" },
            "duplicate_keys": "reject"
        }"#;
        let config = ConversionConfig::from_json(json).unwrap();
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::Reject);
    }

    #[test]
    fn test_field_in_two_groups_rejected() {
        let mut config = ConversionConfig::default();
        config.groups.push(NestingGroup::new("extra", [GroupField::new("year")]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than one group"));
    }

    #[test]
    fn test_group_cannot_swallow_join_key() {
        let mut config = ConversionConfig::default();
        config.groups = vec![NestingGroup::new("keys", [GroupField::new("quickRef")])];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_group_rejected() {
        let mut config = ConversionConfig::default();
        config.groups.push(NestingGroup::new("empty", []));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sheet_name_override() {
        let config = ConversionConfig::default().with_sheet_names(Some("AI Risk Database v3"), None);
        assert_eq!(config.primary.name, "AI Risk Database v3");
        assert_eq!(config.metadata.name, "Included resources");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, ConversionConfig::default().to_json().unwrap()).unwrap();

        let config = ConversionConfig::from_json_file(&path).unwrap();
        assert_eq!(config.groups.len(), 2);

        let missing = ConversionConfig::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
