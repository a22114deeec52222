//! Warehouse table schemas.
//!
//! Record-typed variables (`object<wikipedia>`) are resolved against
//! BigQuery-style field lists, either declared inline in the config file
//! or loaded from the JSON that `bq show --schema` prints.
//!
//! ```text
//! [{"name": "title", "type": "STRING"},
//!  {"name": "cell", "type": "RECORD", "mode": "REPEATED", "fields": [...]}]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CelSqlError, CelSqlResult};
use crate::types::Type;

/// Column type as spelled in a BigQuery schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Bytes,
    #[serde(alias = "INT64")]
    Integer,
    #[serde(alias = "FLOAT64")]
    Float,
    Numeric,
    Bignumeric,
    #[serde(alias = "BOOL")]
    Boolean,
    Timestamp,
    Date,
    Time,
    Datetime,
    Interval,
    Json,
    Geography,
    #[serde(alias = "STRUCT")]
    Record,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub mode: FieldMode,
    /// Sub-fields of a `RECORD` column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::Nullable,
            fields: Vec::new(),
            description: None,
        }
    }

    pub fn record(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            fields,
            ..Self::new(name, FieldType::Record)
        }
    }

    pub fn repeated(mut self) -> Self {
        self.mode = FieldMode::Repeated;
        self
    }

    /// Expression type of this column; `parent` names the record it
    /// belongs to, so nested records become `object<parent.name>`.
    pub fn expr_type(&self, parent: &str) -> Type {
        let scalar = match self.field_type {
            FieldType::String | FieldType::Geography => Type::String,
            FieldType::Bytes => Type::Bytes,
            FieldType::Integer => Type::Int,
            FieldType::Float | FieldType::Numeric | FieldType::Bignumeric => Type::Double,
            FieldType::Boolean => Type::Bool,
            FieldType::Timestamp => Type::Timestamp,
            FieldType::Date => Type::Date,
            FieldType::Time => Type::Time,
            FieldType::Datetime => Type::DateTime,
            FieldType::Interval => Type::Interval,
            FieldType::Json => Type::Dyn,
            FieldType::Record => Type::object(format!("{}.{}", parent, self.name)),
        };
        if self.mode == FieldMode::Repeated {
            Type::list(scalar)
        } else {
            scalar
        }
    }
}

/// Either a bare field array or the `{"fields": [...]}` wrapper.
#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaDocument {
    Fields(Vec<FieldSchema>),
    Table { fields: Vec<FieldSchema> },
}

/// Parse a BigQuery JSON schema.
pub fn parse_fields(json: &str) -> CelSqlResult<Vec<FieldSchema>> {
    let doc: SchemaDocument = serde_json::from_str(json)
        .map_err(|e| CelSqlError::Config(format!("invalid table schema: {}", e)))?;
    Ok(match doc {
        SchemaDocument::Fields(fields) | SchemaDocument::Table { fields } => fields,
    })
}

/// Table schemas by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, Vec<FieldSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, fields: Vec<FieldSchema>) {
        self.tables.insert(table.into(), fields);
    }

    pub fn with_table(mut self, table: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        self.insert(table, fields);
        self
    }

    /// Register the schema stored in a JSON file.
    pub fn load_json_file(&mut self, table: &str, path: impl AsRef<Path>) -> CelSqlResult<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let fields = parse_fields(&content)?;
        debug!(table, path = %path.display(), fields = fields.len(), "loaded table schema");
        self.insert(table, fields);
        Ok(())
    }

    /// Fields of a table or of a nested record such as `trigrams.cell`.
    pub fn resolve(&self, object: &str) -> Option<&[FieldSchema]> {
        let mut parts = object.split('.');
        let mut fields = self.tables.get(parts.next()?)?.as_slice();
        for part in parts {
            let field = fields
                .iter()
                .find(|f| f.name == part && f.field_type == FieldType::Record)?;
            fields = &field.fields;
        }
        Some(fields)
    }

    pub fn field_type(&self, object: &str, field: &str) -> Option<Type> {
        self.resolve(object)?
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.expr_type(object))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TRIGRAMS: &str = r#"{"fields": [
        {"name": "ngram", "type": "STRING"},
        {"name": "cell", "type": "RECORD", "mode": "REPEATED", "fields": [
            {"name": "value", "type": "STRING", "mode": "REPEATED"},
            {"name": "page_count", "type": "INT64"},
            {"name": "sample", "type": "STRUCT", "mode": "REPEATED", "fields": [
                {"name": "title", "type": "STRING"}
            ]}
        ]}
    ]}"#;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new().with_table("trigrams", parse_fields(TRIGRAMS).unwrap())
    }

    #[test]
    fn test_top_level_fields() {
        let r = registry();
        assert_eq!(r.field_type("trigrams", "ngram"), Some(Type::String));
        assert_eq!(
            r.field_type("trigrams", "cell"),
            Some(Type::list(Type::object("trigrams.cell")))
        );
        assert_eq!(r.field_type("trigrams", "missing"), None);
        assert_eq!(r.field_type("unknown", "ngram"), None);
    }

    #[test]
    fn test_nested_records() {
        let r = registry();
        assert_eq!(r.field_type("trigrams.cell", "page_count"), Some(Type::Int));
        assert_eq!(
            r.field_type("trigrams.cell", "value"),
            Some(Type::list(Type::String))
        );
        assert_eq!(
            r.field_type("trigrams.cell.sample", "title"),
            Some(Type::String)
        );
        assert!(r.resolve("trigrams.ngram").is_none());
    }

    #[test]
    fn test_bare_field_array() {
        let fields = parse_fields(r#"[{"name": "x", "type": "FLOAT64", "mode": "REQUIRED"}]"#).unwrap();
        assert_eq!(fields[0].field_type, FieldType::Float);
        assert_eq!(fields[0].mode, FieldMode::Required);
        assert!(parse_fields(r#"{"name": "x"}"#).is_err());
    }

    #[test]
    fn test_only_repeated_mode_changes_the_type() {
        let fields = parse_fields(
            r#"[{"name": "seen", "type": "TIMESTAMP", "mode": "NULLABLE"},
                {"name": "id", "type": "INT64", "mode": "REQUIRED"},
                {"name": "at", "type": "TIMESTAMP", "mode": "REPEATED"}]"#,
        )
        .unwrap();
        assert_eq!(fields[0].expr_type("t"), Type::Timestamp);
        assert_eq!(fields[1].expr_type("t"), Type::Int);
        assert_eq!(fields[2].expr_type("t"), Type::list(Type::Timestamp));
    }
}
