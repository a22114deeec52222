//! TOML configuration.
//!
//! ```toml
//! dialect = "spanner"
//! max_arguments_to_expand = 3
//! named_parameters = true
//!
//! [variables]
//! name = "string"
//! pages = "list<object<wikipedia>>"
//!
//! [tables.wikipedia]
//! schema_file = "schemas/wikipedia.json"
//!
//! [[tables.trigrams.fields]]
//! name = "ngram"
//! type = "STRING"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::checker::Env;
use crate::error::{CelSqlError, CelSqlResult};
use crate::filters::FilterExtension;
use crate::schema::{FieldSchema, SchemaRegistry};
use crate::transpiler::Dialect;
use crate::types::Type;

/// Settings shared by every conversion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dialect: Dialect,

    /// Longest literal list the filter functions expand into `OR`ed tests.
    pub max_arguments_to_expand: usize,

    /// Emit `@p0`-style parameters instead of inline literals.
    pub named_parameters: bool,

    /// Variable name to type spec, e.g. `list<string>`.
    pub variables: BTreeMap<String, String>,

    pub tables: BTreeMap<String, TableConfig>,
}

/// Schema of one table: inline fields or a BigQuery JSON schema file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,

    /// Resolved against the config file's directory.
    pub schema_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_arguments_to_expand: FilterExtension::DEFAULT_MAX_ARGUMENTS_TO_EXPAND,
            named_parameters: false,
            variables: BTreeMap::new(),
            tables: BTreeMap::new(),
        }
    }
}

impl Config {
    /// `<config dir>/celsql/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("celsql").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> CelSqlResult<Self> {
        toml::from_str(content).map_err(|e| CelSqlError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> CelSqlResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!(
            path = %path.display(),
            variables = config.variables.len(),
            tables = config.tables.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// The file at [`Config::default_path`], or defaults when there is none.
    pub fn load_default() -> CelSqlResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn schemas(&self, base_dir: &Path) -> CelSqlResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        for (name, table) in &self.tables {
            match &table.schema_file {
                Some(file) => registry.load_json_file(name, base_dir.join(file))?,
                None => registry.insert(name.clone(), table.fields.clone()),
            }
        }
        Ok(registry)
    }

    /// Checker environment with the declared variables, table schemas
    /// and the filter functions.
    pub fn env(&self, base_dir: &Path) -> CelSqlResult<Env> {
        let mut env = Env::new().with_schemas(self.schemas(base_dir)?);
        for (name, spec) in &self.variables {
            let ty: Type = spec.parse()?;
            env.declare(name.clone(), ty);
        }
        Ok(env.with_extension(&self.filter_extension()))
    }

    pub fn filter_extension(&self) -> FilterExtension {
        FilterExtension::new().with_max_arguments_to_expand(self.max_arguments_to_expand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
dialect = "spanner"
named_parameters = true

[variables]
name = "string"
tags = "list<string>"
pages = "list<object<wikipedia>>"

[[tables.wikipedia.fields]]
name = "title"
type = "STRING"

[[tables.wikipedia.fields]]
name = "views"
type = "INT64"
mode = "REQUIRED"
"#;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dialect, Dialect::BigQuery);
        assert_eq!(config.max_arguments_to_expand, 3);
        assert!(!config.named_parameters);
    }

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.dialect, Dialect::Spanner);
        assert!(config.named_parameters);
        assert_eq!(config.variables["tags"], "list<string>");
        let fields = &config.tables["wikipedia"].fields;
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].field_type, FieldType::Integer);
    }

    #[test]
    fn test_env_from_config() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let env = config.env(Path::new(".")).unwrap();
        assert_eq!(env.variable("tags"), Some(&Type::list(Type::String)));
        assert_eq!(
            env.schemas().field_type("wikipedia", "views"),
            Some(Type::Int)
        );
        assert!(env.functions().any(|f| f == "existsEqualsCI"));
        let expr = env.compile("pages.map(p, p.title)").unwrap();
        assert_eq!(expr.ty, Some(Type::list(Type::String)));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_toml("dialect = \"postgres\"").is_err());
        let config = Config::from_toml("[variables]\nx = \"lst<int>\"").unwrap();
        assert!(matches!(
            config.env(Path::new(".")),
            Err(CelSqlError::Config(_))
        ));
    }

    #[test]
    fn test_missing_schema_file() {
        let config = Config::from_toml("[tables.t]\nschema_file = \"does/not/exist.json\"").unwrap();
        assert!(matches!(
            config.schemas(Path::new(".")),
            Err(CelSqlError::Io(_))
        ));
    }
}
