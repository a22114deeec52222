use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CelSqlError;
use crate::transpiler::sql::bigquery::BigQueryGenerator;
use crate::transpiler::sql::spanner::SpannerGenerator;
use crate::transpiler::traits::SqlGenerator;

/// Supported SQL Dialects.
///
/// Both speak GoogleSQL; they differ in how case-insensitive comparisons
/// are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    BigQuery,
    Spanner,
}

impl Dialect {
    pub fn generator(&self) -> Box<dyn SqlGenerator> {
        match self {
            Dialect::BigQuery => Box::new(BigQueryGenerator),
            Dialect::Spanner => Box::new(SpannerGenerator),
        }
    }
}

impl FromStr for Dialect {
    type Err = CelSqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bigquery" | "bq" => Ok(Dialect::BigQuery),
            "spanner" => Ok(Dialect::Spanner),
            other => Err(CelSqlError::Config(format!("unknown dialect '{}'", other))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::BigQuery => write!(f, "bigquery"),
            Dialect::Spanner => write!(f, "spanner"),
        }
    }
}
