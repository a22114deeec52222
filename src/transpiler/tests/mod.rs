//! Converter test modules.
//!
//! Tests are organized by category:
//! - `core`: operators, literals, indexing, casts, strings, parenthesization
//! - `dialects`: case-insensitive wrapping per dialect, identifier quoting
//! - `temporal`: constructors, durations, date/time arithmetic and accessors
//! - `comprehension`: macro lowering, table sources, scoping
//! - `trackers`: value trackers, identifier trackers, custom extensions

mod comprehension;
mod core;
mod trackers;

use crate::ast::Expr;
use crate::checker::Env;
use crate::error::CelSqlResult;
use crate::filters::FilterExtension;
use crate::schema::{FieldSchema, FieldType, SchemaRegistry};
use crate::transpiler::{ConvertOptions, Dialect, convert};
use crate::types::Type;

fn schemas() -> SchemaRegistry {
    let wikipedia = vec![
        FieldSchema::new("title", FieldType::String),
        FieldSchema::new("id", FieldType::Integer),
        FieldSchema::new("language", FieldType::String),
        FieldSchema::new("is_redirect", FieldType::Boolean),
        FieldSchema::new("timestamp", FieldType::Timestamp),
        FieldSchema::new("num_characters", FieldType::Integer),
    ];
    let sample = FieldSchema::record(
        "sample",
        vec![
            FieldSchema::new("id", FieldType::String),
            FieldSchema::new("title", FieldType::String),
            FieldSchema::new("url", FieldType::String),
        ],
    )
    .repeated();
    let cell = FieldSchema::record(
        "cell",
        vec![
            FieldSchema::new("value", FieldType::String).repeated(),
            FieldSchema::new("volume_count", FieldType::Integer),
            FieldSchema::new("page_count", FieldType::Integer),
            sample,
        ],
    )
    .repeated();
    let trigrams = vec![
        FieldSchema::new("ngram", FieldType::String),
        FieldSchema::new("first", FieldType::String),
        cell,
    ];
    SchemaRegistry::new()
        .with_table("wikipedia", wikipedia)
        .with_table("trigrams", trigrams)
}

fn env() -> Env {
    Env::new()
        .with_schemas(schemas())
        .with_variable("name", Type::String)
        .with_variable("age", Type::Int)
        .with_variable("adult", Type::Bool)
        .with_variable("height", Type::Double)
        .with_variable("string_list", Type::list(Type::String))
        .with_variable("string_int_map", Type::map(Type::String, Type::Int))
        .with_variable("nullable_string", Type::wrapper(Type::String))
        .with_variable("nullable_bytes", Type::wrapper(Type::Bytes))
        .with_variable("nullable_strings", Type::list(Type::wrapper(Type::String)))
        .with_variable("null_var", Type::Null)
        .with_variable("birthday", Type::Date)
        .with_variable("fixed_time", Type::Time)
        .with_variable("scheduled_at", Type::DateTime)
        .with_variable("created_at", Type::Timestamp)
        .with_variable("deleted_at", Type::wrapper(Type::Timestamp))
        .with_variable("trigram", Type::object("trigrams"))
        .with_variable("page", Type::object("wikipedia"))
        .with_variable("pages", Type::list(Type::object("wikipedia")))
        .with_extension(&FilterExtension::new())
}

fn compile(source: &str) -> Expr {
    env()
        .compile(source)
        .unwrap_or_else(|e| panic!("failed to compile {}: {}", source, e))
}

fn try_convert(source: &str, dialect: Dialect) -> CelSqlResult<String> {
    let expr = compile(source);
    let filters = FilterExtension::new();
    convert(
        &expr,
        ConvertOptions::new()
            .with_dialect(dialect)
            .with_extension(&filters),
    )
}

fn to_sql(source: &str) -> String {
    try_convert(source, Dialect::BigQuery)
        .unwrap_or_else(|e| panic!("failed to convert {}: {}", source, e))
}

fn to_spanner(source: &str) -> String {
    try_convert(source, Dialect::Spanner)
        .unwrap_or_else(|e| panic!("failed to convert {}: {}", source, e))
}
