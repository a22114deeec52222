//! # celsql
//!
//! Translates typed filter expressions into GoogleSQL fragments for
//! BigQuery and Spanner.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use celsql::prelude::*;
//!
//! let env = Env::new().with_variable("name", Type::String);
//! let sql = celsql::convert_source(
//!     r#"name.startsWith("a") && name.endsWith("z")"#,
//!     &env,
//!     ConvertOptions::new(),
//! )?;
//! // => STARTS_WITH(`name`, "a") AND ENDS_WITH(`name`, "z")
//! ```
//!
//! ## Pipeline
//!
//! | Stage     | Module         | Output                      |
//! |-----------|----------------|-----------------------------|
//! | Parse     | [`parser`]     | untyped [`ast::Expr`]       |
//! | Check     | [`checker`]    | [`ast::Expr`] typed per node |
//! | Convert   | [`transpiler`] | SQL text and bindings       |
//!
//! Filter functions such as `existsEqualsCI` live in [`filters`] and plug
//! into both the checker and the converter as an extension.

pub mod ast;
pub mod checker;
pub mod config;
pub mod error;
pub mod filters;
pub mod parser;
pub mod schema;
pub mod transpiler;
pub mod types;

pub mod prelude {
    pub use crate::ast::{Expr, ExprKind, Value};
    pub use crate::checker::{Env, FunctionDecl};
    pub use crate::config::Config;
    pub use crate::error::{CelSqlError, CelSqlResult};
    pub use crate::filters::FilterExtension;
    pub use crate::parser::parse;
    pub use crate::schema::{FieldSchema, FieldType, SchemaRegistry};
    pub use crate::transpiler::{
        ConvertOptions, Dialect, Extension, IdentTracker, InlineValues, NamedParams, PathSet,
        ValueTracker, convert,
    };
    pub use crate::types::Type;
}

use checker::Env;
use error::CelSqlResult;
use transpiler::ConvertOptions;

/// Parse, check against `env` and convert `source` in one step.
///
/// # Example
///
/// ```
/// use celsql::prelude::*;
///
/// let env = Env::new().with_variable("age", Type::Int);
/// let sql = celsql::convert_source("age >= 18", &env, ConvertOptions::new()).unwrap();
/// assert_eq!(sql, "`age` >= 18");
/// ```
pub fn convert_source(source: &str, env: &Env, options: ConvertOptions<'_>) -> CelSqlResult<String> {
    let expr = env.compile(source)?;
    transpiler::convert(&expr, options)
}
