//! Expression-language parser using nom.
//!
//! Parses source text into an untyped [`Expr`] tree; the checker then
//! resolves a type for every node.
//!
//! # Syntax Overview
//!
//! ```text
//! name.startsWith("a") && (age >= 10 || has(page.title))
//! pages.filter(p, p.language == "english").map(p, p.title)
//! created_at - duration("1h") <= timestamp("2021-09-01T18:00:00Z")
//! ```
//!
//! The comprehension macros (`map`, `mapDistinct`, `filter`, `exists`,
//! `all`, `exists_one`) and `has()` are expanded while parsing.

pub mod grammar;
mod macros;

#[cfg(test)]
mod tests;

use crate::ast::Expr;
use crate::error::{CelSqlError, CelSqlResult};

pub use grammar::SyntaxError;

/// Parse a complete expression.
pub fn parse(input: &str) -> CelSqlResult<Expr> {
    match grammar::parse_root(input) {
        Ok(("", expr)) => Ok(expr),
        Ok((remaining, _)) => Err(CelSqlError::parse(
            input.len() - remaining.len(),
            format!("unexpected trailing content: '{}'", remaining),
        )),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(CelSqlError::parse(input.len() - e.input.len(), e.message))
        }
        Err(nom::Err::Incomplete(_)) => {
            Err(CelSqlError::parse(input.len(), "unexpected end of input"))
        }
    }
}
