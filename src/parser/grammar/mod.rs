pub mod base;
pub mod expressions;
pub mod literals;

use nom::sequence::delimited;

use crate::ast::Expr;

pub use self::base::{PResult, SyntaxError};
use self::base::sp;

/// Parse an expression surrounded by optional whitespace and comments.
pub fn parse_root(input: &str) -> PResult<'_, Expr> {
    delimited(sp, expressions::parse_expr, sp)(input)
}
