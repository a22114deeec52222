//! Ergonomic builder functions for expression trees.
//!
//! Useful when a tree comes from somewhere other than the bundled parser,
//! or when a test wants a hand-typed tree.
//!
//! # Example
//! ```
//! use celsql::ast::builders::*;
//! use celsql::types::Type;
//!
//! // name.startsWith("a")
//! let expr = member(ident("name").typed(Type::String), "startsWith", vec![string("a").typed(Type::String)])
//!     .typed(Type::Bool);
//! assert_eq!(expr.to_string(), "name.startsWith(\"a\")");
//! ```

use super::expr::{Comprehension, ComprehensionKind, Expr, ExprKind, MapEntry};
use super::operators::{BinaryOp, UnaryOp};
use super::values::Value;

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::new(ExprKind::Literal(value.into()))
}

pub fn null() -> Expr {
    lit(Value::Null)
}

pub fn boolean(b: bool) -> Expr {
    lit(b)
}

pub fn int(n: i64) -> Expr {
    lit(n)
}

pub fn string(s: &str) -> Expr {
    lit(s)
}

pub fn ident(name: &str) -> Expr {
    Expr::new(ExprKind::Ident(name.to_string()))
}

pub fn select(operand: Expr, field: &str) -> Expr {
    Expr::new(ExprKind::Select {
        operand: Box::new(operand),
        field: field.to_string(),
        test_only: false,
    })
}

/// `has(operand.field)`
pub fn has(operand: Expr, field: &str) -> Expr {
    Expr::new(ExprKind::Select {
        operand: Box::new(operand),
        field: field.to_string(),
        test_only: true,
    })
}

pub fn index(operand: Expr, idx: Expr) -> Expr {
    Expr::new(ExprKind::Index {
        operand: Box::new(operand),
        index: Box::new(idx),
        safe: false,
    })
}

pub fn safe_index(operand: Expr, idx: Expr) -> Expr {
    Expr::new(ExprKind::Index {
        operand: Box::new(operand),
        index: Box::new(idx),
        safe: true,
    })
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::new(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn not(operand: Expr) -> Expr {
    unary(UnaryOp::Not, operand)
}

pub fn binary(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn conditional(cond: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr::new(ExprKind::Conditional {
        cond: Box::new(cond),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    })
}

/// Global call `function(args)`.
pub fn call(function: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        function: function.to_string(),
        target: None,
        args,
    })
}

/// Member call `target.function(args)`.
pub fn member(target: Expr, function: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        function: function.to_string(),
        target: Some(Box::new(target)),
        args,
    })
}

pub fn list(items: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::List(items))
}

pub fn map(entries: Vec<(Expr, Expr)>) -> Expr {
    Expr::new(ExprKind::Map(
        entries
            .into_iter()
            .map(|(key, value)| MapEntry { key, value })
            .collect(),
    ))
}

pub fn comprehension(
    kind: ComprehensionKind,
    range: Expr,
    iter_var: &str,
    predicate: Option<Expr>,
    result: Option<Expr>,
) -> Expr {
    Expr::new(ExprKind::Comprehension(Box::new(Comprehension {
        kind,
        iter_var: iter_var.to_string(),
        range,
        predicate,
        result,
    })))
}
