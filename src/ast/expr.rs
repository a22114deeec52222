use std::fmt;

use super::operators::{BinaryOp, UnaryOp};
use super::values::Value;
use crate::types::Type;

/// A node of the expression tree.
///
/// The front end produces nodes with `ty: None`; the checker fills in a
/// resolved type on every node before the tree is handed to the converter.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value.
    Literal(Value),
    /// Variable reference.
    Ident(String),
    /// `operand.field`. `test_only` marks the select produced by `has()`.
    Select {
        operand: Box<Expr>,
        field: String,
        test_only: bool,
    },
    /// `operand[index]`. `safe` marks the out-of-range tolerant `get()` form.
    Index {
        operand: Box<Expr>,
        index: Box<Expr>,
        safe: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Global `f(args)` or member `target.f(args)` call.
    Call {
        function: String,
        target: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
    List(Vec<Expr>),
    Map(Vec<MapEntry>),
    Comprehension(Box<Comprehension>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

/// Which macro a comprehension came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    Map,
    MapDistinct,
    Filter,
    Exists,
    All,
    ExistsOne,
}

impl ComprehensionKind {
    pub fn macro_name(&self) -> &'static str {
        match self {
            ComprehensionKind::Map => "map",
            ComprehensionKind::MapDistinct => "mapDistinct",
            ComprehensionKind::Filter => "filter",
            ComprehensionKind::Exists => "exists",
            ComprehensionKind::All => "all",
            ComprehensionKind::ExistsOne => "exists_one",
        }
    }
}

/// A macro comprehension over `range`, binding each element to `iter_var`.
///
/// `predicate` is the row condition (the filter of `map`/`filter`, or the
/// test of `exists`/`all`/`exists_one`); `result` is the projection of
/// `map`/`mapDistinct`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub kind: ComprehensionKind,
    pub iter_var: String,
    pub range: Expr,
    pub predicate: Option<Expr>,
    pub result: Option<Expr>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, ty: None }
    }

    /// Attach a resolved type.
    pub fn typed(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match &self.kind {
            ExprKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Expr]> {
        match &self.kind {
            ExprKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Value::Null))
    }

    pub fn as_bool_literal(&self) -> Option<bool> {
        match self.kind {
            ExprKind::Literal(Value::Bool(b)) => Some(b),
            _ => None,
        }
    }

    /// Fold a constant string or list of constant strings into a value.
    pub fn const_value(&self) -> Option<Value> {
        match &self.kind {
            ExprKind::Literal(v) => Some(v.clone()),
            ExprKind::List(items) => items
                .iter()
                .map(Expr::const_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(v) => write!(f, "{}", v),
            ExprKind::Ident(name) => write!(f, "{}", name),
            ExprKind::Select {
                operand,
                field,
                test_only: true,
            } => write!(f, "has({}.{})", operand, field),
            ExprKind::Select { operand, field, .. } => write!(f, "{}.{}", operand, field),
            ExprKind::Index {
                operand,
                index,
                safe: true,
            } => write!(f, "{}.get({})", operand, index),
            ExprKind::Index { operand, index, .. } => write!(f, "{}[{}]", operand, index),
            ExprKind::Unary { op, operand } => write!(f, "{}{}", op, operand),
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => write!(f, "({} ? {} : {})", cond, then, otherwise),
            ExprKind::Call {
                function,
                target,
                args,
            } => {
                if let Some(target) = target {
                    write!(f, "{}.", target)?;
                }
                write!(f, "{}(", function)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            ExprKind::List(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            ExprKind::Map(entries) => {
                write!(f, "{{")?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", entry.key, entry.value)?;
                }
                write!(f, "}}")
            }
            ExprKind::Comprehension(c) => {
                write!(f, "{}.{}({}", c.range, c.kind.macro_name(), c.iter_var)?;
                if let Some(p) = &c.predicate {
                    write!(f, ", {}", p)?;
                }
                if let Some(r) = &c.result {
                    write!(f, ", {}", r)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
