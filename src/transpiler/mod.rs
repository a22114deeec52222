//! SQL converter for typed expression trees.
//!
//! Walks a tree whose every node carries a resolved [`Type`] and appends
//! GoogleSQL text to a buffer. Literals go through a [`ValueTracker`],
//! emitted variable paths are reported to an [`IdentTracker`], and calls
//! without a built-in rule are delegated to registered [`Extension`]s.

pub mod calls;
pub mod comprehension;
pub mod dialect;
pub mod extension;
pub mod idents;
pub mod sql;
pub mod temporal;
pub mod traits;
pub mod values;

#[cfg(test)]
mod tests;

use tracing::trace;

use crate::ast::{
    ATOM_PRECEDENCE, BinaryOp, COMPARISON_PRECEDENCE, ComprehensionKind, Expr, ExprKind,
    NEG_PRECEDENCE, NOT_PRECEDENCE, UnaryOp, Value,
};
use crate::error::{CelSqlError, CelSqlResult};
use crate::types::{
    Type, is_date_part_type, is_duration_type, is_list_type, is_map_type, is_object_list_type,
    is_object_type, is_string_or_bytes_type, is_temporal_type,
};

pub use dialect::Dialect;
pub use extension::Extension;
pub use idents::{IdentTracker, NoopIdentTracker, PathSet};
pub use traits::SqlGenerator;
pub use values::{InlineValues, NamedParam, NamedParams, ValueTracker, value_to_sql};

/// Conversion settings: dialect, tracking policies and extensions.
pub struct ConvertOptions<'a> {
    dialect: Dialect,
    values: Option<Box<dyn ValueTracker + 'a>>,
    idents: Option<Box<dyn IdentTracker + 'a>>,
    extensions: Vec<&'a dyn Extension>,
}

impl Default for ConvertOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ConvertOptions<'a> {
    pub fn new() -> Self {
        Self {
            dialect: Dialect::default(),
            values: None,
            idents: None,
            extensions: Vec::new(),
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Pass `&mut tracker` to read the bindings back after conversion.
    pub fn with_value_tracker(mut self, tracker: impl ValueTracker + 'a) -> Self {
        self.values = Some(Box::new(tracker));
        self
    }

    pub fn with_ident_tracker(mut self, tracker: impl IdentTracker + 'a) -> Self {
        self.idents = Some(Box::new(tracker));
        self
    }

    /// Register an extension after those already registered.
    pub fn with_extension(mut self, extension: &'a dyn Extension) -> Self {
        self.extensions.push(extension);
        self
    }
}

/// Convert a typed expression into a SQL fragment.
pub fn convert(expr: &Expr, options: ConvertOptions<'_>) -> CelSqlResult<String> {
    let mut con = Converter::new(options);
    con.visit(expr)?;
    Ok(con.finish())
}

/// Single-use emitter state. Obtain one through [`convert`]; extensions
/// receive a handle to it.
pub struct Converter<'a> {
    buf: String,
    dialect: Dialect,
    generator: Box<dyn SqlGenerator>,
    values: Box<dyn ValueTracker + 'a>,
    idents: Box<dyn IdentTracker + 'a>,
    extensions: Vec<&'a dyn Extension>,
    /// Iteration variables of the enclosing comprehensions, innermost last.
    scopes: Vec<String>,
}

/// Operand of `==`/`!=` that turns the comparison into an `IS` test.
enum IsOperand {
    Null,
    Bool(bool),
}

impl<'a> Converter<'a> {
    fn new(options: ConvertOptions<'a>) -> Self {
        Self {
            buf: String::new(),
            dialect: options.dialect,
            generator: options.dialect.generator(),
            values: options.values.unwrap_or_else(|| Box::new(InlineValues)),
            idents: options.idents.unwrap_or_else(|| Box::new(NoopIdentTracker)),
            extensions: options.extensions,
            scopes: Vec::new(),
        }
    }

    fn finish(self) -> String {
        self.buf
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn generator(&self) -> &dyn SqlGenerator {
        self.generator.as_ref()
    }

    /// Append raw SQL text.
    pub fn write_str(&mut self, sql: &str) {
        self.buf.push_str(sql);
    }

    /// Append a literal through the value tracker.
    pub fn write_value(&mut self, value: &Value) -> CelSqlResult<()> {
        let rendered = match value {
            Value::Null | Value::Bool(_) => values::value_to_sql(value)?,
            _ => self.values.add_value(value, self.generator.as_ref())?,
        };
        self.buf.push_str(&rendered);
        Ok(())
    }

    /// Resolved type of a node.
    pub fn get_type<'e>(&self, expr: &'e Expr) -> CelSqlResult<&'e Type> {
        expr.ty
            .as_ref()
            .ok_or_else(|| CelSqlError::MissingType(expr.to_string()))
    }

    /// Emit `expr` wrapped in the dialect's case-insensitive comparison form.
    pub fn visit_case_folded(&mut self, expr: &Expr) -> CelSqlResult<()> {
        self.write_str(self.generator.fold_open());
        self.visit(expr)?;
        self.write_str(self.generator.fold_close());
        Ok(())
    }

    /// Emit `expr`, parenthesized when it binds looser than `min_precedence`.
    pub fn visit_operand(&mut self, expr: &Expr, min_precedence: u8) -> CelSqlResult<()> {
        let wrap = self.precedence(expr) < min_precedence;
        self.visit_nested(expr, wrap)
    }

    fn visit_nested(&mut self, expr: &Expr, wrap: bool) -> CelSqlResult<()> {
        if wrap {
            self.write_str("(");
            self.visit(expr)?;
            self.write_str(")");
            Ok(())
        } else {
            self.visit(expr)
        }
    }

    pub fn visit(&mut self, expr: &Expr) -> CelSqlResult<()> {
        self.get_type(expr)?;
        match &expr.kind {
            ExprKind::Literal(value) => self.write_value(value),
            ExprKind::Ident(name) => self.visit_ident(expr, name),
            ExprKind::Select { test_only, .. } => self.visit_select(expr, *test_only),
            ExprKind::Index {
                operand,
                index,
                safe,
            } => self.visit_index(operand, index, *safe),
            ExprKind::Unary { op, operand } => self.visit_unary(*op, operand),
            ExprKind::Binary { op, lhs, rhs } => self.visit_binary(*op, lhs, rhs),
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.write_str("IF(");
                self.visit(cond)?;
                self.write_str(", ");
                self.visit(then)?;
                self.write_str(", ");
                self.visit(otherwise)?;
                self.write_str(")");
                Ok(())
            }
            ExprKind::Call {
                function,
                target,
                args,
            } => self.visit_call(function, target.as_deref(), args),
            ExprKind::List(items) => {
                self.write_str("[");
                self.visit_list(items)?;
                self.write_str("]");
                Ok(())
            }
            ExprKind::Map(entries) => {
                self.write_str("STRUCT(");
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        self.write_str(", ");
                    }
                    let field = struct_field_name(&entry.key)?;
                    self.visit(&entry.value)?;
                    self.write_str(" AS ");
                    self.write_str(field);
                }
                self.write_str(")");
                Ok(())
            }
            ExprKind::Comprehension(c) => self.visit_comprehension(c),
        }
    }

    /// Comma-separated items.
    pub fn visit_list(&mut self, items: &[Expr]) -> CelSqlResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write_str(", ");
            }
            self.visit(item)?;
        }
        Ok(())
    }

    fn is_scoped(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s == name)
    }

    fn track(&mut self, root: Option<&Expr>, path: &[String]) {
        let recorded = self.idents.add_ident_access(root, path);
        trace!(path = %recorded.join("."), rooted = root.is_some(), "ident access");
    }

    fn write_identifier(&mut self, name: &str) {
        let quoted = self.generator.quote_identifier(name);
        self.buf.push_str(&quoted);
    }

    fn visit_ident(&mut self, expr: &Expr, name: &str) -> CelSqlResult<()> {
        if is_date_part_type(self.get_type(expr)?) {
            self.write_str(name);
            return Ok(());
        }
        if !self.is_scoped(name) {
            self.track(None, &[name.to_string()]);
        }
        self.write_identifier(name);
        Ok(())
    }

    /// Emit a maximal select chain `base.f1.f2...`, reporting it once.
    fn visit_select(&mut self, expr: &Expr, test_only: bool) -> CelSqlResult<()> {
        let mut fields = Vec::new();
        let mut base = expr;
        while let ExprKind::Select {
            operand, field, ..
        } = &base.kind
        {
            if !std::ptr::eq(base, expr) && is_test_only(base) {
                break;
            }
            fields.push(field.clone());
            base = operand;
        }
        fields.reverse();

        match &base.kind {
            ExprKind::Ident(name) if !self.is_scoped(name) => {
                let mut path = Vec::with_capacity(fields.len() + 1);
                path.push(name.clone());
                path.extend(fields.iter().cloned());
                self.track(None, &path);
                self.write_identifier(name);
            }
            ExprKind::Ident(name) => {
                self.track(Some(base), &fields);
                self.write_identifier(name);
            }
            _ => {
                self.track(Some(base), &fields);
                self.visit_operand(base, ATOM_PRECEDENCE)?;
            }
        }
        for field in &fields {
            self.write_str(".");
            self.write_identifier(field);
        }
        if test_only {
            self.write_str(" IS NOT NULL");
        }
        Ok(())
    }

    fn visit_index(&mut self, operand: &Expr, index: &Expr, safe: bool) -> CelSqlResult<()> {
        let operand_ty = self.get_type(operand)?;
        if is_list_type(operand_ty) {
            self.visit_operand(operand, ATOM_PRECEDENCE)?;
            self.write_str(if safe { "[SAFE_OFFSET(" } else { "[OFFSET(" });
            self.visit(index)?;
            self.write_str(")]");
            return Ok(());
        }
        if is_map_type(operand_ty) || is_object_type(operand_ty) {
            let field = match index.as_literal() {
                Some(Value::String(key)) => key,
                _ => {
                    return Err(CelSqlError::mismatch(format!(
                        "unsupported key {} for {}: keys must be constant strings",
                        index, operand_ty
                    )));
                }
            };
            if !values::is_identifier(field) {
                return Err(CelSqlError::InvalidIdentifier(field.clone()));
            }
            self.visit_operand(operand, ATOM_PRECEDENCE)?;
            self.write_str(".");
            self.write_identifier(field);
            return Ok(());
        }
        Err(CelSqlError::mismatch(format!(
            "cannot index a value of type {}",
            operand_ty
        )))
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &Expr) -> CelSqlResult<()> {
        match op {
            UnaryOp::Not => {
                self.write_str("NOT ");
                self.visit_operand(operand, NOT_PRECEDENCE)
            }
            UnaryOp::Neg => {
                self.write_str("-");
                // `--` would open a comment
                let wrap = self.precedence(operand) < NEG_PRECEDENCE || starts_with_minus(operand);
                self.visit_nested(operand, wrap)
            }
        }
    }

    fn visit_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> CelSqlResult<()> {
        let lhs_ty = self.get_type(lhs)?;
        let rhs_ty = self.get_type(rhs)?;
        match op {
            BinaryOp::Eq | BinaryOp::Ne => self.visit_equality(op, lhs, rhs),
            BinaryOp::In => {
                if is_map_type(rhs_ty) {
                    return Err(CelSqlError::mismatch(
                        "membership tests against maps are not supported",
                    ));
                }
                self.visit_operand(lhs, COMPARISON_PRECEDENCE + 1)?;
                self.write_str(" IN UNNEST(");
                self.visit(rhs)?;
                self.write_str(")");
                Ok(())
            }
            BinaryOp::Mod => {
                self.write_str("MOD(");
                self.visit(lhs)?;
                self.write_str(", ");
                self.visit(rhs)?;
                self.write_str(")");
                Ok(())
            }
            BinaryOp::Add | BinaryOp::Sub if is_temporal_arith(lhs_ty, rhs_ty) => {
                self.visit_temporal_arith(op, lhs, rhs)
            }
            BinaryOp::Add if is_concatenation(lhs_ty) => self.visit_infix(op, "||", lhs, rhs),
            _ => {
                let sql = op
                    .sql()
                    .ok_or_else(|| CelSqlError::unsupported(format!("operator {}", op)))?;
                self.visit_infix(op, sql, lhs, rhs)
            }
        }
    }

    fn visit_infix(&mut self, op: BinaryOp, sql: &str, lhs: &Expr, rhs: &Expr) -> CelSqlResult<()> {
        let prec = op.precedence();
        let lhs_prec = self.precedence(lhs);
        let rhs_prec = self.precedence(rhs);
        let lhs_wrap = lhs_prec < prec || (lhs_prec == prec && prec == COMPARISON_PRECEDENCE);
        let same_op = matches!(&rhs.kind, ExprKind::Binary { op: rhs_op, .. } if *rhs_op == op);
        let rhs_wrap = rhs_prec < prec || (rhs_prec == prec && !(same_op && op.is_associative()));
        self.visit_nested(lhs, lhs_wrap)?;
        self.write_str(" ");
        self.write_str(sql);
        self.write_str(" ");
        self.visit_nested(rhs, rhs_wrap)
    }

    fn visit_equality(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> CelSqlResult<()> {
        let (subject, test) = match (is_operand(rhs), is_operand(lhs)) {
            (Some(test), _) => (lhs, test),
            (None, Some(test)) => (rhs, test),
            (None, None) => {
                let sql = if op == BinaryOp::Eq { "=" } else { "!=" };
                return self.visit_infix(op, sql, lhs, rhs);
            }
        };
        self.visit_operand(subject, COMPARISON_PRECEDENCE + 1)?;
        self.write_str(" IS ");
        if op == BinaryOp::Ne {
            self.write_str("NOT ");
        }
        self.write_str(match test {
            IsOperand::Null => "NULL",
            IsOperand::Bool(true) => "TRUE",
            IsOperand::Bool(false) => "FALSE",
        });
        Ok(())
    }

    /// Binding strength of the SQL emitted for `expr`.
    pub fn precedence(&self, expr: &Expr) -> u8 {
        match &expr.kind {
            ExprKind::Select {
                test_only: true, ..
            } => COMPARISON_PRECEDENCE,
            ExprKind::Unary {
                op: UnaryOp::Not, ..
            } => NOT_PRECEDENCE,
            ExprKind::Unary {
                op: UnaryOp::Neg, ..
            } => NEG_PRECEDENCE,
            ExprKind::Binary { op, lhs, rhs } => match (op, &lhs.ty, &rhs.ty) {
                (BinaryOp::Mod, _, _) => ATOM_PRECEDENCE,
                (BinaryOp::Add | BinaryOp::Sub, Some(l), Some(r)) if is_temporal_arith(l, r) => {
                    ATOM_PRECEDENCE
                }
                (op, _, _) => op.precedence(),
            },
            ExprKind::Call {
                function, target, ..
            } => self.call_precedence(function, target.is_some()),
            ExprKind::Comprehension(c) => match c.kind {
                ComprehensionKind::All => NOT_PRECEDENCE,
                ComprehensionKind::ExistsOne => COMPARISON_PRECEDENCE,
                _ => ATOM_PRECEDENCE,
            },
            _ => ATOM_PRECEDENCE,
        }
    }
}

fn is_test_only(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Select {
            test_only: true,
            ..
        }
    )
}

fn starts_with_minus(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Literal(Value::Int(n)) => *n < 0,
        ExprKind::Literal(Value::Double(n)) => n.is_sign_negative(),
        ExprKind::Unary {
            op: UnaryOp::Neg, ..
        } => true,
        _ => false,
    }
}

fn is_operand(expr: &Expr) -> Option<IsOperand> {
    if expr.is_null_literal() || is_zero_timestamp(expr) {
        return Some(IsOperand::Null);
    }
    expr.as_bool_literal().map(IsOperand::Bool)
}

/// `timestamp(0)` stands for a missing timestamp.
fn is_zero_timestamp(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Call {
            function,
            target: None,
            args,
        } if function == "timestamp" && args.len() == 1 => {
            matches!(args[0].as_literal(), Some(Value::Int(0)))
        }
        _ => false,
    }
}

fn is_temporal_arith(lhs: &Type, rhs: &Type) -> bool {
    (is_temporal_type(lhs) && is_duration_type(rhs)) || (is_duration_type(lhs) && is_temporal_type(rhs))
}

fn is_concatenation(ty: &Type) -> bool {
    is_string_or_bytes_type(ty) || is_list_type(ty)
}

fn struct_field_name(key: &Expr) -> CelSqlResult<&str> {
    match key.as_literal() {
        Some(Value::String(name)) if values::is_identifier(name) => Ok(name),
        Some(Value::String(name)) => Err(CelSqlError::InvalidIdentifier(name.clone())),
        _ => Err(CelSqlError::mismatch(format!(
            "struct field name must be a constant string, got {}",
            key
        ))),
    }
}

/// Whether a comprehension over `range` can read it as a table.
fn is_table_source(con: &Converter<'_>, range: &Expr) -> bool {
    match (&range.kind, &range.ty) {
        (ExprKind::Ident(name), Some(ty)) => !con.is_scoped(name) && is_object_list_type(ty),
        _ => false,
    }
}
