//! Macro comprehensions as correlated subqueries.
//!
//! | macro | SQL |
//! |---|---|
//! | `map` | `ARRAY(SELECT r FROM src AS v [WHERE p])` |
//! | `mapDistinct` | `ARRAY(SELECT DISTINCT r FROM src AS v [WHERE p])` |
//! | `filter` | `ARRAY(SELECT v FROM src AS v WHERE p)` |
//! | `exists` | `EXISTS (SELECT * FROM src AS v WHERE p)` |
//! | `all` | `NOT EXISTS (SELECT * FROM src AS v WHERE NOT (p))` |
//! | `exists_one` | `(SELECT COUNT(*) FROM src AS v WHERE p) = 1` |
//!
//! `src` is the bare variable when the range is a list-of-records variable
//! (a table), and `UNNEST(range)` otherwise. Map ranges are rejected. The
//! iteration variable is quoted like any other identifier.

use crate::ast::{Comprehension, ComprehensionKind, Expr};
use crate::error::{CelSqlError, CelSqlResult};
use crate::transpiler::{Converter, is_table_source};
use crate::types::is_map_type;

impl Converter<'_> {
    pub(super) fn visit_comprehension(&mut self, c: &Comprehension) -> CelSqlResult<()> {
        match c.kind {
            ComprehensionKind::Map | ComprehensionKind::MapDistinct => {
                let result = c.result.as_ref().ok_or_else(|| {
                    CelSqlError::mismatch(format!("{} without a result", c.kind.macro_name()))
                })?;
                self.write_str("ARRAY(SELECT ");
                if c.kind == ComprehensionKind::MapDistinct {
                    self.write_str("DISTINCT ");
                }
                self.scoped(&c.iter_var, |con| con.visit(result))?;
                self.write_source(c)?;
                if let Some(predicate) = &c.predicate {
                    self.write_where(c, predicate)?;
                }
                self.write_str(")");
            }
            ComprehensionKind::Filter => {
                self.write_str("ARRAY(SELECT ");
                self.write_identifier(&c.iter_var);
                self.write_source(c)?;
                self.write_where(c, required_predicate(c)?)?;
                self.write_str(")");
            }
            ComprehensionKind::Exists => {
                self.write_str("EXISTS (SELECT *");
                self.write_source(c)?;
                self.write_where(c, required_predicate(c)?)?;
                self.write_str(")");
            }
            ComprehensionKind::All => {
                let predicate = required_predicate(c)?;
                self.write_str("NOT EXISTS (SELECT *");
                self.write_source(c)?;
                self.write_str(" WHERE NOT (");
                self.scoped(&c.iter_var, |con| con.visit(predicate))?;
                self.write_str("))");
            }
            ComprehensionKind::ExistsOne => {
                self.write_str("(SELECT COUNT(*)");
                self.write_source(c)?;
                self.write_where(c, required_predicate(c)?)?;
                self.write_str(") = 1");
            }
        }
        Ok(())
    }

    /// ` FROM <src> AS <v>`; the range is evaluated outside the new scope.
    fn write_source(&mut self, c: &Comprehension) -> CelSqlResult<()> {
        let range_ty = self.get_type(&c.range)?;
        if is_map_type(range_ty.unwrapped()) {
            return Err(CelSqlError::mismatch(format!(
                "{} cannot range over {}",
                c.kind.macro_name(),
                range_ty
            )));
        }
        self.write_str(" FROM ");
        if is_table_source(self, &c.range) {
            self.visit(&c.range)?;
        } else {
            self.write_str("UNNEST(");
            self.visit(&c.range)?;
            self.write_str(")");
        }
        self.write_str(" AS ");
        self.write_identifier(&c.iter_var);
        Ok(())
    }

    fn write_where(&mut self, c: &Comprehension, predicate: &Expr) -> CelSqlResult<()> {
        self.write_str(" WHERE ");
        self.scoped(&c.iter_var, |con| con.visit(predicate))
    }

    /// Run `f` with `var` bound as an iteration variable.
    fn scoped<T>(
        &mut self,
        var: &str,
        f: impl FnOnce(&mut Self) -> CelSqlResult<T>,
    ) -> CelSqlResult<T> {
        self.scopes.push(var.to_string());
        let result = f(self);
        self.scopes.pop();
        result
    }
}

fn required_predicate(c: &Comprehension) -> CelSqlResult<&Expr> {
    c.predicate.as_ref().ok_or_else(|| {
        CelSqlError::mismatch(format!("{} without a predicate", c.kind.macro_name()))
    })
}
