//! Built-in function translation and extension dispatch.

use tracing::debug;

use crate::ast::{ATOM_PRECEDENCE, BinaryOp, COMPARISON_PRECEDENCE, Expr, Value};
use crate::error::{CelSqlError, CelSqlResult};
use crate::transpiler::Converter;
use crate::transpiler::temporal;
use crate::types::{
    Type, is_list_type, is_string_or_bytes_type, is_timestamp_type, temporal_prefix,
};

/// How a built-in call is spelled in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    /// `NAME(target, args...)`
    Function(&'static str),
    /// `STRPOS(target, arg) != 0`
    Contains,
    Size,
    /// `CAST(x AS T)`
    Cast(&'static str),
    /// `int(timestamp)`
    UnixSeconds,
    /// `DATE(...)`, `TIMESTAMP(...)`
    Constructor(&'static str),
    Duration,
    Interval,
    /// `EXTRACT(UNIT FROM target)`, minus one for zero-based fields.
    Accessor {
        unit: &'static str,
        zero_based: bool,
    },
    Trunc,
}

fn builtin(function: &str, has_target: bool) -> Option<Builtin> {
    let b = match (function, has_target) {
        ("startsWith", true) => Builtin::Function("STARTS_WITH"),
        ("endsWith", true) => Builtin::Function("ENDS_WITH"),
        ("matches", _) => Builtin::Function("REGEXP_CONTAINS"),
        ("contains", true) => Builtin::Contains,
        ("replace", true) => Builtin::Function("REPLACE"),
        ("lowerAscii", true) => Builtin::Function("LOWER"),
        ("upperAscii", true) => Builtin::Function("UPPER"),
        ("trim", true) => Builtin::Function("TRIM"),
        ("size", _) => Builtin::Size,
        ("bool", false) => Builtin::Cast("BOOL"),
        ("int", false) => Builtin::Cast("INT64"),
        ("uint", false) => Builtin::Cast("INT64"),
        ("double", false) => Builtin::Cast("FLOAT64"),
        ("string", false) => Builtin::Cast("STRING"),
        ("bytes", false) => Builtin::Cast("BYTES"),
        ("date", false) => Builtin::Constructor("DATE"),
        ("time", false) => Builtin::Constructor("TIME"),
        ("datetime", false) => Builtin::Constructor("DATETIME"),
        ("timestamp", false) => Builtin::Constructor("TIMESTAMP"),
        ("current_date", false) => Builtin::Function("CURRENT_DATE"),
        ("current_time", false) => Builtin::Function("CURRENT_TIME"),
        ("current_datetime", false) => Builtin::Function("CURRENT_DATETIME"),
        ("current_timestamp", false) => Builtin::Function("CURRENT_TIMESTAMP"),
        ("duration", false) => Builtin::Duration,
        ("interval", false) => Builtin::Interval,
        ("trunc", true) => Builtin::Trunc,
        (name, true) => {
            let (unit, zero_based) = accessor(name)?;
            Builtin::Accessor { unit, zero_based }
        }
        _ => return None,
    };
    Some(b)
}

/// `EXTRACT` unit of a date/time accessor and whether the expression
/// language counts that field from zero.
fn accessor(function: &str) -> Option<(&'static str, bool)> {
    let unit = match function {
        "getFullYear" => ("YEAR", false),
        "getMonth" => ("MONTH", true),
        "getDayOfMonth" => ("DAY", true),
        "getDate" => ("DAY", false),
        "getDayOfWeek" => ("DAYOFWEEK", true),
        "getDayOfYear" => ("DAYOFYEAR", true),
        "getHours" => ("HOUR", false),
        "getMinutes" => ("MINUTE", false),
        "getSeconds" => ("SECOND", false),
        "getMilliseconds" => ("MILLISECOND", false),
        _ => return None,
    };
    Some(unit)
}

/// Whether `function` is a date/time field accessor such as `getHours`.
pub fn is_accessor(function: &str) -> bool {
    accessor(function).is_some()
}

/// Names of the functions translated without an extension.
pub fn builtin_functions() -> &'static [&'static str] {
    &[
        "startsWith",
        "endsWith",
        "matches",
        "contains",
        "replace",
        "lowerAscii",
        "upperAscii",
        "trim",
        "size",
        "bool",
        "int",
        "uint",
        "double",
        "string",
        "bytes",
        "date",
        "time",
        "datetime",
        "timestamp",
        "current_date",
        "current_time",
        "current_datetime",
        "current_timestamp",
        "duration",
        "interval",
        "trunc",
        "getFullYear",
        "getMonth",
        "getDayOfMonth",
        "getDate",
        "getDayOfWeek",
        "getDayOfYear",
        "getHours",
        "getMinutes",
        "getSeconds",
        "getMilliseconds",
    ]
}

impl Converter<'_> {
    pub(super) fn visit_call(
        &mut self,
        function: &str,
        target: Option<&Expr>,
        args: &[Expr],
    ) -> CelSqlResult<()> {
        if let Some(b) = builtin(function, target.is_some()) {
            return self.visit_builtin(b, function, target, args);
        }
        let extension = self
            .extensions
            .iter()
            .copied()
            .find(|ext| ext.implements_function(function));
        match extension {
            Some(ext) => {
                debug!(function, "delegating call to extension");
                ext.call_function(self, function, target, args)
            }
            None => Err(CelSqlError::unsupported(format!("function '{}'", function))),
        }
    }

    pub(super) fn call_precedence(&self, function: &str, has_target: bool) -> u8 {
        match builtin(function, has_target) {
            Some(Builtin::Contains) => COMPARISON_PRECEDENCE,
            Some(Builtin::Accessor {
                zero_based: true, ..
            }) => BinaryOp::Sub.precedence(),
            Some(_) => ATOM_PRECEDENCE,
            None => self
                .extensions
                .iter()
                .find(|ext| ext.implements_function(function))
                .map_or(ATOM_PRECEDENCE, |ext| ext.precedence(function)),
        }
    }

    fn visit_builtin(
        &mut self,
        b: Builtin,
        function: &str,
        target: Option<&Expr>,
        args: &[Expr],
    ) -> CelSqlResult<()> {
        match b {
            Builtin::Function(name) => {
                self.write_str(name);
                self.write_str("(");
                if let Some(target) = target {
                    self.visit(target)?;
                    if !args.is_empty() {
                        self.write_str(", ");
                    }
                }
                self.visit_list(args)?;
                self.write_str(")");
                Ok(())
            }
            Builtin::Contains => {
                let arg = single_arg(function, args)?;
                self.write_str("STRPOS(");
                self.visit(required_target(function, target)?)?;
                self.write_str(", ");
                self.visit(arg)?;
                self.write_str(") != 0");
                Ok(())
            }
            Builtin::Size => {
                let operand = match target {
                    Some(target) if args.is_empty() => target,
                    None => single_arg(function, args)?,
                    Some(_) => return Err(arity(function, 0, args.len())),
                };
                let ty = self.get_type(operand)?;
                let name = if is_string_or_bytes_type(ty) {
                    "LENGTH("
                } else if is_list_type(ty) {
                    "ARRAY_LENGTH("
                } else {
                    return Err(CelSqlError::mismatch(format!("size() of {}", ty)));
                };
                self.write_str(name);
                self.visit(operand)?;
                self.write_str(")");
                Ok(())
            }
            Builtin::Cast(sql_type) => {
                let arg = single_arg(function, args)?;
                if function == "int" && is_timestamp_type(self.get_type(arg)?) {
                    return self.visit_builtin(Builtin::UnixSeconds, function, target, args);
                }
                self.write_str("CAST(");
                self.visit(arg)?;
                self.write_str(" AS ");
                self.write_str(sql_type);
                self.write_str(")");
                Ok(())
            }
            Builtin::UnixSeconds => {
                self.write_str("UNIX_SECONDS(");
                self.visit(single_arg(function, args)?)?;
                self.write_str(")");
                Ok(())
            }
            Builtin::Constructor(name) => {
                let seconds = name == "TIMESTAMP"
                    && args.len() == 1
                    && matches!(self.get_type(&args[0])?.unwrapped(), Type::Int);
                self.write_str(if seconds { "TIMESTAMP_SECONDS" } else { name });
                self.write_str("(");
                self.visit_list(args)?;
                self.write_str(")");
                Ok(())
            }
            Builtin::Duration => {
                let arg = single_arg(function, args)?;
                let literal = match arg.as_literal() {
                    Some(Value::String(s)) => s,
                    _ => {
                        return Err(CelSqlError::mismatch(
                            "duration() requires a constant string",
                        ));
                    }
                };
                let delta = temporal::parse_duration(literal)?;
                let (count, unit) = temporal::interval_parts(delta)?;
                self.write_str(&format!("INTERVAL {} {}", count, unit));
                Ok(())
            }
            Builtin::Interval => {
                let [count, part] = args else {
                    return Err(arity(function, 2, args.len()));
                };
                self.write_str("INTERVAL ");
                self.visit_operand(count, ATOM_PRECEDENCE)?;
                self.write_str(" ");
                self.visit(part)?;
                Ok(())
            }
            Builtin::Accessor { unit, zero_based } => {
                let target = required_target(function, target)?;
                if args.len() > 1 {
                    return Err(arity(function, 1, args.len()));
                }
                self.write_str("EXTRACT(");
                self.write_str(unit);
                self.write_str(" FROM ");
                self.visit_operand(target, ATOM_PRECEDENCE)?;
                if let Some(zone) = args.first() {
                    self.write_str(" AT ");
                    self.visit(zone)?;
                }
                self.write_str(")");
                if zero_based {
                    self.write_str(" - 1");
                }
                Ok(())
            }
            Builtin::Trunc => {
                let target = required_target(function, target)?;
                let part = single_arg(function, args)?;
                let ty = self.get_type(target)?;
                let prefix = temporal_prefix(ty.unwrapped())
                    .ok_or_else(|| CelSqlError::mismatch(format!("trunc() of {}", ty)))?;
                self.write_str(prefix);
                self.write_str("_TRUNC(");
                self.visit(target)?;
                self.write_str(", ");
                self.visit(part)?;
                self.write_str(")");
                Ok(())
            }
        }
    }
}

fn single_arg<'e>(function: &str, args: &'e [Expr]) -> CelSqlResult<&'e Expr> {
    match args {
        [arg] => Ok(arg),
        _ => Err(arity(function, 1, args.len())),
    }
}

fn required_target<'e>(function: &str, target: Option<&'e Expr>) -> CelSqlResult<&'e Expr> {
    target.ok_or_else(|| CelSqlError::unsupported(format!("global call to '{}'", function)))
}

fn arity(function: &str, expected: usize, got: usize) -> CelSqlError {
    CelSqlError::mismatch(format!(
        "{}() takes {} argument(s), got {}",
        function, expected, got
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_respects_call_style() {
        assert_eq!(builtin("startsWith", true), Some(Builtin::Function("STARTS_WITH")));
        assert_eq!(builtin("startsWith", false), None);
        assert_eq!(builtin("int", false), Some(Builtin::Cast("INT64")));
        assert_eq!(builtin("int", true), None);
        assert_eq!(
            builtin("getMonth", true),
            Some(Builtin::Accessor {
                unit: "MONTH",
                zero_based: true
            })
        );
        assert_eq!(builtin("existsEquals", true), None);
    }

    #[test]
    fn test_builtin_list_matches_lookup() {
        for name in builtin_functions() {
            assert!(
                builtin(name, true).is_some() || builtin(name, false).is_some(),
                "{} has no translation",
                name
            );
        }
    }
}
