//! Literal rendering policies.
//!
//! A [`ValueTracker`] decides how a literal reaches the SQL text: spelled
//! inline, or replaced by a named parameter whose value the caller binds
//! when executing the statement.

use std::fmt::Write;

use serde_json::json;
use tracing::trace;

use crate::ast::Value;
use crate::error::{CelSqlError, CelSqlResult};
use crate::transpiler::traits::SqlGenerator;

/// Turns a literal into the text spliced into the SQL fragment.
pub trait ValueTracker {
    fn add_value(&mut self, value: &Value, generator: &dyn SqlGenerator) -> CelSqlResult<String>;
}

impl<T: ValueTracker + ?Sized> ValueTracker for &mut T {
    fn add_value(&mut self, value: &Value, generator: &dyn SqlGenerator) -> CelSqlResult<String> {
        (**self).add_value(value, generator)
    }
}

/// Renders every literal inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineValues;

impl ValueTracker for InlineValues {
    fn add_value(&mut self, value: &Value, _generator: &dyn SqlGenerator) -> CelSqlResult<String> {
        value_to_sql(value)
    }
}

/// A tracked `(name, value)` binding.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedParam {
    pub name: String,
    pub value: Value,
}

/// Replaces literals with named parameters, one per distinct value.
///
/// `NULL`, `TRUE` and `FALSE` stay inline. Reusing one tracker across
/// several conversions shares the bindings between them.
#[derive(Debug, Default, Clone)]
pub struct NamedParams {
    params: Vec<NamedParam>,
}

impl NamedParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings in the order they were minted.
    pub fn params(&self) -> &[NamedParam] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Substitute every parameter reference in `sql` with its inline rendering.
    ///
    /// Later names are replaced first so that `@p1` never clobbers `@p10`.
    pub fn inline(&self, sql: &str, generator: &dyn SqlGenerator) -> CelSqlResult<String> {
        let mut out = sql.to_string();
        for param in self.params.iter().rev() {
            let reference = generator.named_parameter(&param.name);
            out = out.replace(&reference, &value_to_sql(&param.value)?);
        }
        Ok(out)
    }

    /// Bindings as a JSON object, in minting order.
    pub fn to_json(&self) -> serde_json::Value {
        let bindings: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.value.to_json()))
            .collect();
        json!(bindings)
    }
}

impl ValueTracker for NamedParams {
    fn add_value(&mut self, value: &Value, generator: &dyn SqlGenerator) -> CelSqlResult<String> {
        if matches!(value, Value::Null | Value::Bool(_)) {
            return value_to_sql(value);
        }
        if let Some(existing) = self.params.iter().find(|p| &p.value == value) {
            return Ok(generator.named_parameter(&existing.name));
        }
        let name = format!("p{}", self.params.len());
        trace!(name = %name, value = %value, "tracked parameter");
        let reference = generator.named_parameter(&name);
        self.params.push(NamedParam {
            name,
            value: value.clone(),
        });
        Ok(reference)
    }
}

/// Render a value as a GoogleSQL literal.
pub fn value_to_sql(value: &Value) -> CelSqlResult<String> {
    Ok(match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Uint(n) => n.to_string(),
        Value::Double(n) if n.is_nan() => "CAST(\"nan\" AS FLOAT64)".to_string(),
        Value::Double(n) if n.is_infinite() => {
            let sign = if *n < 0.0 { "-" } else { "" };
            format!("CAST(\"{}inf\" AS FLOAT64)", sign)
        }
        Value::Double(n) => format!("{:?}", n),
        Value::String(s) => quote_string(s),
        Value::Bytes(b) => quote_bytes(b),
        Value::List(items) => {
            let items = items
                .iter()
                .map(value_to_sql)
                .collect::<CelSqlResult<Vec<_>>>()?;
            format!("[{}]", items.join(", "))
        }
        Value::Map(entries) => {
            let mut fields = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    Value::String(k) => k,
                    other => {
                        return Err(CelSqlError::mismatch(format!(
                            "struct field name must be a string, got {}",
                            other
                        )));
                    }
                };
                if !is_identifier(key) {
                    return Err(CelSqlError::InvalidIdentifier(key.clone()));
                }
                fields.push(format!("{} AS {}", value_to_sql(value)?, key));
            }
            format!("STRUCT({})", fields.join(", "))
        }
    })
}

/// Double-quoted string literal with backslash escapes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Bytes literal with every byte as a three-digit octal escape.
pub fn quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4 + 3);
    out.push_str("b\"");
    for byte in bytes {
        let _ = write!(out, "\\{:03o}", byte);
    }
    out.push('"');
    out
}

/// Whether `name` can appear as an unquoted GoogleSQL identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::Dialect;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_string_escapes() {
        assert_eq!(quote_string("a\"b"), r#""a\"b""#);
        assert_eq!(quote_string("\x00"), r#""\x00""#);
        assert_eq!(quote_string("tab\there"), r#""tab\there""#);
        assert_eq!(quote_string("back\\slash"), r#""back\\slash""#);
    }

    #[test]
    fn test_quote_bytes_is_octal() {
        assert_eq!(quote_bytes(b"hello"), r#"b"\150\145\154\154\157""#);
    }

    #[test]
    fn test_double_rendering() {
        assert_eq!(value_to_sql(&Value::Double(1.6180339887)).unwrap(), "1.6180339887");
        assert_eq!(value_to_sql(&Value::Double(2.0)).unwrap(), "2.0");
        assert_eq!(
            value_to_sql(&Value::Double(f64::NEG_INFINITY)).unwrap(),
            "CAST(\"-inf\" AS FLOAT64)"
        );
    }

    #[test]
    fn test_struct_rendering() {
        let map = Value::Map(vec![("one".into(), Value::Int(1)), ("two".into(), Value::Int(2))]);
        assert_eq!(value_to_sql(&map).unwrap(), "STRUCT(1 AS one, 2 AS two)");

        let bad = Value::Map(vec![("on e".into(), Value::Int(1))]);
        assert!(matches!(
            value_to_sql(&bad),
            Err(CelSqlError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_named_params_deduplicate() {
        let generator = Dialect::BigQuery.generator();
        let mut params = NamedParams::new();
        let a = params.add_value(&"x".into(), generator.as_ref()).unwrap();
        let b = params.add_value(&Value::Int(1), generator.as_ref()).unwrap();
        let c = params.add_value(&"x".into(), generator.as_ref()).unwrap();
        assert_eq!(a, "@p0");
        assert_eq!(b, "@p1");
        assert_eq!(c, a);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_named_params_keep_null_and_bools_inline() {
        let generator = Dialect::BigQuery.generator();
        let mut params = NamedParams::new();
        assert_eq!(params.add_value(&Value::Null, generator.as_ref()).unwrap(), "NULL");
        assert_eq!(params.add_value(&Value::Bool(true), generator.as_ref()).unwrap(), "TRUE");
        assert!(params.is_empty());
    }

    #[test]
    fn test_inline_replaces_longest_names_first() {
        let generator = Dialect::BigQuery.generator();
        let mut params = NamedParams::new();
        for n in 0..11 {
            params.add_value(&Value::Int(n * 100), generator.as_ref()).unwrap();
        }
        let sql = "@p1 + @p10";
        assert_eq!(params.inline(sql, generator.as_ref()).unwrap(), "100 + 1000");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("one"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("on e"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
    }
}
