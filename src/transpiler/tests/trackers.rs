//! Value trackers, identifier trackers and custom extensions.

use super::{compile, env};
use crate::ast::{ATOM_PRECEDENCE, BinaryOp, Expr, Value};
use crate::checker::FunctionDecl;
use crate::error::{CelSqlError, CelSqlResult};
use crate::filters::FilterExtension;
use crate::transpiler::{
    Converter, ConvertOptions, Dialect, Extension, IdentTracker, NamedParams, PathSet, convert,
};
use crate::types::Type;
use pretty_assertions::assert_eq;
use serde_json::json;

fn with_params(source: &str, params: &mut NamedParams) -> String {
    let filters = FilterExtension::new();
    convert(
        &compile(source),
        ConvertOptions::new()
            .with_extension(&filters)
            .with_value_tracker(params),
    )
    .unwrap()
}

fn idents(source: &str) -> Vec<String> {
    let filters = FilterExtension::new();
    let mut paths = PathSet::new();
    convert(
        &compile(source),
        ConvertOptions::new()
            .with_extension(&filters)
            .with_ident_tracker(&mut paths),
    )
    .unwrap();
    paths.into_vec()
}

#[test]
fn test_named_params_are_shared_by_value() {
    let mut params = NamedParams::new();
    let sql = with_params(r#"name == "a" && age > 10 && name != "a""#, &mut params);
    assert_eq!(sql, "`name` = @p0 AND `age` > @p1 AND `name` != @p0");
    assert_eq!(params.len(), 2);
    assert_eq!(params.params()[0].value, Value::from("a"));
    assert_eq!(params.params()[1].value, Value::Int(10));
    assert_eq!(params.to_json(), json!({"p0": "a", "p1": 10}));
}

#[test]
fn test_named_params_keep_keywords_inline() {
    let mut params = NamedParams::new();
    let sql = with_params("[true, false, null]", &mut params);
    assert_eq!(sql, "[TRUE, FALSE, NULL]");
    assert!(params.is_empty());
}

#[test]
fn test_named_params_span_conversions() {
    let mut params = NamedParams::new();
    with_params(r#"name == "a""#, &mut params);
    let sql = with_params(r#"name == "b" || name == "a""#, &mut params);
    assert_eq!(sql, "`name` = @p1 OR `name` = @p0");
    assert_eq!(params.len(), 2);
}

#[test]
fn test_synthesized_patterns_are_parameters() {
    let mut params = NamedParams::new();
    let sql = with_params(r#"name.existsStarts(["a", "b"])"#, &mut params);
    assert_eq!(sql, "REGEXP_CONTAINS(`name`, @p0)");
    assert_eq!(params.params()[0].value, Value::from("^(a|b)"));
}

#[test]
fn test_inlining_params_restores_literal_sql() {
    let generator = Dialect::BigQuery.generator();
    for source in [
        r#"name.startsWith("a") && age >= 18"#,
        "[1, 2, 3][0] == 1",
        r#"{"one": 1, "two": 2}["two"] == 2"#,
        "-1",
        "height >= 1.6180339887",
        r#"nullable_bytes == b"hello""#,
        r#"created_at + interval(1, MONTH) > timestamp("2021-09-01T18:00:00Z")"#,
        r#"string_list.existsEquals(["a", "b", "c", "d"])"#,
        r#"pages.map(p, p.title == "x", p.id)"#,
    ] {
        let mut params = NamedParams::new();
        let named = with_params(source, &mut params);
        assert!(!params.is_empty(), "{}", source);
        let restored = params.inline(&named, generator.as_ref()).unwrap();
        let expected = convert(
            &compile(source),
            ConvertOptions::new().with_extension(&FilterExtension::new()),
        )
        .unwrap();
        assert_eq!(restored, expected, "{}", source);
    }
}

#[test]
fn test_ident_paths() {
    assert_eq!(idents(r#"page.title == "test""#), vec!["page.title"]);
    assert_eq!(idents("has(page.timestamp)"), vec!["page.timestamp"]);
    assert_eq!(
        idents("trigram.cell[0].page_count + 1"),
        vec![".page_count", "trigram.cell"]
    );
    assert_eq!(
        idents(r#"trigram.cell[0].sample[0].title + "test""#),
        vec![".sample", ".title", "trigram.cell"]
    );
    assert_eq!(
        idents(r#"string_int_map["one"] == age"#),
        vec!["age", "string_int_map"]
    );
}

#[test]
fn test_iteration_variables_are_rooted() {
    assert_eq!(idents("pages.map(p, p.title)"), vec![".title", "pages"]);
    assert_eq!(
        idents(r#"string_list.map(name, name + "!")"#),
        vec!["string_list"]
    );
    assert_eq!(
        idents(r#"trigram.cell.exists(c, c.value.exists(v, v == "x"))"#),
        vec![".value", "trigram.cell"]
    );
}

#[test]
fn test_untracked_names() {
    assert_eq!(idents("created_at.trunc(HOUR)"), vec!["created_at"]);
    assert!(idents(r#"{"one": 1}["one"] == 1"#).is_empty());
}

#[derive(Default)]
struct Recorder {
    calls: Vec<(bool, String)>,
}

impl IdentTracker for Recorder {
    fn add_ident_access(&mut self, root: Option<&Expr>, path: &[String]) -> Vec<String> {
        self.calls.push((root.is_some(), path.join(".")));
        path.iter().map(|p| p.to_uppercase()).collect()
    }
}

#[test]
fn test_ident_tracker_sees_every_access() {
    let mut recorder = Recorder::default();
    let sql = convert(
        &compile("page.title == page.title"),
        ConvertOptions::new().with_ident_tracker(&mut recorder),
    )
    .unwrap();
    assert_eq!(sql, "`page`.`title` = `page`.`title`");
    assert_eq!(
        recorder.calls,
        vec![
            (false, "page.title".to_string()),
            (false, "page.title".to_string())
        ]
    );
}

/// `scale(x)` as `(x * factor)`.
struct Scale {
    factor: i64,
}

impl Extension for Scale {
    fn implements_function(&self, function: &str) -> bool {
        function == "scale"
    }

    fn call_function(
        &self,
        con: &mut Converter<'_>,
        function: &str,
        _target: Option<&Expr>,
        args: &[Expr],
    ) -> CelSqlResult<()> {
        let [arg] = args else {
            return Err(CelSqlError::EmptyArguments(function.to_string()));
        };
        con.write_str("(");
        con.visit_operand(arg, BinaryOp::Mul.precedence())?;
        con.write_str(" * ");
        con.write_value(&Value::Int(self.factor))?;
        con.write_str(")");
        Ok(())
    }

    fn declarations(&self) -> Vec<FunctionDecl> {
        vec![FunctionDecl::new("scale").global("scale_int", vec![Type::Int], Type::Int)]
    }

    fn precedence(&self, _function: &str) -> u8 {
        ATOM_PRECEDENCE
    }
}

#[test]
fn test_first_registered_extension_wins() {
    let two = Scale { factor: 2 };
    let three = Scale { factor: 3 };
    let expr = env().with_extension(&two).compile("scale(age + 1) > 3").unwrap();

    let sql = convert(
        &expr,
        ConvertOptions::new().with_extension(&two).with_extension(&three),
    )
    .unwrap();
    assert_eq!(sql, "((`age` + 1) * 2) > 3");

    let sql = convert(
        &expr,
        ConvertOptions::new().with_extension(&three).with_extension(&two),
    )
    .unwrap();
    assert_eq!(sql, "((`age` + 1) * 3) > 3");
}

#[test]
fn test_extension_literals_are_tracked() {
    let scale = Scale { factor: 2 };
    let expr = env().with_extension(&scale).compile("scale(5)").unwrap();
    let mut params = NamedParams::new();
    let sql = convert(
        &expr,
        ConvertOptions::new()
            .with_extension(&scale)
            .with_value_tracker(&mut params),
    )
    .unwrap();
    assert_eq!(sql, "(@p0 * @p1)");
    assert_eq!(params.params()[1].value, Value::Int(2));
}

#[test]
fn test_unhandled_call_is_unsupported() {
    let scale = Scale { factor: 2 };
    let expr = env().with_extension(&scale).compile("scale(age)").unwrap();
    let err = convert(&expr, ConvertOptions::new()).unwrap_err();
    assert!(matches!(err, CelSqlError::Unsupported(_)));
}
