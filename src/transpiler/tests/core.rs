//! Operators, literals, indexing, casts and built-in string functions.

use super::{compile, to_sql, try_convert};
use crate::ast::builders::{binary, ident, int};
use crate::ast::BinaryOp;
use crate::error::CelSqlError;
use crate::transpiler::{ConvertOptions, Dialect, convert};
use pretty_assertions::assert_eq;

#[test]
fn test_string_functions() {
    assert_eq!(
        to_sql(r#"name.startsWith("a")"#),
        r#"STARTS_WITH(`name`, "a")"#
    );
    assert_eq!(to_sql(r#"name.endsWith("z")"#), r#"ENDS_WITH(`name`, "z")"#);
    assert_eq!(
        to_sql(r#"name.matches("a+")"#),
        r#"REGEXP_CONTAINS(`name`, "a+")"#
    );
    assert_eq!(
        to_sql(r#"matches(name, "a+")"#),
        r#"REGEXP_CONTAINS(`name`, "a+")"#
    );
    assert_eq!(
        to_sql(r#"name.contains("abc")"#),
        r#"STRPOS(`name`, "abc") != 0"#
    );
    assert_eq!(
        to_sql(r#"name.replace("a", "b") == "b""#),
        r#"REPLACE(`name`, "a", "b") = "b""#
    );
    assert_eq!(
        to_sql(r#"name.lowerAscii() == "a""#),
        r#"LOWER(`name`) = "a""#
    );
    assert_eq!(to_sql("name.trim().upperAscii()"), "UPPER(TRIM(`name`))");
}

#[test]
fn test_logical_operators() {
    assert_eq!(
        to_sql(r#"name.startsWith("a") && name.endsWith("z")"#),
        r#"STARTS_WITH(`name`, "a") AND ENDS_WITH(`name`, "z")"#
    );
    assert_eq!(
        to_sql(r#"name.startsWith("a") || name.endsWith("z")"#),
        r#"STARTS_WITH(`name`, "a") OR ENDS_WITH(`name`, "z")"#
    );
    assert_eq!(
        to_sql(r#"age >= 10 && (name.startsWith("a") || name.endsWith("z"))"#),
        r#"`age` >= 10 AND (STARTS_WITH(`name`, "a") OR ENDS_WITH(`name`, "z"))"#
    );
    assert_eq!(to_sql("!adult"), "NOT `adult`");
    assert_eq!(to_sql("!(age > 10 && adult)"), "NOT (`age` > 10 AND `adult`)");
    assert_eq!(to_sql("!(age > 10)"), "NOT `age` > 10");
}

#[test]
fn test_conditional() {
    assert_eq!(
        to_sql(r#"name == "a" ? "a" : "b""#),
        r#"IF(`name` = "a", "a", "b")"#
    );
}

#[test]
fn test_comparisons() {
    assert_eq!(to_sql(r#"name == "a""#), r#"`name` = "a""#);
    assert_eq!(to_sql("age != 20"), "`age` != 20");
    assert_eq!(to_sql("age < 20"), "`age` < 20");
    assert_eq!(to_sql("height >= 1.6180339887"), "`height` >= 1.6180339887");
    assert_eq!(to_sql("(age > 10) == adult"), "(`age` > 10) = `adult`");
    assert_eq!(to_sql("adult == (age > 10)"), "`adult` = (`age` > 10)");
}

#[test]
fn test_is_tests() {
    assert_eq!(to_sql("null_var == null"), "`null_var` IS NULL");
    assert_eq!(to_sql("null == name"), "`name` IS NULL");
    assert_eq!(to_sql("adult != true"), "`adult` IS NOT TRUE");
    assert_eq!(to_sql("adult == false"), "`adult` IS FALSE");
    assert_eq!(
        to_sql("(age > 10) == true"),
        "(`age` > 10) IS TRUE"
    );
}

#[test]
fn test_arithmetic() {
    assert_eq!(to_sql("-1"), "-1");
    assert_eq!(to_sql("1 + 2 == 3"), "1 + 2 = 3");
    assert_eq!(to_sql("5 % 3 == 2"), "MOD(5, 3) = 2");
    assert_eq!(to_sql("age + 1 * 2"), "`age` + 1 * 2");
    assert_eq!(to_sql("(age + 1) * 2"), "(`age` + 1) * 2");
    assert_eq!(to_sql("1 - 2 - 3"), "1 - 2 - 3");
    assert_eq!(to_sql("1 - (2 - 3)"), "1 - (2 - 3)");
    assert_eq!(to_sql("1 + (2 + 3)"), "1 + 2 + 3");
    assert_eq!(to_sql("-(age + 1)"), "-(`age` + 1)");
}

#[test]
fn test_negation_never_emits_a_comment() {
    assert_eq!(to_sql("--age"), "-(-`age`)");
    assert_eq!(to_sql("-(-age)"), "-(-`age`)");
    assert_eq!(to_sql("-(-1)"), "1");
}

#[test]
fn test_concatenation() {
    assert_eq!(to_sql(r#""a" + "b" == "ab""#), r#""a" || "b" = "ab""#);
    assert_eq!(
        to_sql(r#"string_list + ["a"]"#),
        r#"`string_list` || ["a"]"#
    );
    assert_eq!(
        to_sql(r#"nullable_bytes + b"hello""#),
        r#"`nullable_bytes` || b"\150\145\154\154\157""#
    );
}

#[test]
fn test_literals() {
    assert_eq!(to_sql(r#"name == "a\"b""#), r#"`name` = "a\"b""#);
    assert_eq!(
        to_sql(r#"nullable_bytes == b"hello""#),
        r#"`nullable_bytes` = b"\150\145\154\154\157""#
    );
    assert_eq!(to_sql("height == 2.0"), "`height` = 2.0");
    assert_eq!(to_sql("age == 42u"), "`age` = 42");
}

#[test]
fn test_nullable_values() {
    assert_eq!(
        to_sql(r#"nullable_string == "a""#),
        r#"`nullable_string` = "a""#
    );
    assert_eq!(to_sql("nullable_string == null"), "`nullable_string` IS NULL");
}

#[test]
fn test_lists() {
    assert_eq!(to_sql("[1, 2, 3][0] == 1"), "[1, 2, 3][OFFSET(0)] = 1");
    assert_eq!(
        to_sql(r#"string_list[1] == "b""#),
        r#"`string_list`[OFFSET(1)] = "b""#
    );
    assert_eq!(
        to_sql(r#"string_list.get(1) == "b""#),
        r#"`string_list`[SAFE_OFFSET(1)] = "b""#
    );
    assert_eq!(
        to_sql("name in string_list"),
        "`name` IN UNNEST(`string_list`)"
    );
    assert_eq!(
        to_sql("age + 1 in [1, 2]"),
        "`age` + 1 IN UNNEST([1, 2])"
    );
}

#[test]
fn test_maps_become_structs() {
    assert_eq!(
        to_sql(r#"{"one": 1, "two": 2, "three": 3}["one"] == 1"#),
        "STRUCT(1 AS one, 2 AS two, 3 AS three).`one` = 1"
    );
    assert_eq!(
        to_sql(r#"string_int_map["one"] == 1"#),
        "`string_int_map`.`one` = 1"
    );
    assert_eq!(
        to_sql("string_int_map.one == 1"),
        "`string_int_map`.`one` = 1"
    );
}

#[test]
fn test_invalid_map_keys() {
    let err = try_convert("{1: 1}[1] == 1", Dialect::BigQuery).unwrap_err();
    assert!(matches!(err, CelSqlError::TypeMismatch(_)));

    let err = try_convert(r#"{"one": 1}[name] == 1"#, Dialect::BigQuery).unwrap_err();
    assert!(matches!(err, CelSqlError::TypeMismatch(_)));

    let err = try_convert(r#"{"on e": 1}["on e"] == 1"#, Dialect::BigQuery).unwrap_err();
    assert!(matches!(err, CelSqlError::InvalidIdentifier(key) if key == "on e"));

    let err = try_convert(r#"string_int_map["on e"] == 1"#, Dialect::BigQuery).unwrap_err();
    assert!(matches!(err, CelSqlError::InvalidIdentifier(_)));
}

#[test]
fn test_map_membership_is_rejected() {
    let err = try_convert(r#""one" in string_int_map"#, Dialect::BigQuery).unwrap_err();
    assert!(matches!(err, CelSqlError::TypeMismatch(_)));
}

#[test]
fn test_casts() {
    assert_eq!(to_sql("bool(0) == false"), "CAST(0 AS BOOL) IS FALSE");
    assert_eq!(to_sql("int(true) == 1"), "CAST(TRUE AS INT64) = 1");
    assert_eq!(to_sql("double(age)"), "CAST(`age` AS FLOAT64)");
    assert_eq!(to_sql("uint(age)"), "CAST(`age` AS INT64)");
    assert_eq!(
        to_sql(r#"bytes("test")"#),
        r#"CAST("test" AS BYTES)"#
    );
    assert_eq!(to_sql("string(created_at)"), "CAST(`created_at` AS STRING)");
    assert_eq!(to_sql("int(created_at)"), "UNIX_SECONDS(`created_at`)");
}

#[test]
fn test_size() {
    assert_eq!(
        to_sql(r#"size("test")"#),
        r#"LENGTH("test")"#
    );
    assert_eq!(
        to_sql(r#"size(bytes("test"))"#),
        r#"LENGTH(CAST("test" AS BYTES))"#
    );
    assert_eq!(to_sql("size(string_list)"), "ARRAY_LENGTH(`string_list`)");
    assert_eq!(to_sql("string_list.size()"), "ARRAY_LENGTH(`string_list`)");
    assert_eq!(to_sql("size(nullable_bytes)"), "LENGTH(`nullable_bytes`)");

    let err = try_convert("size(string_int_map)", Dialect::BigQuery).unwrap_err();
    assert!(matches!(err, CelSqlError::TypeMismatch(_)));
}

#[test]
fn test_field_selection() {
    assert_eq!(to_sql(r#"page.title == "test""#), r#"`page`.`title` = "test""#);
    assert_eq!(
        to_sql("trigram.cell[0].page_count + 1"),
        "`trigram`.`cell`[OFFSET(0)].`page_count` + 1"
    );
    assert_eq!(
        to_sql(r#"trigram.cell[0].sample[0].title + "test""#),
        r#"`trigram`.`cell`[OFFSET(0)].`sample`[OFFSET(0)].`title` || "test""#
    );
    assert_eq!(
        to_sql(r#""test" in trigram.cell[0].value"#),
        r#""test" IN UNNEST(`trigram`.`cell`[OFFSET(0)].`value`)"#
    );
    assert_eq!(
        to_sql("trigram.cell.get(0).page_count + 1"),
        "`trigram`.`cell`[SAFE_OFFSET(0)].`page_count` + 1"
    );
}

#[test]
fn test_has_macro() {
    assert_eq!(to_sql("has(page.title)"), "`page`.`title` IS NOT NULL");
    assert_eq!(
        to_sql("!has(page.timestamp) && adult"),
        "NOT `page`.`timestamp` IS NOT NULL AND `adult`"
    );
}

#[test]
fn test_untyped_tree_is_rejected() {
    let expr = binary(ident("age"), BinaryOp::Add, int(1));
    let err = convert(&expr, ConvertOptions::new()).unwrap_err();
    assert!(matches!(err, CelSqlError::MissingType(_)));
}

#[test]
fn test_checked_tree_is_reusable() {
    let expr = compile("age > 10");
    let first = convert(&expr, ConvertOptions::new()).unwrap();
    let second = convert(&expr, ConvertOptions::new().with_dialect(Dialect::Spanner)).unwrap();
    assert_eq!(first, "`age` > 10");
    assert_eq!(first, second);
}
