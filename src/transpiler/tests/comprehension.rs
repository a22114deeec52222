//! Macro comprehensions lowered to subqueries.

use super::{to_sql, try_convert};
use crate::error::CelSqlError;
use crate::transpiler::Dialect;
use pretty_assertions::assert_eq;

#[test]
fn test_map_over_table() {
    assert_eq!(
        to_sql("pages.map(p, p.title)"),
        "ARRAY(SELECT `p`.`title` FROM `pages` AS `p`)"
    );
    assert_eq!(
        to_sql(r#"pages.map(p, p.language == "english", p.title)"#),
        r#"ARRAY(SELECT `p`.`title` FROM `pages` AS `p` WHERE `p`.`language` = "english")"#
    );
}

#[test]
fn test_map_distinct() {
    assert_eq!(
        to_sql("pages.mapDistinct(p, p.language)"),
        "ARRAY(SELECT DISTINCT `p`.`language` FROM `pages` AS `p`)"
    );
    assert_eq!(
        to_sql("pages.mapDistinct(p, p.is_redirect, p.language)"),
        "ARRAY(SELECT DISTINCT `p`.`language` FROM `pages` AS `p` WHERE `p`.`is_redirect`)"
    );
}

#[test]
fn test_filter_selects_the_variable() {
    assert_eq!(
        to_sql(r#"pages.filter(p, p.language == "english")"#),
        r#"ARRAY(SELECT `p` FROM `pages` AS `p` WHERE `p`.`language` = "english")"#
    );
}

#[test]
fn test_literal_ranges_are_unnested() {
    assert_eq!(
        to_sql(r#"["Title1", "Title2"].map(t, t + "!")"#),
        r#"ARRAY(SELECT `t` || "!" FROM UNNEST(["Title1", "Title2"]) AS `t`)"#
    );
    assert_eq!(
        to_sql(r#"string_list.exists(s, s.startsWith("a"))"#),
        r#"EXISTS (SELECT * FROM UNNEST(`string_list`) AS `s` WHERE STARTS_WITH(`s`, "a"))"#
    );
}

#[test]
fn test_quantifiers() {
    assert_eq!(
        to_sql("pages.exists(p, p.num_characters > 100)"),
        "EXISTS (SELECT * FROM `pages` AS `p` WHERE `p`.`num_characters` > 100)"
    );
    assert_eq!(
        to_sql(r#"string_list.all(s, s != "")"#),
        r#"NOT EXISTS (SELECT * FROM UNNEST(`string_list`) AS `s` WHERE NOT (`s` != ""))"#
    );
    assert_eq!(
        to_sql(r#"string_list.exists_one(s, s == "a")"#),
        r#"(SELECT COUNT(*) FROM UNNEST(`string_list`) AS `s` WHERE `s` = "a") = 1"#
    );
}

#[test]
fn test_nullable_elements() {
    assert_eq!(
        to_sql("nullable_strings.exists(x, x == null)"),
        "EXISTS (SELECT * FROM UNNEST(`nullable_strings`) AS `x` WHERE `x` IS NULL)"
    );
}

#[test]
fn test_comprehension_as_operand() {
    assert_eq!(
        to_sql("pages.all(p, p.is_redirect) && adult"),
        "NOT EXISTS (SELECT * FROM `pages` AS `p` WHERE NOT (`p`.`is_redirect`)) AND `adult`"
    );
    assert_eq!(
        to_sql(r#"string_list.exists_one(s, s == "a") == false"#),
        r#"((SELECT COUNT(*) FROM UNNEST(`string_list`) AS `s` WHERE `s` = "a") = 1) IS FALSE"#
    );
    assert_eq!(
        to_sql("size(pages.map(p, p.title)) > 1"),
        "ARRAY_LENGTH(ARRAY(SELECT `p`.`title` FROM `pages` AS `p`)) > 1"
    );
}

#[test]
fn test_nested_comprehensions() {
    assert_eq!(
        to_sql(r#"trigram.cell.exists(c, c.value.exists(v, v == "x"))"#),
        r#"EXISTS (SELECT * FROM UNNEST(`trigram`.`cell`) AS `c` WHERE EXISTS (SELECT * FROM UNNEST(`c`.`value`) AS `v` WHERE `v` = "x"))"#
    );
    assert_eq!(
        to_sql(r#"pages.map(p, p.title).filter(t, t != "")"#),
        r#"ARRAY(SELECT `t` FROM UNNEST(ARRAY(SELECT `p`.`title` FROM `pages` AS `p`)) AS `t` WHERE `t` != "")"#
    );
}

#[test]
fn test_iteration_variable_shadows_declaration() {
    assert_eq!(
        to_sql(r#"string_list.map(name, name + "!")"#),
        r#"ARRAY(SELECT `name` || "!" FROM UNNEST(`string_list`) AS `name`)"#
    );
}

#[test]
fn test_reserved_word_iteration_variable() {
    assert_eq!(
        to_sql(r#"string_list.exists(order, order == "a")"#),
        r#"EXISTS (SELECT * FROM UNNEST(`string_list`) AS `order` WHERE `order` = "a")"#
    );
    assert_eq!(
        to_sql("pages.filter(select, select.is_redirect)"),
        "ARRAY(SELECT `select` FROM `pages` AS `select` WHERE `select`.`is_redirect`)"
    );
}

#[test]
fn test_map_ranges_are_rejected() {
    for source in [
        r#"string_int_map.exists(k, k == "a")"#,
        r#"string_int_map.map(k, k + "!")"#,
        r#"{"a": 1}.all(k, k != "")"#,
    ] {
        let err = try_convert(source, Dialect::BigQuery).unwrap_err();
        assert!(matches!(err, CelSqlError::TypeMismatch(_)), "{} gave {:?}", source, err);
    }
}
