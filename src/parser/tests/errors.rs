use crate::error::CelSqlError;
use crate::parser::parse;

fn position(input: &str) -> usize {
    match parse(input) {
        Err(CelSqlError::Parse { position, .. }) => position,
        other => panic!("expected a parse error for {:?}, got {:?}", input, other),
    }
}

#[test]
fn test_trailing_content() {
    assert_eq!(position("a b"), 2);
    assert_eq!(position("a = b"), 2);
}

#[test]
fn test_missing_operand() {
    assert_eq!(position("1 +"), 3);
    assert_eq!(position("(1 + 2"), 6);
}

#[test]
fn test_unterminated_string() {
    assert_eq!(position("name == \"abc"), 12);
}

#[test]
fn test_message_names_the_problem() {
    let err = parse("xs.map(x.y, 1)").unwrap_err();
    assert!(err.to_string().contains("simple identifier"), "{}", err);
    let err = parse("has(a)").unwrap_err();
    assert!(err.to_string().contains("has()"), "{}", err);
    let err = parse("[1, 2").unwrap_err();
    assert!(err.to_string().contains("expected ']'"), "{}", err);
}

#[test]
fn test_reserved_words() {
    assert!(parse("if").is_err());
    assert!(parse("x.in").is_err());
}
