//! Shared lexical pieces: whitespace, identifiers, keywords and the
//! parser error type.

use std::fmt;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, multispace1, not_line_ending, satisfy},
    combinator::{cut, not, recognize, value},
    error::{ErrorKind, FromExternalError, ParseError},
    multi::many0,
    sequence::{delimited, pair, terminated},
};

/// Words that can not name a variable or field.
const RESERVED: [&str; 19] = [
    "as", "break", "const", "continue", "else", "false", "for", "function", "if", "import",
    "in", "let", "loop", "package", "namespace", "null", "return", "true", "var",
];

/// Parse failure carrying the input at which it occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError<'a> {
    pub input: &'a str,
    pub message: String,
}

pub type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

impl<'a> SyntaxError<'a> {
    pub fn new(input: &'a str, message: impl Into<String>) -> Self {
        Self {
            input,
            message: message.into(),
        }
    }
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        let message = match input.chars().next() {
            Some(c) => format!("unexpected '{}'", c),
            None => "unexpected end of input".to_string(),
        };
        Self::new(input, message)
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn from_char(input: &'a str, c: char) -> Self {
        Self::new(input, format!("expected '{}'", c))
    }

    /// Keep the alternative that got furthest.
    fn or(self, other: Self) -> Self {
        if other.input.len() <= self.input.len() {
            other
        } else {
            self
        }
    }
}

impl<'a, E: fmt::Display> FromExternalError<&'a str, E> for SyntaxError<'a> {
    fn from_external_error(input: &'a str, _kind: ErrorKind, e: E) -> Self {
        Self::new(input, e.to_string())
    }
}

/// Fatal error at `input`.
pub fn failure<'a>(input: &'a str, message: impl Into<String>) -> nom::Err<SyntaxError<'a>> {
    nom::Err::Failure(SyntaxError::new(input, message))
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whitespace and `//` line comments.
pub fn sp(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("//"), not_line_ending)),
        ))),
    )(input)
}

/// `c` with surrounding whitespace.
pub fn sym<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    delimited(sp, char(c), sp)
}

/// `c`, or a fatal error.
pub fn expect<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    cut(char(c))
}

/// `word` not followed by an identifier character.
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

/// A variable, field or function name.
pub fn identifier(input: &str) -> PResult<'_, &str> {
    let (rest, name) = recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)?;
    if RESERVED.iter().any(|word| *word == name) {
        return Err(nom::Err::Error(SyntaxError::new(
            input,
            format!("reserved word '{}'", name),
        )));
    }
    Ok((rest, name))
}
