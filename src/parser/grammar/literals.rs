//! Literal parsing: numbers, strings, bytes, booleans and null.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit0, digit1, hex_digit1, one_of},
    combinator::{opt, recognize, value},
    multi::many_m_n,
    sequence::{pair, tuple},
};

use super::base::{PResult, SyntaxError, failure, keyword};
use crate::ast::Value;

pub fn parse_literal(input: &str) -> PResult<'_, Value> {
    alt((parse_keyword_literal, parse_string_literal, parse_number))(input)
}

fn parse_keyword_literal(input: &str) -> PResult<'_, Value> {
    alt((
        value(Value::Bool(true), keyword("true")),
        value(Value::Bool(false), keyword("false")),
        value(Value::Null, keyword("null")),
    ))(input)
}

/// Integers (decimal or `0x` hex, `u` suffix for unsigned) and doubles.
pub fn parse_number(input: &str) -> PResult<'_, Value> {
    if let Ok((rest, text)) = parse_float_text(input) {
        let n: f64 = text
            .parse()
            .map_err(|_| failure(input, format!("invalid double literal '{}'", text)))?;
        return Ok((rest, Value::Double(n)));
    }

    let (rest, (hex, digits)) = alt((
        pair(value(true, alt((tag("0x"), tag("0X")))), hex_digit1),
        pair(value(false, tag("")), digit1),
    ))(input)?;
    let (rest, unsigned) = opt(one_of("uU"))(rest)?;
    let radix = if hex { 16 } else { 10 };
    let out_of_range = |_| failure(input, format!("integer literal out of range: {}", digits));
    let value = if unsigned.is_some() {
        Value::Uint(u64::from_str_radix(digits, radix).map_err(out_of_range)?)
    } else {
        Value::Int(i64::from_str_radix(digits, radix).map_err(out_of_range)?)
    };
    Ok((rest, value))
}

fn parse_float_text(input: &str) -> PResult<'_, &str> {
    alt((
        recognize(tuple((digit0, char('.'), digit1, opt(exponent)))),
        recognize(pair(digit1, exponent)),
    ))(input)
}

fn exponent(input: &str) -> PResult<'_, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

/// Quoted string or bytes literal with optional `r` (raw) and `b`
/// (bytes) prefixes; single, double or triple quotes.
pub fn parse_string_literal(input: &str) -> PResult<'_, Value> {
    let (rest, prefix) = recognize(many_m_n(0, 2, one_of("rRbB")))(input)?;
    let raw = prefix.contains(['r', 'R']);
    let bytes = prefix.contains(['b', 'B']);
    if prefix.len() == 2 && !(raw && bytes) {
        return Err(nom::Err::Error(SyntaxError::new(input, "invalid literal prefix")));
    }
    let (rest, quote) = alt((tag("\"\"\""), tag("'''"), tag("\""), tag("'")))(rest)?;
    let (rest, content) = string_body(rest, quote, raw, bytes).map_err(nom::Err::Failure)?;
    if bytes {
        return Ok((rest, Value::Bytes(content)));
    }
    String::from_utf8(content)
        .map(|s| (rest, Value::String(s)))
        .map_err(|_| failure(input, "invalid UTF-8 in string literal"))
}

/// Decode up to the closing `quote`, returning the input after it.
fn string_body<'a>(
    input: &'a str,
    quote: &str,
    raw: bool,
    bytes: bool,
) -> Result<(&'a str, Vec<u8>), SyntaxError<'a>> {
    let multiline = quote.len() == 3;
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let rest = &input[pos..];
        if let Some(after) = rest.strip_prefix(quote) {
            return Ok((after, out));
        }
        let Some(c) = rest.chars().next() else {
            return Err(SyntaxError::new(rest, "unterminated string literal"));
        };
        if !multiline && (c == '\n' || c == '\r') {
            return Err(SyntaxError::new(rest, "newline in string literal"));
        }
        if c == '\\' && !raw {
            pos += 1 + unescape(&rest[1..], bytes, &mut out)?;
        } else {
            push_char(&mut out, c);
            pos += c.len_utf8();
        }
    }
}

/// Decode the escape sequence at the start of `rest` (just after the
/// backslash) into `out`; returns the number of bytes consumed.
fn unescape<'a>(rest: &'a str, bytes: bool, out: &mut Vec<u8>) -> Result<usize, SyntaxError<'a>> {
    let Some(c) = rest.chars().next() else {
        return Err(SyntaxError::new(rest, "unterminated escape sequence"));
    };
    let simple = match c {
        'a' => Some('\u{7}'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\u{b}'),
        '\\' | '\'' | '"' | '`' | '?' => Some(c),
        _ => None,
    };
    if let Some(ch) = simple {
        push_char(out, ch);
        return Ok(1);
    }

    let invalid = || SyntaxError::new(rest, format!("invalid escape sequence '\\{}'", c));
    let (digits, radix, len) = match c {
        'x' | 'X' => (&rest[1..], 16, 2),
        'u' => (&rest[1..], 16, 4),
        'U' => (&rest[1..], 16, 8),
        '0'..='3' => (rest, 8, 3),
        _ => return Err(invalid()),
    };
    let text = digits
        .get(..len)
        .filter(|t| t.chars().all(|d| d.is_digit(radix)))
        .ok_or_else(invalid)?;
    let code = u32::from_str_radix(text, radix).map_err(|_| invalid())?;
    let consumed = if radix == 8 { len } else { 1 + len };

    let byte_escape = matches!(c, 'x' | 'X') || radix == 8;
    if bytes && byte_escape {
        // \xHH and \ooo are raw octets in bytes literals
        out.push(code as u8);
    } else {
        push_char(out, char::from_u32(code).ok_or_else(invalid)?);
    }
    Ok(consumed)
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Leading `-` folded into a numeric literal.
pub fn negate(value: &Value) -> Option<Value> {
    match value {
        Value::Int(n) => n.checked_neg().map(Value::Int),
        Value::Double(n) => Some(Value::Double(-n)),
        _ => None,
    }
}
