//! Resolved expression types and the predicates that classify them.
//!
//! Every node handed to the converter carries one of these. The predicates
//! are what the converter and its extensions dispatch on; wrapper types
//! (nullable primitives) classify the same as the primitive they wrap.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, value},
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};

use crate::error::CelSqlError;

/// A resolved expression type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Timestamp,
    Date,
    Time,
    DateTime,
    Duration,
    Interval,
    /// Calendar unit constant such as `DAY` or `HOUR`.
    DatePart,
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
    /// Nullable primitive.
    Wrapper(Box<Type>),
    /// Record type, named after the table (or nested record) it describes.
    Object(String),
    Dyn,
}

impl Type {
    pub fn list(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn wrapper(inner: Type) -> Self {
        Type::Wrapper(Box::new(inner))
    }

    pub fn object(name: impl Into<String>) -> Self {
        Type::Object(name.into())
    }

    /// Strip one level of wrapper, if any.
    pub fn unwrapped(&self) -> &Type {
        match self {
            Type::Wrapper(inner) => inner,
            other => other,
        }
    }

    /// Element type of a list, `Dyn` for anything else.
    pub fn elem_type(&self) -> Type {
        match self {
            Type::List(elem) => (**elem).clone(),
            _ => Type::Dyn,
        }
    }

    /// Whether a value of type `other` may be passed where `self` is expected.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Dyn, _) | (_, Type::Dyn) => true,
            (Type::Wrapper(_), Type::Null) => true,
            (Type::Wrapper(a), b) => a.is_assignable_from(b),
            (a, Type::Wrapper(b)) => a.is_assignable_from(b),
            (Type::List(a), Type::List(b)) => a.is_assignable_from(b),
            (Type::Map(ak, av), Type::Map(bk, bv)) => {
                ak.is_assignable_from(bk) && av.is_assignable_from(bv)
            }
            (Type::Duration, Type::Interval) | (Type::Interval, Type::Duration) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Uint => write!(f, "uint"),
            Type::Double => write!(f, "double"),
            Type::String => write!(f, "string"),
            Type::Bytes => write!(f, "bytes"),
            Type::Timestamp => write!(f, "timestamp"),
            Type::Date => write!(f, "date"),
            Type::Time => write!(f, "time"),
            Type::DateTime => write!(f, "datetime"),
            Type::Duration => write!(f, "duration"),
            Type::Interval => write!(f, "interval"),
            Type::DatePart => write!(f, "date_part"),
            Type::List(elem) => write!(f, "list<{}>", elem),
            Type::Map(k, v) => write!(f, "map<{}, {}>", k, v),
            Type::Wrapper(inner) => write!(f, "wrapper<{}>", inner),
            Type::Object(name) => write!(f, "object<{}>", name),
            Type::Dyn => write!(f, "dyn"),
        }
    }
}

impl FromStr for Type {
    type Err = CelSqlError;

    /// Parse a type spec such as `list<wrapper<string>>` or `object<wikipedia>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match all_consuming(delimited(multispace0, parse_type, multispace0))(s) {
            Ok((_, ty)) => Ok(ty),
            Err(e) => Err(CelSqlError::Config(format!(
                "invalid type spec '{}': {:?}",
                s, e
            ))),
        }
    }
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn parse_type(input: &str) -> IResult<&str, Type> {
    alt((
        map(
            preceded(tag("list"), delimited(ws(char('<')), parse_type, ws(char('>')))),
            Type::list,
        ),
        map(
            preceded(
                tag("map"),
                delimited(
                    ws(char('<')),
                    separated_pair(parse_type, ws(char(',')), parse_type),
                    ws(char('>')),
                ),
            ),
            |(k, v)| Type::map(k, v),
        ),
        map(
            preceded(tag("wrapper"), delimited(ws(char('<')), parse_type, ws(char('>')))),
            Type::wrapper,
        ),
        map(
            preceded(
                tag("object"),
                delimited(
                    ws(char('<')),
                    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
                    ws(char('>')),
                ),
            ),
            Type::object,
        ),
        parse_primitive,
    ))(input)
}

fn parse_primitive(input: &str) -> IResult<&str, Type> {
    let (input, ty) = alt((
        value(Type::Timestamp, tag("timestamp")),
        value(Type::DateTime, tag("datetime")),
        value(Type::DatePart, tag("date_part")),
        value(Type::Date, tag("date")),
        value(Type::Time, tag("time")),
        value(Type::Duration, tag("duration")),
        value(Type::Interval, tag("interval")),
        value(Type::String, tag("string")),
        value(Type::Bytes, tag("bytes")),
        value(Type::Bool, tag("bool")),
        value(Type::Int, tag("int")),
        value(Type::Uint, tag("uint")),
        value(Type::Double, tag("double")),
        value(Type::Null, tag("null")),
        value(Type::Dyn, tag("dyn")),
    ))(input)?;
    // `string?` is shorthand for `wrapper<string>`.
    let (input, nullable) = nom::combinator::opt(tuple((multispace0, char('?'))))(input)?;
    Ok((input, if nullable.is_some() { Type::wrapper(ty) } else { ty }))
}

pub fn is_string_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::String)
}

pub fn is_bytes_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::Bytes)
}

pub fn is_string_or_bytes_type(t: &Type) -> bool {
    is_string_type(t) || is_bytes_type(t)
}

pub fn is_bool_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::Bool)
}

pub fn is_numeric_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::Int | Type::Uint | Type::Double)
}

pub fn is_list_type(t: &Type) -> bool {
    matches!(t, Type::List(_))
}

pub fn is_map_type(t: &Type) -> bool {
    matches!(t, Type::Map(_, _))
}

pub fn is_wrapper_type(t: &Type) -> bool {
    matches!(t, Type::Wrapper(_))
}

pub fn is_object_type(t: &Type) -> bool {
    matches!(t, Type::Object(_))
}

/// A list whose elements are records; such variables name a table.
pub fn is_object_list_type(t: &Type) -> bool {
    matches!(t, Type::List(elem) if is_object_type(elem))
}

pub fn is_timestamp_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::Timestamp)
}

pub fn is_date_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::Date)
}

pub fn is_time_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::Time)
}

pub fn is_datetime_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::DateTime)
}

/// Durations and calendar intervals both translate to `INTERVAL`.
pub fn is_duration_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::Duration | Type::Interval)
}

pub fn is_temporal_type(t: &Type) -> bool {
    matches!(t.unwrapped(), Type::Timestamp | Type::Date | Type::Time | Type::DateTime)
}

pub fn is_date_part_type(t: &Type) -> bool {
    matches!(t, Type::DatePart)
}

pub fn is_dyn_type(t: &Type) -> bool {
    matches!(t, Type::Dyn)
}

pub fn is_null_type(t: &Type) -> bool {
    matches!(t, Type::Null)
}

/// SQL function-name prefix for a temporal category (`DATE`, `TIMESTAMP`, ...).
pub fn temporal_prefix(t: &Type) -> Option<&'static str> {
    match t.unwrapped() {
        Type::Date => Some("DATE"),
        Type::Time => Some("TIME"),
        Type::DateTime => Some("DATETIME"),
        Type::Timestamp => Some("TIMESTAMP"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_specs() {
        assert_eq!("string".parse::<Type>().unwrap(), Type::String);
        assert_eq!(
            "list<wrapper<string>>".parse::<Type>().unwrap(),
            Type::list(Type::wrapper(Type::String))
        );
        assert_eq!(
            "map<string, int>".parse::<Type>().unwrap(),
            Type::map(Type::String, Type::Int)
        );
        assert_eq!(
            "list<object<wikipedia>>".parse::<Type>().unwrap(),
            Type::list(Type::object("wikipedia"))
        );
        assert_eq!("bytes?".parse::<Type>().unwrap(), Type::wrapper(Type::Bytes));
        assert_eq!("datetime".parse::<Type>().unwrap(), Type::DateTime);
        assert!("list<".parse::<Type>().is_err());
        assert!("strin".parse::<Type>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let ty = Type::map(Type::String, Type::list(Type::object("trigrams.cell")));
        assert_eq!(ty.to_string().parse::<Type>().unwrap(), ty);
    }

    #[test]
    fn test_wrapper_classifies_as_inner() {
        let nullable = Type::wrapper(Type::String);
        assert!(is_string_type(&nullable));
        assert!(is_wrapper_type(&nullable));
        assert!(!is_bytes_type(&nullable));
        assert!(is_bytes_type(&Type::wrapper(Type::Bytes)));
        assert!(is_numeric_type(&Type::wrapper(Type::Double)));
    }

    #[test]
    fn test_assignability() {
        assert!(Type::list(Type::String).is_assignable_from(&Type::list(Type::Dyn)));
        assert!(Type::wrapper(Type::String).is_assignable_from(&Type::Null));
        assert!(Type::String.is_assignable_from(&Type::wrapper(Type::String)));
        assert!(!Type::String.is_assignable_from(&Type::list(Type::String)));
        assert!(Type::Duration.is_assignable_from(&Type::Interval));
    }

    #[test]
    fn test_temporal_prefix() {
        assert_eq!(temporal_prefix(&Type::DateTime), Some("DATETIME"));
        assert_eq!(temporal_prefix(&Type::Int), None);
        assert!(is_object_list_type(&Type::list(Type::object("wikipedia"))));
        assert!(!is_object_list_type(&Type::list(Type::String)));
    }
}
