//! Date/time arithmetic and duration literals.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit0, one_of},
    combinator::{all_consuming, map, opt},
    multi::many1,
    sequence::{preceded, tuple},
};

use crate::ast::{BinaryOp, Expr};
use crate::error::{CelSqlError, CelSqlResult};
use crate::transpiler::Converter;
use crate::types::{is_duration_type, temporal_prefix};

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i128 = 60 * NANOS_PER_MINUTE;

/// Parse a duration such as `1h30m`, `1.5s` or `-300ms`.
pub fn parse_duration(s: &str) -> CelSqlResult<TimeDelta> {
    let (_, (sign, parts)) = all_consuming(duration)(s)
        .map_err(|_| CelSqlError::mismatch(format!("invalid duration {:?}", s)))?;

    let mut nanos: i128 = 0;
    for (whole, frac, unit) in parts {
        if whole.is_empty() && frac.is_none_or(str::is_empty) {
            return Err(CelSqlError::mismatch(format!("invalid duration {:?}", s)));
        }
        let scale = unit_nanos(unit);
        let whole: i128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| CelSqlError::mismatch(format!("duration {:?} out of range", s)))?
        };
        nanos = nanos
            .checked_add(whole.saturating_mul(scale))
            .ok_or_else(|| CelSqlError::mismatch(format!("duration {:?} out of range", s)))?;
        if let Some(frac) = frac {
            // Keep enough digits to resolve a nanosecond of an hour.
            let digits = &frac[..frac.len().min(18)];
            if !digits.is_empty() {
                let value: i128 = digits.parse().unwrap_or(0);
                nanos += value * scale / 10i128.pow(digits.len() as u32);
            }
        }
    }
    if sign == Some('-') {
        nanos = -nanos;
    }
    let nanos = i64::try_from(nanos)
        .map_err(|_| CelSqlError::mismatch(format!("duration {:?} out of range", s)))?;
    Ok(TimeDelta::nanoseconds(nanos))
}

type Component<'a> = (&'a str, Option<&'a str>, &'a str);

fn duration(input: &str) -> IResult<&str, (Option<char>, Vec<Component<'_>>)> {
    tuple((
        opt(one_of("+-")),
        alt((many1(component), map(tag("0"), |_| Vec::new()))),
    ))(input)
}

fn component(input: &str) -> IResult<&str, Component<'_>> {
    tuple((digit0, opt(preceded(char('.'), digit0)), unit))(input)
}

fn unit(input: &str) -> IResult<&str, &str> {
    alt((
        tag("ns"),
        tag("us"),
        tag("µs"),
        tag("μs"),
        tag("ms"),
        tag("s"),
        tag("m"),
        tag("h"),
    ))(input)
}

fn unit_nanos(unit: &str) -> i128 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SECOND,
        "m" => NANOS_PER_MINUTE,
        _ => NANOS_PER_HOUR,
    }
}

/// Count and unit of the coarsest `INTERVAL` that represents `delta`
/// exactly, falling back to truncated microseconds.
pub fn interval_parts(delta: TimeDelta) -> CelSqlResult<(i64, &'static str)> {
    type Count = fn(&TimeDelta) -> i64;
    type Build = fn(i64) -> Option<TimeDelta>;
    let units: [(&'static str, Count, Build); 4] = [
        ("HOUR", TimeDelta::num_hours, TimeDelta::try_hours),
        ("MINUTE", TimeDelta::num_minutes, TimeDelta::try_minutes),
        ("SECOND", TimeDelta::num_seconds, TimeDelta::try_seconds),
        ("MILLISECOND", TimeDelta::num_milliseconds, TimeDelta::try_milliseconds),
    ];
    for (unit, count, build) in units {
        let n = count(&delta);
        if build(n) == Some(delta) {
            return Ok((n, unit));
        }
    }
    let micros = delta
        .num_microseconds()
        .ok_or_else(|| CelSqlError::mismatch("duration out of range"))?;
    Ok((micros, "MICROSECOND"))
}

/// Check a constant argument of `date()`, `time()` or `datetime()`.
///
/// `timestamp()` strings accept zone suffixes the warehouse understands
/// and are only checked when they look like RFC 3339.
pub fn validate_literal(function: &str, literal: &str) -> CelSqlResult<()> {
    let ok = match function {
        "date" => NaiveDate::parse_from_str(literal, "%Y-%m-%d").is_ok(),
        "time" => ["%H:%M:%S%.f", "%H:%M"]
            .iter()
            .any(|fmt| NaiveTime::parse_from_str(literal, fmt).is_ok()),
        "datetime" => ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(literal, fmt).is_ok()),
        "timestamp" if literal.ends_with('Z') => DateTime::parse_from_rfc3339(literal).is_ok(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(CelSqlError::check(format!(
            "invalid {} literal {:?}",
            function, literal
        )))
    }
}

impl Converter<'_> {
    /// `base ± duration` as `<KIND>_ADD/_SUB(base, duration)`.
    pub(super) fn visit_temporal_arith(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CelSqlResult<()> {
        let (base, delta) = if is_duration_type(self.get_type(lhs)?) {
            if op == BinaryOp::Sub {
                return Err(CelSqlError::mismatch(
                    "cannot subtract a date/time from a duration",
                ));
            }
            (rhs, lhs)
        } else {
            (lhs, rhs)
        };
        let base_ty = self.get_type(base)?;
        let prefix = temporal_prefix(base_ty.unwrapped())
            .ok_or_else(|| CelSqlError::mismatch(format!("{} of {}", op, base_ty)))?;
        self.write_str(prefix);
        self.write_str(if op == BinaryOp::Add { "_ADD(" } else { "_SUB(" });
        self.visit(base)?;
        self.write_str(", ");
        self.visit(delta)?;
        self.write_str(")");
        Ok(())
    }
}
