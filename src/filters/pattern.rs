//! Regex consolidation for the filter functions.
//!
//! A list target is scanned as one string, `\0e1\0e2\0...\0`. Inside the
//! synthesized pattern the NUL sentinel then plays the role of `^` and `$`
//! for each element, so "some element starts with `a` or `b`" becomes
//! `\0(a|b)`.

use regex::Regex;

use super::{FilterFunction, Predicate};
use crate::error::{CelSqlError, CelSqlResult};

/// Element separator of a joined list target.
pub const SENTINEL: char = '\0';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexOptions {
    pub case_insensitive: bool,
    pub start_anchor: bool,
    pub end_anchor: bool,
    /// Match patterns literally instead of as regular expressions.
    pub escape: bool,
}

impl RegexOptions {
    pub fn for_function(f: FilterFunction) -> Self {
        let (start_anchor, end_anchor, escape) = match f.predicate {
            Predicate::Equals => (true, true, true),
            Predicate::Starts => (true, false, true),
            Predicate::Ends => (false, true, true),
            Predicate::Contains | Predicate::ContainsText => (false, false, true),
            Predicate::Regexp => (false, false, false),
        };
        Self {
            case_insensitive: f.case_insensitive,
            start_anchor,
            end_anchor,
            escape,
        }
    }
}

/// Build and validate the pattern for `patterns` under `opts`.
///
/// With `joined` set the haystack is a sentinel-joined list, so anchors
/// become sentinels, including a leading `^` or trailing `$` in a live
/// pattern.
pub fn build(patterns: &[&str], opts: RegexOptions, joined: bool) -> CelSqlResult<String> {
    let mut out = String::new();
    if opts.case_insensitive {
        out.push_str("(?i)");
    }
    if opts.start_anchor {
        out.push(if joined { SENTINEL } else { '^' });
    }
    out.push('(');
    let patterns: Vec<String> = if joined && !opts.escape {
        patterns.iter().map(|p| anchors_to_sentinels(p)).collect()
    } else {
        patterns.iter().map(|p| p.to_string()).collect()
    };
    out.push_str(&join(&patterns, opts.escape));
    out.push(')');
    if opts.end_anchor {
        out.push(if joined { SENTINEL } else { '$' });
    }
    Regex::new(&out).map_err(|e| CelSqlError::pattern(out.clone(), e.to_string()))?;
    Ok(out)
}

/// Alternation of `patterns`. Literal patterns are escaped, live ones are
/// grouped unless there is only one.
pub fn join(patterns: &[String], escape: bool) -> String {
    if patterns.len() == 1 && !escape {
        return patterns[0].clone();
    }
    patterns
        .iter()
        .map(|p| {
            if escape {
                regex::escape(p)
            } else {
                format!("({})", p)
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn anchors_to_sentinels(pattern: &str) -> String {
    let mut p = pattern;
    let mut out = String::with_capacity(pattern.len());
    if let Some(rest) = p.strip_prefix('^') {
        out.push(SENTINEL);
        p = rest;
    }
    match p.strip_suffix('$') {
        Some(body) if !ends_with_escape(body) => {
            out.push_str(body);
            out.push(SENTINEL);
        }
        _ => out.push_str(p),
    }
    out
}

/// An odd run of trailing backslashes escapes whatever follows.
fn ends_with_escape(s: &str) -> bool {
    s.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}
