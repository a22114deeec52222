//! Direct evaluation of the filter functions over literal values.
//!
//! Mirrors the SQL the extension emits, for callers that evaluate
//! predicates in process instead of in the warehouse.

use regex::RegexBuilder;

use super::{FilterExtension, FilterFunction, Predicate, pattern};
use crate::ast::Value;
use crate::error::{CelSqlError, CelSqlResult};

impl FilterExtension {
    /// Evaluate `target.function(argument)`.
    ///
    /// `target` and `argument` must each be a string or a list of strings.
    pub fn evaluate(&self, function: &str, target: &Value, argument: &Value) -> CelSqlResult<bool> {
        let f = FilterFunction::from_name(function)
            .ok_or_else(|| CelSqlError::unsupported(format!("filter '{}'", function)))?;
        let targets = strings(function, target)?;
        let patterns = strings(function, argument)?;

        if f.predicate == Predicate::Regexp {
            return self.matches_regexp(f, &targets, &patterns);
        }
        if f.predicate == Predicate::ContainsText {
            let patterns = lowered(&patterns);
            return Ok(targets.iter().any(|t| {
                self.tokenizer
                    .tokenize(t)
                    .iter()
                    .any(|token| patterns.contains(token))
            }));
        }

        let (targets, patterns) = if f.case_insensitive {
            (lowered(&targets), lowered(&patterns))
        } else {
            (owned(&targets), owned(&patterns))
        };
        let test: fn(&str, &str) -> bool = match f.predicate {
            Predicate::Equals => |t, p| t == p,
            Predicate::Starts => |t, p| t.starts_with(p),
            Predicate::Ends => |t, p| t.ends_with(p),
            _ => |t, p| t.contains(p),
        };
        Ok(targets
            .iter()
            .any(|t| patterns.iter().any(|p| test(t, p))))
    }

    fn matches_regexp(
        &self,
        f: FilterFunction,
        targets: &[&str],
        patterns: &[&str],
    ) -> CelSqlResult<bool> {
        if patterns.is_empty() {
            return Ok(false);
        }
        let source = pattern::join(&owned(patterns), false);
        let re = RegexBuilder::new(&source)
            .case_insensitive(f.case_insensitive)
            .build()
            .map_err(|e| CelSqlError::pattern(source.clone(), e.to_string()))?;
        Ok(targets.iter().any(|t| re.is_match(t)))
    }
}

fn strings<'v>(function: &str, value: &'v Value) -> CelSqlResult<Vec<&'v str>> {
    value.as_strings().ok_or_else(|| {
        CelSqlError::mismatch(format!(
            "{} expects a string or list of strings, got {}",
            function, value
        ))
    })
}

fn lowered(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
