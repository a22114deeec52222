//! "Exists"-style filter predicates.
//!
//! Every function is a member call whose target and argument are each a
//! string or a list of strings, and reads as "some target element
//! equals / starts with / ends with / contains / matches some argument
//! element". `CI` variants compare case-insensitively.
//!
//! ```text
//! tags.existsEqualsCI(["rust", "go"])   =>  ((COLLATE("rust", "und:ci") IN UNNEST(`tags`)) OR ...)
//! title.existsStarts(["a", "b"])        =>  REGEXP_CONTAINS(`title`, "^(a|b)")
//! ```

pub mod native;
pub mod pattern;
pub mod tokenizer;


use tracing::debug;

use crate::ast::{COMPARISON_PRECEDENCE, Expr, Value};
use crate::checker::FunctionDecl;
use crate::error::{CelSqlError, CelSqlResult};
use crate::transpiler::{Converter, Extension};
use crate::types::{Type, is_list_type, is_string_type};

pub use pattern::RegexOptions;
pub use tokenizer::Tokenizer;

pub const EXISTS_EQUALS: &str = "existsEquals";
pub const EXISTS_EQUALS_CI: &str = "existsEqualsCI";
pub const EXISTS_STARTS: &str = "existsStarts";
pub const EXISTS_STARTS_CI: &str = "existsStartsCI";
pub const EXISTS_ENDS: &str = "existsEnds";
pub const EXISTS_ENDS_CI: &str = "existsEndsCI";
pub const EXISTS_CONTAINS: &str = "existsContains";
pub const EXISTS_CONTAINS_CI: &str = "existsContainsCI";
/// Unanchored regular expression search.
pub const EXISTS_REGEXP: &str = "existsRegexp";
/// Unanchored, case-insensitive regular expression search.
pub const EXISTS_REGEXP_CI: &str = "existsRegexpCI";
/// Token match delegated to the warehouse's `SEARCH()`.
pub const EXISTS_CONTAINS_TEXT_CI: &str = "existsContainsTextCI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Equals,
    Starts,
    Ends,
    Contains,
    Regexp,
    ContainsText,
}

/// One of the filter functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterFunction {
    pub predicate: Predicate,
    pub case_insensitive: bool,
}

const FUNCTIONS: [(&str, FilterFunction); 11] = [
    (EXISTS_EQUALS, FilterFunction::new(Predicate::Equals, false)),
    (EXISTS_EQUALS_CI, FilterFunction::new(Predicate::Equals, true)),
    (EXISTS_STARTS, FilterFunction::new(Predicate::Starts, false)),
    (EXISTS_STARTS_CI, FilterFunction::new(Predicate::Starts, true)),
    (EXISTS_ENDS, FilterFunction::new(Predicate::Ends, false)),
    (EXISTS_ENDS_CI, FilterFunction::new(Predicate::Ends, true)),
    (EXISTS_CONTAINS, FilterFunction::new(Predicate::Contains, false)),
    (EXISTS_CONTAINS_CI, FilterFunction::new(Predicate::Contains, true)),
    (EXISTS_REGEXP, FilterFunction::new(Predicate::Regexp, false)),
    (EXISTS_REGEXP_CI, FilterFunction::new(Predicate::Regexp, true)),
    (EXISTS_CONTAINS_TEXT_CI, FilterFunction::new(Predicate::ContainsText, true)),
];

impl FilterFunction {
    pub const fn new(predicate: Predicate, case_insensitive: bool) -> Self {
        Self {
            predicate,
            case_insensitive,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FUNCTIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| *f)
    }

    pub fn name(&self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|(_, f)| f == self)
            .map_or("", |(n, _)| n)
    }

    /// Names of every filter function.
    pub fn names() -> impl Iterator<Item = &'static str> {
        FUNCTIONS.iter().map(|(n, _)| *n)
    }
}

/// The filter functions as a converter extension.
#[derive(Debug, Clone)]
pub struct FilterExtension {
    max_arguments_to_expand: usize,
    tokenizer: Tokenizer,
}

impl Default for FilterExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterExtension {
    pub const DEFAULT_MAX_ARGUMENTS_TO_EXPAND: usize = 3;

    pub fn new() -> Self {
        Self {
            max_arguments_to_expand: Self::DEFAULT_MAX_ARGUMENTS_TO_EXPAND,
            tokenizer: Tokenizer::new(),
        }
    }

    /// Longest literal list that `existsEquals` over two lists expands into
    /// `OR`ed membership tests; longer lists become one regex scan.
    pub fn with_max_arguments_to_expand(mut self, count: usize) -> Self {
        self.max_arguments_to_expand = count;
        self
    }

    /// Tokenizer used by the native `existsContainsTextCI`.
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn max_arguments_to_expand(&self) -> usize {
        self.max_arguments_to_expand
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    fn emit(
        &self,
        con: &mut Converter<'_>,
        f: FilterFunction,
        target: &Expr,
        arg: &Expr,
    ) -> CelSqlResult<()> {
        let target_list = shape(f, con.get_type(target)?, con.get_type(arg)?)?;
        let arg_list = is_list_type(con.get_type(arg)?);

        match f.predicate {
            Predicate::Equals => match (target_list, arg_list) {
                (false, false) => {
                    write_folded(con, f, target)?;
                    con.write_str(" = ");
                    write_folded(con, f, arg)
                }
                (false, true) => {
                    write_folded(con, f, target)?;
                    con.write_str(" IN UNNEST(");
                    con.visit(arg)?;
                    con.write_str(")");
                    Ok(())
                }
                (true, false) => self.emit(con, f, arg, target),
                (true, true) => match arg.as_list() {
                    Some(items) if (2..=self.max_arguments_to_expand).contains(&items.len()) => {
                        debug!(function = f.name(), count = items.len(), "expanding to membership tests");
                        con.write_str("(");
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                con.write_str(" OR ");
                            }
                            con.write_str("(");
                            self.emit(con, f, item, target)?;
                            con.write_str(")");
                        }
                        con.write_str(")");
                        Ok(())
                    }
                    _ => self.emit_regexp(con, f, target, arg),
                },
            },
            Predicate::Starts | Predicate::Ends | Predicate::Contains
                if !target_list && !arg_list =>
            {
                con.write_str(match f.predicate {
                    Predicate::Starts => "STARTS_WITH(",
                    Predicate::Ends => "ENDS_WITH(",
                    _ => "0 != INSTR(",
                });
                write_folded(con, f, target)?;
                con.write_str(", ");
                write_folded(con, f, arg)?;
                con.write_str(")");
                Ok(())
            }
            Predicate::ContainsText => {
                con.write_str("SEARCH(");
                con.visit(target)?;
                con.write_str(", ");
                con.visit(arg)?;
                con.write_str(")");
                Ok(())
            }
            Predicate::Starts | Predicate::Ends | Predicate::Contains | Predicate::Regexp => {
                self.emit_regexp(con, f, target, arg)
            }
        }
    }

    /// `REGEXP_CONTAINS(haystack, pattern)`; list targets are joined with
    /// NUL sentinels that stand in for per-element anchors.
    fn emit_regexp(
        &self,
        con: &mut Converter<'_>,
        f: FilterFunction,
        target: &Expr,
        arg: &Expr,
    ) -> CelSqlResult<()> {
        let joined = is_list_type(con.get_type(target)?);
        let value = arg.const_value().ok_or_else(|| {
            CelSqlError::mismatch(format!("{} needs constant patterns, got {}", f.name(), arg))
        })?;
        let patterns = value.as_strings().ok_or_else(|| {
            CelSqlError::mismatch(format!("{} needs string patterns, got {}", f.name(), value))
        })?;
        let regex = pattern::build(&patterns, RegexOptions::for_function(f), joined)?;
        debug!(function = f.name(), joined, "consolidated into one regex");

        con.write_str("REGEXP_CONTAINS(");
        if joined {
            con.write_str("\"\\x00\" || ARRAY_TO_STRING(");
            con.visit(target)?;
            con.write_str(", \"\\x00\") || \"\\x00\"");
        } else {
            con.visit(target)?;
        }
        con.write_str(", ");
        con.write_value(&Value::String(regex))?;
        con.write_str(")");
        Ok(())
    }
}

/// Validate operand shapes; returns whether the target is a list.
fn shape(f: FilterFunction, target: &Type, arg: &Type) -> CelSqlResult<bool> {
    let valid = |ty: &Type| is_string_type(ty) || is_list_type(ty);
    if valid(target) && valid(arg) {
        Ok(is_list_type(target))
    } else {
        Err(CelSqlError::mismatch(format!(
            "unsupported types: {}.{}({})",
            target,
            f.name(),
            arg
        )))
    }
}

fn write_folded(con: &mut Converter<'_>, f: FilterFunction, expr: &Expr) -> CelSqlResult<()> {
    if f.case_insensitive {
        con.visit_case_folded(expr)
    } else {
        con.visit_operand(expr, COMPARISON_PRECEDENCE + 1)
    }
}

impl Extension for FilterExtension {
    fn implements_function(&self, function: &str) -> bool {
        FilterFunction::from_name(function).is_some()
    }

    fn call_function(
        &self,
        con: &mut Converter<'_>,
        function: &str,
        target: Option<&Expr>,
        args: &[Expr],
    ) -> CelSqlResult<()> {
        let f = FilterFunction::from_name(function)
            .ok_or_else(|| CelSqlError::unsupported(format!("filter '{}'", function)))?;
        let target = target.ok_or_else(|| {
            CelSqlError::unsupported(format!("global call to '{}'", function))
        })?;
        let arg = match args {
            [] => return Err(CelSqlError::EmptyArguments(function.to_string())),
            [arg] => arg,
            _ => {
                return Err(CelSqlError::mismatch(format!(
                    "{} takes one argument, got {}",
                    function,
                    args.len()
                )));
            }
        };
        // exists*([]) is false and exists*([x]) is exists*(x)
        match arg.as_list() {
            Some([]) => {
                con.write_str("FALSE");
                Ok(())
            }
            Some([single]) => self.emit(con, f, target, single),
            _ => self.emit(con, f, target, arg),
        }
    }

    fn declarations(&self) -> Vec<FunctionDecl> {
        let string_list = Type::list(Type::String);
        let shapes = [
            ("string_to_string", Type::String, Type::String),
            ("string_to_list", Type::String, string_list.clone()),
            ("list_to_string", string_list.clone(), Type::String),
            ("list_to_list", string_list.clone(), string_list.clone()),
        ];
        FilterFunction::names()
            .map(|name| {
                shapes
                    .iter()
                    .fold(FunctionDecl::new(name), |decl, (suffix, target, arg)| {
                        decl.member(
                            format!("{}_{}", name, suffix),
                            vec![target.clone(), arg.clone()],
                            Type::Bool,
                        )
                    })
            })
            .collect()
    }
}
