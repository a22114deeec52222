//! Static type checking of parsed expressions.
//!
//! The converter only accepts trees whose every node carries a resolved
//! type. An [`Env`] declares the variables, record schemas and extension
//! functions an expression may reference; [`Env::check`] annotates a
//! parsed tree against it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{
    BinaryOp, Comprehension, ComprehensionKind, Expr, ExprKind, MapEntry, UnaryOp, Value,
};
use crate::error::{CelSqlError, CelSqlResult};
use crate::parser;
use crate::schema::SchemaRegistry;
use crate::transpiler::calls::{builtin_functions, is_accessor};
use crate::transpiler::{Extension, temporal};
use crate::types::{
    Type, is_date_part_type, is_duration_type, is_list_type, is_map_type, is_null_type,
    is_numeric_type, is_string_or_bytes_type, is_temporal_type, temporal_prefix,
};

/// Calendar units usable as bare identifiers, e.g. `trunc(HOUR)`.
pub const DATE_PARTS: [&str; 14] = [
    "YEAR",
    "MONTH",
    "WEEK",
    "DAY",
    "HOUR",
    "MINUTE",
    "SECOND",
    "MILLISECOND",
    "MICROSECOND",
    "QUARTER",
    "DAYOFWEEK",
    "DAYOFYEAR",
    "ISOWEEK",
    "ISOYEAR",
];

static DYN: Type = Type::Dyn;

/// One signature of a declared function. Member overloads list the
/// receiver as their first parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Overload {
    pub id: String,
    pub member: bool,
    pub params: Vec<Type>,
    pub result: Type,
}

impl Overload {
    fn accepts(&self, member: bool, args: &[&Type]) -> bool {
        self.member == member
            && self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| param.is_assignable_from(arg))
    }
}

/// A function name and its overloads.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<Overload>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    /// Add a `receiver.name(args)` overload; `params[0]` is the receiver.
    pub fn member(mut self, id: impl Into<String>, params: Vec<Type>, result: Type) -> Self {
        self.overloads.push(Overload {
            id: id.into(),
            member: true,
            params,
            result,
        });
        self
    }

    /// Add a `name(args)` overload.
    pub fn global(mut self, id: impl Into<String>, params: Vec<Type>, result: Type) -> Self {
        self.overloads.push(Overload {
            id: id.into(),
            member: false,
            params,
            result,
        });
        self
    }
}

/// Declarations an expression is checked against.
#[derive(Debug, Clone, Default)]
pub struct Env {
    variables: BTreeMap<String, Type>,
    schemas: SchemaRegistry,
    functions: BTreeMap<String, Vec<Overload>>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.declare(name, ty);
        self
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: Type) {
        self.variables.insert(name.into(), ty);
    }

    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = schemas;
        self
    }

    /// Add function declarations; overloads of an already declared name
    /// are appended to it.
    pub fn with_functions(mut self, decls: impl IntoIterator<Item = FunctionDecl>) -> Self {
        for decl in decls {
            self.functions
                .entry(decl.name)
                .or_default()
                .extend(decl.overloads);
        }
        self
    }

    /// Declare everything `extension` translates.
    pub fn with_extension(self, extension: &dyn Extension) -> Self {
        self.with_functions(extension.declarations())
    }

    pub fn variable(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.variables.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Names of the declared (non-built-in) functions.
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Annotate every node of `expr` with its type.
    pub fn check(&self, expr: Expr) -> CelSqlResult<Expr> {
        Checker::new(self).check(expr)
    }

    /// Parse and check `source`.
    pub fn compile(&self, source: &str) -> CelSqlResult<Expr> {
        let expr = parser::parse(source)?;
        self.check(expr)
    }
}

/// Type annotator; one per expression.
pub struct Checker<'e> {
    env: &'e Env,
    /// Iteration variables in scope, innermost last.
    scopes: Vec<(String, Type)>,
}

impl<'e> Checker<'e> {
    pub fn new(env: &'e Env) -> Self {
        Self {
            env,
            scopes: Vec::new(),
        }
    }

    pub fn check(&mut self, expr: Expr) -> CelSqlResult<Expr> {
        match expr.kind {
            ExprKind::Literal(value) => {
                let ty = value_type(&value);
                Ok(Expr::new(ExprKind::Literal(value)).typed(ty))
            }
            ExprKind::Ident(name) => {
                let ty = self.lookup(&name)?;
                Ok(Expr::new(ExprKind::Ident(name)).typed(ty))
            }
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => {
                let operand = self.check(*operand)?;
                let field_ty = self.field_type(ty(&operand), &field)?;
                let ty = if test_only { Type::Bool } else { field_ty };
                Ok(Expr::new(ExprKind::Select {
                    operand: Box::new(operand),
                    field,
                    test_only,
                })
                .typed(ty))
            }
            ExprKind::Index {
                operand,
                index,
                safe,
            } => {
                let operand = self.check(*operand)?;
                let index = self.check(*index)?;
                self.index(operand, index, safe)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.check(*operand)?;
                let operand_ty = ty(&operand);
                let result = match op {
                    UnaryOp::Not if Type::Bool.is_assignable_from(operand_ty) => Type::Bool,
                    UnaryOp::Neg
                        if is_numeric_type(operand_ty)
                            || is_duration_type(operand_ty)
                            || operand_ty == &Type::Dyn =>
                    {
                        operand_ty.unwrapped().clone()
                    }
                    _ => {
                        return Err(CelSqlError::check(format!(
                            "found no matching overload for '{}' applied to '({})'",
                            op, operand_ty
                        )));
                    }
                };
                Ok(Expr::new(ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                })
                .typed(result))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.check(*lhs)?;
                let rhs = self.check(*rhs)?;
                let result = binary_type(op, ty(&lhs), ty(&rhs))?;
                Ok(Expr::new(ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
                .typed(result))
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.check(*cond)?;
                if !Type::Bool.is_assignable_from(ty(&cond)) {
                    return Err(CelSqlError::check(format!(
                        "condition must be bool, got {}",
                        ty(&cond)
                    )));
                }
                let then = self.check(*then)?;
                let otherwise = self.check(*otherwise)?;
                let result = common_type(ty(&then), ty(&otherwise));
                Ok(Expr::new(ExprKind::Conditional {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                })
                .typed(result))
            }
            ExprKind::Call {
                function,
                target,
                args,
            } => {
                let target = target.map(|t| self.check(*t)).transpose()?;
                let mut args = args
                    .into_iter()
                    .map(|arg| self.check(arg))
                    .collect::<CelSqlResult<Vec<_>>>()?;
                match target {
                    // list.get(i) is the out-of-range tolerant index
                    Some(operand)
                        if function == "get"
                            && args.len() == 1
                            && is_list_type(ty(&operand)) =>
                    {
                        let index = args.remove(0);
                        self.index(operand, index, true)
                    }
                    target => {
                        let result = self.call_type(&function, target.as_ref(), &args)?;
                        Ok(Expr::new(ExprKind::Call {
                            function,
                            target: target.map(Box::new),
                            args,
                        })
                        .typed(result))
                    }
                }
            }
            ExprKind::List(items) => {
                let items = items
                    .into_iter()
                    .map(|item| self.check(item))
                    .collect::<CelSqlResult<Vec<_>>>()?;
                let elem = fold_types(items.iter().map(ty));
                Ok(Expr::new(ExprKind::List(items)).typed(Type::list(elem)))
            }
            ExprKind::Map(entries) => {
                let entries = entries
                    .into_iter()
                    .map(|entry| {
                        Ok(MapEntry {
                            key: self.check(entry.key)?,
                            value: self.check(entry.value)?,
                        })
                    })
                    .collect::<CelSqlResult<Vec<_>>>()?;
                let key = fold_types(entries.iter().map(|e| ty(&e.key)));
                let value = fold_types(entries.iter().map(|e| ty(&e.value)));
                Ok(Expr::new(ExprKind::Map(entries)).typed(Type::map(key, value)))
            }
            ExprKind::Comprehension(c) => self.comprehension(*c),
        }
    }

    fn lookup(&self, name: &str) -> CelSqlResult<Type> {
        if let Some((_, ty)) = self.scopes.iter().rev().find(|(var, _)| var == name) {
            return Ok(ty.clone());
        }
        if let Some(ty) = self.env.variable(name) {
            return Ok(ty.clone());
        }
        if DATE_PARTS.iter().any(|part| *part == name) {
            return Ok(Type::DatePart);
        }
        Err(CelSqlError::check(format!(
            "undeclared reference to '{}'",
            name
        )))
    }

    fn field_type(&self, operand: &Type, field: &str) -> CelSqlResult<Type> {
        match operand.unwrapped() {
            Type::Object(name) => self.env.schemas.field_type(name, field).ok_or_else(|| {
                CelSqlError::check(format!("undefined field '{}' of {}", field, operand))
            }),
            Type::Map(key, value) if key.is_assignable_from(&Type::String) => {
                Ok((**value).clone())
            }
            Type::Dyn => Ok(Type::Dyn),
            other => Err(CelSqlError::check(format!(
                "type {} does not support field selection",
                other
            ))),
        }
    }

    fn index(&self, operand: Expr, index: Expr, safe: bool) -> CelSqlResult<Expr> {
        let operand_ty = ty(&operand);
        let index_ty = ty(&index);
        let result = match operand_ty.unwrapped() {
            Type::List(elem) if matches!(index_ty.unwrapped(), Type::Int | Type::Uint | Type::Dyn) => {
                (**elem).clone()
            }
            Type::Map(key, value) if key.is_assignable_from(index_ty) => (**value).clone(),
            Type::Object(_) => match index.as_literal() {
                Some(Value::String(field)) => self.field_type(operand_ty, field)?,
                _ => Type::Dyn,
            },
            Type::Dyn => Type::Dyn,
            _ => {
                return Err(CelSqlError::check(format!(
                    "found no matching overload for '_[_]' applied to '({}, {})'",
                    operand_ty, index_ty
                )));
            }
        };
        Ok(Expr::new(ExprKind::Index {
            operand: Box::new(operand),
            index: Box::new(index),
            safe,
        })
        .typed(result))
    }

    fn call_type(
        &self,
        function: &str,
        target: Option<&Expr>,
        args: &[Expr],
    ) -> CelSqlResult<Type> {
        let mut types: Vec<&Type> = target.into_iter().map(ty).collect();
        types.extend(args.iter().map(ty));

        if let Some(overloads) = self.env.functions.get(function) {
            let overload = overloads
                .iter()
                .find(|o| o.accepts(target.is_some(), &types))
                .ok_or_else(|| no_overload(function, &types))?;
            debug!(function, overload = %overload.id, "resolved overload");
            return Ok(overload.result.clone());
        }
        builtin_type(function, target, args)?.ok_or_else(|| {
            CelSqlError::check(format!("undeclared reference to '{}'", function))
        })
    }

    fn comprehension(&mut self, c: Comprehension) -> CelSqlResult<Expr> {
        let range = self.check(c.range)?;
        let range_ty = ty(&range).clone();
        let elem = match range_ty.unwrapped() {
            Type::List(elem) => (**elem).clone(),
            Type::Map(key, _) => (**key).clone(),
            Type::Dyn => Type::Dyn,
            other => {
                return Err(CelSqlError::check(format!(
                    "{} cannot range over {}",
                    c.kind.macro_name(),
                    other
                )));
            }
        };

        self.scopes.push((c.iter_var.clone(), elem));
        let body = self.comprehension_body(c.predicate, c.result);
        self.scopes.pop();
        let (predicate, result) = body?;

        let ty = match c.kind {
            ComprehensionKind::Map | ComprehensionKind::MapDistinct => {
                Type::list(result.as_ref().map_or(Type::Dyn, |r| ty(r).clone()))
            }
            ComprehensionKind::Filter => range_ty,
            ComprehensionKind::Exists | ComprehensionKind::All | ComprehensionKind::ExistsOne => {
                Type::Bool
            }
        };
        Ok(Expr::new(ExprKind::Comprehension(Box::new(Comprehension {
            kind: c.kind,
            iter_var: c.iter_var,
            range,
            predicate,
            result,
        })))
        .typed(ty))
    }

    fn comprehension_body(
        &mut self,
        predicate: Option<Expr>,
        result: Option<Expr>,
    ) -> CelSqlResult<(Option<Expr>, Option<Expr>)> {
        let predicate = predicate.map(|p| self.check(p)).transpose()?;
        if let Some(p) = &predicate {
            if !Type::Bool.is_assignable_from(ty(p)) {
                return Err(CelSqlError::check(format!(
                    "predicate must be bool, got {}",
                    ty(p)
                )));
            }
        }
        let result = result.map(|r| self.check(r)).transpose()?;
        Ok((predicate, result))
    }
}

fn ty(expr: &Expr) -> &Type {
    expr.ty.as_ref().unwrap_or(&DYN)
}

fn value_type(value: &Value) -> Type {
    match value {
        Value::Null => Type::Null,
        Value::Bool(_) => Type::Bool,
        Value::Int(_) => Type::Int,
        Value::Uint(_) => Type::Uint,
        Value::Double(_) => Type::Double,
        Value::String(_) => Type::String,
        Value::Bytes(_) => Type::Bytes,
        Value::List(items) => {
            let types: Vec<Type> = items.iter().map(value_type).collect();
            Type::list(fold_types(types.iter()))
        }
        Value::Map(entries) => {
            let keys: Vec<Type> = entries.iter().map(|(k, _)| value_type(k)).collect();
            let values: Vec<Type> = entries.iter().map(|(_, v)| value_type(v)).collect();
            Type::map(fold_types(keys.iter()), fold_types(values.iter()))
        }
    }
}

/// Join of two branch or element types.
fn common_type(a: &Type, b: &Type) -> Type {
    if a == b {
        a.clone()
    } else if is_null_type(a) {
        b.clone()
    } else if is_null_type(b) {
        a.clone()
    } else {
        Type::Dyn
    }
}

/// Element type of a literal collection; `dyn` when empty or mixed.
fn fold_types<'t>(types: impl Iterator<Item = &'t Type>) -> Type {
    types
        .fold(None, |acc: Option<Type>, t| {
            Some(match acc {
                None => t.clone(),
                Some(a) => common_type(&a, t),
            })
        })
        .unwrap_or(Type::Dyn)
}

fn no_overload(function: &str, types: &[&Type]) -> CelSqlError {
    let rendered: Vec<String> = types.iter().map(|t| t.to_string()).collect();
    CelSqlError::check(format!(
        "found no matching overload for '{}' applied to '({})'",
        function,
        rendered.join(", ")
    ))
}

fn binary_type(op: BinaryOp, lhs: &Type, rhs: &Type) -> CelSqlResult<Type> {
    let valid = match op {
        BinaryOp::And | BinaryOp::Or => {
            Type::Bool.is_assignable_from(lhs) && Type::Bool.is_assignable_from(rhs)
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            is_null_type(lhs)
                || is_null_type(rhs)
                || lhs.is_assignable_from(rhs)
                || rhs.is_assignable_from(lhs)
                || (is_numeric_type(lhs) && is_numeric_type(rhs))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            (is_numeric_type(lhs) && is_numeric_type(rhs))
                || (lhs.is_assignable_from(rhs) && !is_list_type(lhs) && !is_map_type(lhs))
        }
        BinaryOp::In => match rhs.unwrapped() {
            Type::List(elem) => elem.is_assignable_from(lhs),
            Type::Map(key, _) => key.is_assignable_from(lhs),
            Type::Dyn => true,
            _ => false,
        },
        _ => {
            return arithmetic_type(op, lhs, rhs).ok_or_else(|| no_overload(op.symbol(), &[lhs, rhs]));
        }
    };
    if valid {
        Ok(Type::Bool)
    } else {
        Err(no_overload(op.symbol(), &[lhs, rhs]))
    }
}

fn arithmetic_type(op: BinaryOp, lhs: &Type, rhs: &Type) -> Option<Type> {
    let (l, r) = (lhs.unwrapped(), rhs.unwrapped());
    if l == &Type::Dyn || r == &Type::Dyn {
        return Some(Type::Dyn);
    }
    let same_numeric = is_numeric_type(l) && l == r;
    match op {
        BinaryOp::Add => match (l, r) {
            _ if same_numeric => Some(l.clone()),
            _ if is_string_or_bytes_type(l) && l == r => Some(l.clone()),
            (Type::List(a), Type::List(b)) => Some(Type::list(common_type(a, b))),
            (Type::Date, Type::Int) => Some(Type::Date),
            _ if is_temporal_type(l) && is_duration_type(r) => Some(l.clone()),
            _ if is_duration_type(l) && is_temporal_type(r) => Some(r.clone()),
            _ if is_duration_type(l) && is_duration_type(r) => Some(Type::Duration),
            _ => None,
        },
        BinaryOp::Sub => match (l, r) {
            _ if same_numeric => Some(l.clone()),
            (Type::Date, Type::Int) => Some(Type::Date),
            (Type::Timestamp, Type::Timestamp) => Some(Type::Duration),
            _ if is_temporal_type(l) && is_duration_type(r) => Some(l.clone()),
            _ if is_duration_type(l) && is_duration_type(r) => Some(Type::Duration),
            _ => None,
        },
        _ if same_numeric => Some(l.clone()),
        _ => None,
    }
}

/// Result type of a built-in call; `None` when `function` is not built in.
fn builtin_type(
    function: &str,
    target: Option<&Expr>,
    args: &[Expr],
) -> CelSqlResult<Option<Type>> {
    let target_ty = target.map(ty);
    let arg_tys: Vec<&Type> = args.iter().map(ty).collect();
    let string = |t: &Type| Type::String.is_assignable_from(t);
    let integer = |t: &Type| matches!(t.unwrapped(), Type::Int | Type::Uint | Type::Dyn);
    let sizable = |t: &Type| {
        is_string_or_bytes_type(t) || is_list_type(t) || is_map_type(t) || t == &Type::Dyn
    };

    let result = match (function, target_ty, arg_tys.as_slice()) {
        ("startsWith" | "endsWith" | "contains" | "matches", Some(t), [a]) => {
            (string(t) && string(a)).then_some(Type::Bool)
        }
        ("matches", None, [t, a]) => (string(t) && string(a)).then_some(Type::Bool),
        ("replace", Some(t), [from, to]) => {
            (string(t) && string(from) && string(to)).then_some(Type::String)
        }
        ("lowerAscii" | "upperAscii" | "trim", Some(t), []) => string(t).then_some(Type::String),
        ("size", Some(t), []) => sizable(t).then_some(Type::Int),
        ("size", None, [t]) => sizable(t).then_some(Type::Int),
        ("bool", None, [_]) => Some(Type::Bool),
        ("int", None, [_]) => Some(Type::Int),
        ("uint", None, [_]) => Some(Type::Uint),
        ("double", None, [_]) => Some(Type::Double),
        ("string", None, [_]) => Some(Type::String),
        ("bytes", None, [_]) => Some(Type::Bytes),
        ("date" | "time" | "datetime" | "timestamp", None, [_, ..]) => {
            if let [arg] = args {
                if let Some(Value::String(literal)) = arg.as_literal() {
                    temporal::validate_literal(function, literal)?;
                }
            }
            Some(constructed_type(function))
        }
        ("current_date" | "current_time" | "current_datetime" | "current_timestamp", None, zone) => {
            (zone.len() <= 1 && zone.iter().all(|z| string(z)))
                .then(|| constructed_type(&function["current_".len()..]))
        }
        ("duration", None, [a]) => {
            if let Some(Value::String(literal)) = args[0].as_literal() {
                temporal::parse_duration(literal)
                    .map_err(|e| CelSqlError::check(e.to_string()))?;
            }
            string(a).then_some(Type::Duration)
        }
        ("interval", None, [count, part]) => {
            (integer(count) && is_date_part_type(part)).then_some(Type::Interval)
        }
        ("trunc", Some(t), [part]) => (temporal_prefix(t.unwrapped()).is_some()
            && is_date_part_type(part))
        .then(|| t.unwrapped().clone()),
        (name, Some(t), zone) if is_accessor(name) => (is_temporal_type(t.unwrapped())
            && zone.len() <= 1
            && zone.iter().all(|z| string(z)))
        .then_some(Type::Int),
        (name, ..) if builtin_functions().iter().any(|f| *f == name) => None,
        _ => return Ok(None),
    };
    match result {
        Some(ty) => Ok(Some(ty)),
        None => {
            let mut types: Vec<&Type> = target_ty.into_iter().collect();
            types.extend(arg_tys);
            Err(no_overload(function, &types))
        }
    }
}

fn constructed_type(function: &str) -> Type {
    match function {
        "date" => Type::Date,
        "time" => Type::Time,
        "datetime" => Type::DateTime,
        _ => Type::Timestamp,
    }
}
