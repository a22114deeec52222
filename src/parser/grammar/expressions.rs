//! Expression parsing with operator precedence.
//!
//! From loosest to tightest:
//! - `?:`
//! - `||`
//! - `&&`
//! - `< <= > >= == != in`
//! - `+ -`
//! - `* / %`
//! - unary `!` `-`
//! - member access, calls and indexing

use nom::{
    character::complete::char,
    combinator::{cut, opt},
    multi::{many1, separated_list0},
    sequence::terminated,
};

use super::base::{PResult, expect, failure, identifier, is_ident_char, sp, sym};
use super::literals::{negate, parse_literal};
use crate::ast::builders::{binary, conditional, index, lit, map, not, select, unary};
use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::parser::macros;

type Operand = for<'a> fn(&'a str) -> PResult<'a, Expr>;

/// Parse a full expression, including a trailing `? :` conditional.
pub fn parse_expr(input: &str) -> PResult<'_, Expr> {
    let (input, cond) = parse_or(input)?;
    let Ok((rest, _)) = sym('?')(input) else {
        return Ok((input, cond));
    };
    let (rest, then) = cut(parse_or)(rest)?;
    let (rest, _) = sp(rest)?;
    let (rest, _) = expect(':')(rest)?;
    let (rest, _) = sp(rest)?;
    let (rest, otherwise) = cut(parse_expr)(rest)?;
    Ok((rest, conditional(cond, then, otherwise)))
}

fn parse_or(input: &str) -> PResult<'_, Expr> {
    let (input, left) = parse_and(input)?;
    parse_binary_chain(input, left, parse_and, &[("||", BinaryOp::Or)])
}

fn parse_and(input: &str) -> PResult<'_, Expr> {
    let (input, left) = parse_relation(input)?;
    parse_binary_chain(input, left, parse_relation, &[("&&", BinaryOp::And)])
}

fn parse_relation(input: &str) -> PResult<'_, Expr> {
    let (input, left) = parse_additive(input)?;
    parse_binary_chain(
        input,
        left,
        parse_additive,
        &[
            ("<=", BinaryOp::Le),
            ("<", BinaryOp::Lt),
            (">=", BinaryOp::Ge),
            (">", BinaryOp::Gt),
            ("==", BinaryOp::Eq),
            ("!=", BinaryOp::Ne),
            ("in", BinaryOp::In),
        ],
    )
}

fn parse_additive(input: &str) -> PResult<'_, Expr> {
    let (input, left) = parse_multiplicative(input)?;
    parse_binary_chain(
        input,
        left,
        parse_multiplicative,
        &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    )
}

fn parse_multiplicative(input: &str) -> PResult<'_, Expr> {
    let (input, left) = parse_unary(input)?;
    parse_binary_chain(
        input,
        left,
        parse_unary,
        &[
            ("*", BinaryOp::Mul),
            ("/", BinaryOp::Div),
            ("%", BinaryOp::Mod),
        ],
    )
}

/// Generic left-associative binary chain parser
fn parse_binary_chain<'a>(
    mut input: &'a str,
    mut left: Expr,
    parse_operand: Operand,
    operators: &[(&str, BinaryOp)],
) -> PResult<'a, Expr> {
    loop {
        let (remaining, _) = sp(input)?;
        let matched = operators
            .iter()
            .find_map(|(symbol, op)| operator(remaining, symbol).map(|after| (after, *op)));
        let Some((after_op, op)) = matched else {
            break;
        };
        let (after_ws, _) = sp(after_op)?;
        let (after_right, right) = cut(parse_operand)(after_ws)?;
        left = binary(left, op, right);
        input = after_right;
    }
    Ok((input, left))
}

fn operator<'a>(input: &'a str, symbol: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(symbol)?;
    if symbol == "in" && rest.starts_with(is_ident_char) {
        return None;
    }
    Some(rest)
}

fn parse_unary(input: &str) -> PResult<'_, Expr> {
    if let Ok((rest, bangs)) = many1(terminated(char('!'), sp))(input) {
        let (rest, operand) = cut(parse_member)(rest)?;
        let expr = bangs.iter().fold(operand, |expr, _| not(expr));
        return Ok((rest, expr));
    }
    if let Ok((rest, minuses)) = many1(terminated(char('-'), sp))(input) {
        let (rest, operand) = cut(parse_member)(rest)?;
        // -1 is a literal, not a negation
        let folded = operand.as_literal().and_then(negate);
        let (operand, remaining) = match folded {
            Some(value) => (lit(value), minuses.len() - 1),
            None => (operand, minuses.len()),
        };
        let expr = (0..remaining).fold(operand, |expr, _| unary(UnaryOp::Neg, expr));
        return Ok((rest, expr));
    }
    parse_member(input)
}

/// A primary followed by any number of `.field`, `.method(...)` and
/// `[index]` suffixes.
fn parse_member(input: &str) -> PResult<'_, Expr> {
    let (mut input, mut expr) = parse_primary(input)?;
    loop {
        let (rest, _) = sp(input)?;
        if let Ok((after_dot, _)) = char::<_, super::SyntaxError>('.')(rest) {
            let (after_dot, _) = sp(after_dot)?;
            let (after_name, name) = cut(identifier)(after_dot)?;
            match call_args(after_name)? {
                (after_call, Some(args)) => {
                    expr = macros::member_call(expr, name, args)
                        .map_err(|message| failure(after_dot, message))?;
                    input = after_call;
                }
                (_, None) => {
                    expr = select(expr, name);
                    input = after_name;
                }
            }
        } else if let Ok((after_bracket, _)) = sym('[')(rest) {
            let (after_index, idx) = cut(parse_expr)(after_bracket)?;
            let (after_index, _) = sp(after_index)?;
            let (after_index, _) = expect(']')(after_index)?;
            expr = index(expr, idx);
            input = after_index;
        } else {
            break;
        }
    }
    Ok((input, expr))
}

/// `( args )` following a function name, if present.
fn call_args(input: &str) -> PResult<'_, Option<Vec<Expr>>> {
    let Ok((rest, _)) = sym('(')(input) else {
        return Ok((input, None));
    };
    let (rest, args) = separated_list0(sym(','), parse_expr)(rest)?;
    let (rest, _) = sp(rest)?;
    let (rest, _) = expect(')')(rest)?;
    Ok((rest, Some(args)))
}

fn parse_primary(input: &str) -> PResult<'_, Expr> {
    match parse_literal(input) {
        Ok((rest, value)) => return Ok((rest, lit(value))),
        Err(nom::Err::Failure(e)) => return Err(nom::Err::Failure(e)),
        Err(_) => {}
    }
    if let Ok((rest, _)) = sym('(')(input) {
        let (rest, expr) = cut(parse_expr)(rest)?;
        let (rest, _) = sp(rest)?;
        let (rest, _) = expect(')')(rest)?;
        return Ok((rest, expr));
    }
    if let Ok((rest, _)) = sym('[')(input) {
        let (rest, items) = separated_list0(sym(','), parse_expr)(rest)?;
        let (rest, _) = opt(sym(','))(rest)?;
        let (rest, _) = sp(rest)?;
        let (rest, _) = expect(']')(rest)?;
        return Ok((rest, Expr::new(ExprKind::List(items))));
    }
    if let Ok((rest, _)) = sym('{')(input) {
        let (rest, entries) = separated_list0(sym(','), parse_map_entry)(rest)?;
        let (rest, _) = opt(sym(','))(rest)?;
        let (rest, _) = sp(rest)?;
        let (rest, _) = expect('}')(rest)?;
        return Ok((rest, map(entries)));
    }

    let (rest, name) = identifier(input)?;
    match call_args(rest)? {
        (after_call, Some(args)) => {
            let expr = macros::global_call(name, args).map_err(|message| failure(input, message))?;
            Ok((after_call, expr))
        }
        (_, None) => Ok((rest, Expr::new(ExprKind::Ident(name.to_string())))),
    }
}

fn parse_map_entry(input: &str) -> PResult<'_, (Expr, Expr)> {
    let (rest, key) = parse_expr(input)?;
    let (rest, _) = sym(':')(rest)?;
    let (rest, value) = cut(parse_expr)(rest)?;
    Ok((rest, (key, value)))
}
