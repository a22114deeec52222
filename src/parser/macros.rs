//! Parse-time macro expansion.
//!
//! A call is a macro only when both its name and its argument count
//! match; anything else stays an ordinary call for the checker to resolve.

use crate::ast::builders::{call, comprehension, member};
use crate::ast::{ComprehensionKind, Expr, ExprKind};

/// `has(x.f)` or an ordinary global call.
pub(super) fn global_call(function: &str, mut args: Vec<Expr>) -> Result<Expr, String> {
    if function != "has" || args.len() != 1 {
        return Ok(call(function, args));
    }
    let mut arg = args.remove(0);
    match &mut arg.kind {
        ExprKind::Select { test_only, .. } if !*test_only => {
            *test_only = true;
            Ok(arg)
        }
        _ => Err("invalid argument to has() macro".to_string()),
    }
}

/// A comprehension macro or an ordinary member call.
pub(super) fn member_call(target: Expr, function: &str, args: Vec<Expr>) -> Result<Expr, String> {
    let kind = match (function, args.len()) {
        ("all", 2) => ComprehensionKind::All,
        ("exists", 2) => ComprehensionKind::Exists,
        ("exists_one", 2) => ComprehensionKind::ExistsOne,
        ("filter", 2) => ComprehensionKind::Filter,
        ("map", 2 | 3) => ComprehensionKind::Map,
        ("mapDistinct", 2 | 3) => ComprehensionKind::MapDistinct,
        _ => return Ok(member(target, function, args)),
    };

    let mut args = args.into_iter();
    let iter_var = match args.next().map(|arg| arg.kind) {
        Some(ExprKind::Ident(name)) => name,
        _ => return Err(format!("{}() variable name must be a simple identifier", function)),
    };
    let rest: Vec<Expr> = args.collect();

    let (predicate, result) = match (kind, <[Expr; 2]>::try_from(rest)) {
        (ComprehensionKind::Map | ComprehensionKind::MapDistinct, Ok([predicate, result])) => {
            (Some(predicate), Some(result))
        }
        (ComprehensionKind::Map | ComprehensionKind::MapDistinct, Err(mut rest)) => {
            (None, rest.pop())
        }
        (_, Err(mut rest)) => (rest.pop(), None),
        (_, Ok(_)) => return Err(format!("wrong number of arguments to {}()", function)),
    };
    Ok(comprehension(kind, target, &iter_var, predicate, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{ident, select};

    #[test]
    fn test_has_requires_select() {
        let expr = global_call("has", vec![select(ident("a"), "b")]).unwrap();
        assert!(matches!(expr.kind, ExprKind::Select { test_only: true, .. }));
        assert!(global_call("has", vec![ident("a")]).is_err());
        assert!(matches!(
            global_call("size", vec![ident("a")]).unwrap().kind,
            ExprKind::Call { .. }
        ));
    }

    #[test]
    fn test_macro_arity_selects_expansion() {
        let three = member_call(
            ident("xs"),
            "map",
            vec![ident("x"), ident("p"), ident("r")],
        )
        .unwrap();
        let ExprKind::Comprehension(c) = three.kind else {
            panic!("expected a comprehension");
        };
        assert_eq!(c.predicate, Some(ident("p")));
        assert_eq!(c.result, Some(ident("r")));

        let plain = member_call(ident("xs"), "map", vec![ident("x")]).unwrap();
        assert!(matches!(plain.kind, ExprKind::Call { .. }));
        assert!(member_call(ident("xs"), "all", vec![ident("x"), ident("p"), ident("q")])
            .unwrap()
            .kind
            .eq(&ExprKind::Call {
                function: "all".to_string(),
                target: Some(Box::new(ident("xs"))),
                args: vec![ident("x"), ident("p"), ident("q")],
            }));
    }

    #[test]
    fn test_iteration_variable_must_be_a_name() {
        let err = member_call(ident("xs"), "exists", vec![select(ident("a"), "b"), ident("p")]);
        assert!(err.is_err());
    }
}
