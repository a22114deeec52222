pub mod builders;
pub mod expr;
pub mod operators;
pub mod values;

pub use self::expr::{Comprehension, ComprehensionKind, Expr, ExprKind, MapEntry};
pub use self::operators::{
    ATOM_PRECEDENCE, BinaryOp, COMPARISON_PRECEDENCE, NEG_PRECEDENCE, NOT_PRECEDENCE, UnaryOp,
};
pub use self::values::Value;
