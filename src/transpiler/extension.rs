//! Pluggable function translation.

use crate::ast::{COMPARISON_PRECEDENCE, Expr};
use crate::checker::FunctionDecl;
use crate::error::CelSqlResult;
use crate::transpiler::Converter;

/// Translates function calls the converter has no built-in rule for.
///
/// Extensions are consulted in registration order and the first one whose
/// [`implements_function`](Extension::implements_function) returns `true`
/// handles the call. The call's target and arguments arrive as typed
/// nodes; the extension renders them through the converter handle so that
/// literals still go through the value tracker.
pub trait Extension {
    fn implements_function(&self, function: &str) -> bool;

    fn call_function(
        &self,
        con: &mut Converter<'_>,
        function: &str,
        target: Option<&Expr>,
        args: &[Expr],
    ) -> CelSqlResult<()>;

    /// Signatures to register with the checker.
    fn declarations(&self) -> Vec<FunctionDecl> {
        Vec::new()
    }

    /// Binding strength of the emitted SQL, used to parenthesize the call
    /// when it is an operand.
    fn precedence(&self, _function: &str) -> u8 {
        COMPARISON_PRECEDENCE
    }
}
