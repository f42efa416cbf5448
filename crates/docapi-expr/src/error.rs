//! Errors raised while parsing or evaluating an expression.
//!
//! Both kinds abort only the directive being expanded; the pipeline turns
//! them into inline diagnostics.

use thiserror::Error;

/// The expression text is not in the grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the expression text.
    pub offset: usize,
}

/// The expression parsed but could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A spread element did not evaluate to the container's own kind.
    #[error("cannot spread {found} into an {container} literal, expected {expected}")]
    SpreadMismatch {
        container: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// The callee of a call is not a builtin.
    #[error("'{callee}' is not a function")]
    NotCallable { callee: String },

    /// Member access on a value that has no members.
    #[error("can't read '{member}' of {found}")]
    NotAccessible { member: String, found: &'static str },

    /// A builtin rejected its arguments.
    #[error("{builtin}(): {message}")]
    Builtin { builtin: String, message: String },
}

/// Either failure, for callers that parse and evaluate in one step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
