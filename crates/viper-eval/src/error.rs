//! Runtime error types for the Viper evaluator.

use thiserror::Error;

/// Evaluation error. Every variant aborts the current evaluation; nothing is
/// recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Identifier not bound in any frame.
    #[error("name '{name}' is not defined")]
    NameNotFound { name: String },
    /// Operator applied to kinds it does not support.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Call argument count differs from the parameter count.
    #[error("{name}() takes {expected} positional arguments but {found} were given")]
    ArityError {
        name: String,
        expected: usize,
        found: usize,
    },
    /// Call target is not a function.
    #[error("'{kind}' object is not callable")]
    NotCallable { kind: String },
    /// An `assert` expression was falsy.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),
    /// The node exists in the AST but has no runtime semantics in this subset.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// Integer result does not fit the 64-bit payload.
    #[error("arithmetic overflow: {0}")]
    ArithmeticOverflow(String),
    /// `return` executed at module level.
    #[error("'return' outside function")]
    ReturnOutsideFunction,
    /// Interpreted recursion went deeper than the configured limit.
    #[error("maximum call depth of {limit} exceeded")]
    CallDepthExceeded { limit: usize },
    /// Internal frame-stack invariant broken. Never expected.
    #[error("frame stack discipline violated: {0}")]
    StackDiscipline(&'static str),
    /// Host-side arguments could not be decoded.
    #[error("invalid host arguments: {0}")]
    HostArguments(String),
    /// The host asked to call a binding that does not hold a function.
    #[error("module binding '{name}' is not a function")]
    NotAFunction { name: String },
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
