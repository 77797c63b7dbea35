//! Lowering errors.

use crate::cst::Rule;
use thiserror::Error;

/// Lowering error. The first unsupported or malformed node aborts lowering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    /// A grammar alternative outside the subset.
    #[error("unsupported {rule}: `{text}`")]
    Unsupported { rule: Rule, text: String },
    /// A child the grammar guarantees is absent.
    #[error("malformed {rule}: missing {expected}")]
    MissingChild { rule: Rule, expected: &'static str },
    /// A NUMBER token that is not a decimal integer fitting 64 bits.
    #[error("invalid integer literal `{text}`")]
    InvalidLiteral { text: String },
}

/// Result alias for lowering operations.
pub type LowerResult<T> = Result<T, LowerError>;
