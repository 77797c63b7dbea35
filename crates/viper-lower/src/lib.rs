//! Viper lowering pass.
//!
//! Turns an externally built Python parse tree into the AST defined in
//! `viper-types`. The tree is read through the [`SyntaxNode`] trait, so any
//! parser can feed it; [`tree::Node`] is an owned implementation with
//! builders for hand-made trees.

pub mod cst;
pub mod error;
pub mod lower;
pub mod tree;

pub use cst::{Rule, SyntaxNode, TokenKind};
pub use error::{LowerError, LowerResult};
pub use lower::{lower_expression, lower_file, Lowerer};
pub use tree::Node;
