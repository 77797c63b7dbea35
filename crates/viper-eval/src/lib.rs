//! Viper tree-walking evaluator.
//!
//! Executes lowered Viper programs directly from the AST in `viper-types`.
//! A [`Module`] is the host-facing handle: load a program once, then read its
//! bindings or call its functions with plain host values.

pub mod config;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod module;
mod stack;
pub mod test_runner;
pub mod value;

pub use config::{Config, Truthiness};
pub use env::{Environment, Frame};
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use module::Module;
pub use test_runner::{run_tests, TestResult, TestRunSummary};
pub use value::{HostValue, Kind, Value};
