//! Module: a loaded program exposed to host code.
//!
//! Loading runs the program once against a fresh environment. Its module
//! frame then stays alive inside the handle so the host can look up bindings
//! and call functions by name, any number of times.

use crate::config::Config;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::{HostValue, Value};
use std::collections::HashMap;
use tracing::debug;
use viper_types::ast::*;

/// A program that has been executed, with its module frame retained.
pub struct Module {
    eval: Evaluator,
}

impl Module {
    /// Execute `program` in a fresh single-frame environment.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn load(program: &Block, config: Config) -> EvalResult<Self> {
        let mut eval = Evaluator::new(config);
        eval.execute_module(program)?;
        let module = Self { eval };
        debug!(bindings = module.bindings().count(), "module loaded");
        Ok(module)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Bindings
    // ══════════════════════════════════════════════════════════════════════

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.eval
            .env
            .module_bindings()
            .and_then(|bindings| bindings.get(name))
    }

    /// Names bound at module level, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings().map(|(name, _)| name).collect();
        names.sort_unstable();
        names
    }

    /// Module-level bindings, in no particular order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.eval
            .env
            .module_bindings()
            .into_iter()
            .flat_map(HashMap::iter)
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.eval
    }

    // ══════════════════════════════════════════════════════════════════════
    // Host calls
    // ══════════════════════════════════════════════════════════════════════

    /// Call the module-level function `name` with raw host arguments.
    ///
    /// Arguments become literal expressions and go through the ordinary call
    /// protocol, so arity and depth checks apply exactly as for interpreted
    /// calls.
    pub fn call(&mut self, name: &str, args: &[HostValue]) -> EvalResult<HostValue> {
        match self.get(name) {
            Some(Value::Function(_)) => {}
            Some(_) => {
                return Err(EvalError::NotAFunction {
                    name: name.to_string(),
                })
            }
            None => {
                return Err(EvalError::NameNotFound {
                    name: name.to_string(),
                })
            }
        }
        let call = Expr::call(
            Expr::ident(name),
            args.iter().map(host_to_expr).collect(),
        );
        let value = self.eval.evaluate(&call)?;
        Ok(value.to_host())
    }

    /// Like [`Module::call`], with arguments given as a JSON array and the
    /// result returned as JSON.
    pub fn call_json(&mut self, name: &str, args_json: &str) -> EvalResult<String> {
        let args: Vec<HostValue> = serde_json::from_str(args_json)
            .map_err(|e| EvalError::HostArguments(e.to_string()))?;
        let result = self.call(name, &args)?;
        serde_json::to_string(&result).map_err(|e| EvalError::HostArguments(e.to_string()))
    }
}

/// Wrap a host payload as a literal expression. Functions are passed by name
/// and resolve against the module frame when the argument is evaluated.
fn host_to_expr(value: &HostValue) -> Expr {
    match value {
        HostValue::None => Expr::None,
        HostValue::Bool(b) => Expr::Bool(*b),
        HostValue::Int(n) => Expr::Int(*n),
        HostValue::Function(name) => Expr::ident(name.as_str()),
    }
}
