//! Core expression and statement evaluator.

use crate::config::Config;
use crate::env::{Environment, Frame};
use crate::error::{EvalError, EvalResult};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};
use viper_types::ast::*;

/// The core evaluator: walks AST nodes against its frame stack.
pub struct Evaluator {
    /// Frame stack. The bottom frame is the module frame.
    pub env: Environment,
    config: Config,
    /// Interpreted calls currently in progress.
    call_depth: usize,
}

impl Evaluator {
    /// Create an evaluator with a fresh single-frame environment.
    pub fn new(config: Config) -> Self {
        Self {
            env: Environment::new(),
            config,
            call_depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn truthy(&self, value: &Value) -> bool {
        value.is_truthy(self.config.truthiness)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        ensure_sufficient_stack(|| self.eval_expr(expr))
    }

    fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),

            Expr::Identifier(name) => self.env.resolve(name),

            Expr::Unary { op, operand } => self.eval_unary(expr, *op, operand),
            Expr::Binary { op, lhs, rhs } => self.eval_binary(expr, *op, lhs, rhs),
            Expr::Ternary {
                body,
                condition,
                orelse,
            } => {
                let cond = self.evaluate(condition)?;
                if self.truthy(&cond) {
                    self.evaluate(body)
                } else {
                    self.evaluate(orelse)
                }
            }

            Expr::Call { callee, args } => self.eval_call(callee, args),
        }
    }

    fn eval_unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        match op {
            UnaryOp::Not => {
                let value = self.evaluate(operand)?;
                Ok(Value::Bool(!self.truthy(&value)))
            }
            UnaryOp::Neg | UnaryOp::Pos | UnaryOp::BitNot | UnaryOp::Star => {
                Err(EvalError::NotImplemented(expr.to_string()))
            }
        }
    }

    fn eval_binary(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> EvalResult<Value> {
        match op {
            // Both sides are always evaluated; expressions carry no side
            // effects that would make skipping observable.
            BinaryOp::Or | BinaryOp::And => {
                let lv = self.evaluate(lhs)?;
                let rv = self.evaluate(rhs)?;
                let (l, r) = (self.truthy(&lv), self.truthy(&rv));
                Ok(Value::Bool(if op == BinaryOp::Or { l || r } else { l && r }))
            }
            BinaryOp::Add => {
                let lv = self.evaluate(lhs)?;
                let rv = self.evaluate(rhs)?;
                lv.add(&rv)
            }
            BinaryOp::Sub => {
                let lv = self.evaluate(lhs)?;
                let rv = self.evaluate(rhs)?;
                lv.sub(&rv)
            }
            op if op.is_comparison() => {
                let lv = self.evaluate(lhs)?;
                let rv = self.evaluate(rhs)?;
                lv.compare(op, &rv).map(Value::Bool)
            }
            _ => Err(EvalError::NotImplemented(expr.to_string())),
        }
    }

    // ── Calls ────────────────────────────────────────────────────────────

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> EvalResult<Value> {
        let def = match self.evaluate(callee)? {
            Value::Function(def) => def,
            other => {
                return Err(EvalError::NotCallable {
                    kind: other.kind().to_string(),
                })
            }
        };
        if args.len() != def.params.len() {
            return Err(EvalError::ArityError {
                name: def.name.clone(),
                expected: def.params.len(),
                found: args.len(),
            });
        }
        if self.call_depth >= self.config.max_call_depth {
            return Err(EvalError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }

        // Arguments see the caller's frames.
        let mut bindings = HashMap::with_capacity(args.len());
        for (param, arg) in def.params.iter().zip(args) {
            bindings.insert(param.clone(), self.evaluate(arg)?);
        }

        let base = self.env.depth();
        self.env.push(Frame::Scope(bindings));
        self.call_depth += 1;
        debug!(function = %def.name, depth = self.call_depth, "call");
        let result = self.run_function_body(&def);
        self.call_depth -= 1;
        match &result {
            Ok(value) => debug!(function = %def.name, result = %value, "return"),
            Err(err) => {
                debug!(function = %def.name, error = %err, "call failed");
                self.env.truncate(base);
            }
        }
        result
    }

    /// Run a body whose argument frame is already pushed, then collect the
    /// return signal and the argument frame, in that order.
    fn run_function_body(&mut self, def: &Rc<FuncDef>) -> EvalResult<Value> {
        if !self.execute_block(&def.body)? {
            self.env.push(Frame::Return(Value::None));
        }
        let value = match self.env.pop()? {
            Frame::Return(value) => value,
            Frame::Scope(_) => {
                return Err(EvalError::StackDiscipline(
                    "function body finished without a return frame",
                ))
            }
        };
        match self.env.pop()? {
            Frame::Scope(_) => Ok(value),
            Frame::Return(_) => Err(EvalError::StackDiscipline(
                "second return frame above an argument frame",
            )),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Block & Statement execution
    // ══════════════════════════════════════════════════════════════════════

    /// Execute a block. Returns `true` as soon as a statement posts a return.
    pub fn execute_block(&mut self, block: &Block) -> EvalResult<bool> {
        self.execute_all(&block.stmts)
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> EvalResult<bool> {
        for stmt in stmts {
            if self.execute(stmt)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Execute a single statement. Returns `true` if it, or a statement
    /// nested in it, posted a return frame.
    pub fn execute(&mut self, stmt: &Stmt) -> EvalResult<bool> {
        ensure_sufficient_stack(|| self.exec_stmt(stmt))
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<bool> {
        match stmt {
            Stmt::Assign(assign) => {
                if let Some(value) = &assign.value {
                    let value = self.evaluate(value)?;
                    self.env.define(&assign.target.name, value)?;
                }
                Ok(false)
            }
            Stmt::Assert(exprs) => {
                for expr in exprs {
                    let value = self.evaluate(expr)?;
                    if !self.truthy(&value) {
                        return Err(EvalError::AssertionFailed(expr.to_string()));
                    }
                }
                Ok(false)
            }
            Stmt::If(if_stmt) => {
                let cond = self.evaluate(&if_stmt.condition)?;
                if self.truthy(&cond) {
                    self.execute_block(&if_stmt.body)
                } else if let Some(orelse) = &if_stmt.orelse {
                    self.execute_block(orelse)
                } else {
                    Ok(false)
                }
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::None,
                };
                self.env.push(Frame::Return(value));
                Ok(true)
            }
            Stmt::FunctionDef(def) => {
                trace!(function = %def.name, "define");
                self.env.define(&def.name, Value::Function(Rc::clone(def)))?;
                Ok(false)
            }
            Stmt::Simple(stmts) => self.execute_all(stmts),
            Stmt::Expr(expr) => {
                self.evaluate(expr)?;
                Ok(false)
            }
            Stmt::Pass => Ok(false),
        }
    }

    /// Execute a whole program against the current frames, leaving its
    /// bindings in the top frame.
    pub fn execute_module(&mut self, program: &Block) -> EvalResult<()> {
        if self.execute_block(program)? {
            self.env.pop()?;
            return Err(EvalError::ReturnOutsideFunction);
        }
        Ok(())
    }
}
