//! Frame stack for the Viper evaluator.

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use std::collections::HashMap;

/// One level of the frame stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Name bindings of the module or of one call.
    Scope(HashMap<String, Value>),
    /// The result of a `return`, waiting to be collected by the caller.
    Return(Value),
}

impl Frame {
    pub fn scope() -> Self {
        Frame::Scope(HashMap::new())
    }
}

/// Stack of frames, bottom frame first.
///
/// Lookup is dynamic: names resolve against the most recently pushed frame
/// first, all the way down to the module frame. Return-signal frames hold no
/// names and are skipped.
#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Environment {
    /// Create an environment holding a single empty module frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::scope()],
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> EvalResult<Frame> {
        self.frames
            .pop()
            .ok_or(EvalError::StackDiscipline("pop on an empty frame stack"))
    }

    /// The top frame.
    pub fn peek(&mut self) -> EvalResult<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or(EvalError::StackDiscipline("peek on an empty frame stack"))
    }

    /// Number of frames currently on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop frames until at most `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    pub fn resolve(&self, name: &str) -> EvalResult<Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Scope(bindings) => bindings.get(name),
                Frame::Return(_) => None,
            })
            .cloned()
            .ok_or_else(|| EvalError::NameNotFound {
                name: name.to_string(),
            })
    }

    /// Bind `name` in the top frame, replacing any previous binding there.
    pub fn define(&mut self, name: &str, value: Value) -> EvalResult<()> {
        match self.peek()? {
            Frame::Scope(bindings) => {
                bindings.insert(name.to_string(), value);
                Ok(())
            }
            Frame::Return(_) => Err(EvalError::StackDiscipline(
                "binding into a pending return frame",
            )),
        }
    }

    /// Bindings of the bottom (module) frame.
    pub fn module_bindings(&self) -> Option<&HashMap<String, Value>> {
        match self.frames.first() {
            Some(Frame::Scope(bindings)) => Some(bindings),
            _ => None,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
