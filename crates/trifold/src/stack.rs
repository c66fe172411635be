//! The data stack and the call stack.

use std::fmt::Write;

use crate::error::{fault_err, FaultKind, RunResult};
use crate::value::Value;

/// LIFO of values used by PUSHS/POPS and every stack-flavored opcode.
#[derive(Debug, Default)]
pub struct DataStack(Vec<Value>);

impl DataStack {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    /// Pops the top value. Popping an empty data stack is always a
    /// MissingValue fault, whatever opcode triggered the pop.
    pub fn pop(&mut self) -> RunResult<Value> {
        match self.0.pop() {
            Some(value) => Ok(value),
            None => fault_err!(FaultKind::MissingValue; "pop from an empty data stack"),
        }
    }

    /// CLEARS: unconditionally empties the stack.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Writes the stack contents into `out` for BREAK, top first.
    pub fn dump(&self, out: &mut String) {
        let _ = writeln!(out, "data stack ({} values, top first):", self.0.len());
        for value in self.0.iter().rev() {
            let _ = writeln!(out, "  {value}");
        }
    }
}

/// LIFO of instruction indices to resume at after RETURN.
#[derive(Debug, Default)]
pub struct CallStack(Vec<usize>);

impl CallStack {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, return_index: usize) {
        self.0.push(return_index);
    }

    /// Pops the return index; RETURN with no pending call is MissingValue.
    pub fn pop(&mut self) -> RunResult<usize> {
        match self.0.pop() {
            Some(index) => Ok(index),
            None => fault_err!(FaultKind::MissingValue; "RETURN with an empty call stack"),
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_stack_lifo() {
        let mut stack = DataStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        assert_eq!(stack.pop().unwrap(), Value::Int(2));
        assert_eq!(stack.pop().unwrap(), Value::Int(1));
        assert_eq!(stack.pop().unwrap_err().kind(), FaultKind::MissingValue);
    }

    #[test]
    fn test_data_stack_clear() {
        let mut stack = DataStack::new();
        stack.push(Value::Bool(true));
        stack.push(Value::Bool(false));
        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.pop().unwrap_err().kind(), FaultKind::MissingValue);
    }

    #[test]
    fn test_call_stack() {
        let mut stack = CallStack::new();
        stack.push(7);
        stack.push(12);
        assert_eq!(stack.pop().unwrap(), 12);
        assert_eq!(stack.pop().unwrap(), 7);
        assert_eq!(stack.pop().unwrap_err().kind(), FaultKind::MissingValue);
    }
}
