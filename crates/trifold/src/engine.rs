//! The execution engine: fetch, dispatch, execute.
//!
//! A state machine over a fixed, pre-validated instruction array with an
//! explicit mutable instruction pointer - plain iteration would not do,
//! because control-transfer opcodes move it non-locally. The pointer is
//! advanced past the current instruction before dispatch, so CALL pushes the
//! follow-on index as-is and branch handlers simply overwrite the pointer.
//! The run ends when the pointer passes the end of the program.

use std::fmt::Write;

use crate::error::RunResult;
use crate::frames::MemoryModel;
use crate::io::{InputSource, OutputSink};
use crate::labels::LabelTable;
use crate::operators::{self, ArithOp, BoolOp, CmpOp};
use crate::program::{Instruction, Symb, VarRef};
use crate::stack::{CallStack, DataStack};
use crate::value::Value;

/// Tunable engine behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Make a duplicate DEFVAR into LF fault like GF/TF. Off by default for
    /// compatibility with the reference behavior, which silently ignores it.
    pub strict_local_redefine: bool,
}

/// Statistics exposed after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Total instructions executed (every fetch counts, including LABEL).
    pub executed: usize,
    /// Historical maximum of simultaneously defined variables across all
    /// frames - not the count at termination.
    pub max_vars: usize,
}

/// Single-owner interpreter state: frames, both stacks, label table and the
/// instruction pointer all live here, unshared and unlocked.
#[derive(Debug)]
pub struct ExecutionEngine<'r, I: InputSource, O: OutputSink> {
    program: &'r [Instruction],
    labels: LabelTable,
    memory: MemoryModel,
    data_stack: DataStack,
    call_stack: CallStack,
    ip: usize,
    executed: usize,
    input: &'r mut I,
    output: &'r mut O,
}

/// Parses nothing, validates nothing: runs an already-validated program to
/// completion and returns its statistics.
pub fn run_program<I: InputSource, O: OutputSink>(
    program: &[Instruction],
    options: EngineOptions,
    input: &mut I,
    output: &mut O,
) -> RunResult<RunStats> {
    ExecutionEngine::new(program, options, input, output)?.run()
}

impl<'r, I: InputSource, O: OutputSink> ExecutionEngine<'r, I, O> {
    /// Builds the label table (one forward pass; duplicate labels fault here,
    /// before anything executes) and an engine positioned at instruction 0.
    pub fn new(
        program: &'r [Instruction],
        options: EngineOptions,
        input: &'r mut I,
        output: &'r mut O,
    ) -> RunResult<Self> {
        Ok(Self {
            program,
            labels: LabelTable::build(program)?,
            memory: MemoryModel::new(options.strict_local_redefine),
            data_stack: DataStack::new(),
            call_stack: CallStack::new(),
            ip: 0,
            executed: 0,
            input,
            output,
        })
    }

    /// Runs to completion or to the first fault.
    pub fn run(mut self) -> RunResult<RunStats> {
        let program = self.program;
        while self.ip < program.len() {
            let instruction = &program[self.ip];
            self.ip += 1;
            self.executed += 1;
            self.step(instruction)?;
        }
        Ok(RunStats {
            executed: self.executed,
            max_vars: self.memory.vars_high_water(),
        })
    }

    fn step(&mut self, instruction: &Instruction) -> RunResult<()> {
        match instruction {
            Instruction::Move { dst, src } => {
                let value = self.read_symb(src, true)?;
                self.assign(dst, value)
            }
            Instruction::CreateFrame => {
                self.memory.create_temporary();
                Ok(())
            }
            Instruction::PushFrame => self.memory.push_frame(),
            Instruction::PopFrame => self.memory.pop_frame(),
            Instruction::DefVar { var } => self.memory.define(var.frame, &var.name),

            Instruction::Call { label } => {
                let target = self.labels.resolve(label)?;
                // ip already points at the instruction after the call site.
                self.call_stack.push(self.ip);
                self.ip = target;
                Ok(())
            }
            Instruction::Return => {
                self.ip = self.call_stack.pop()?;
                Ok(())
            }
            Instruction::Label { .. } => Ok(()),
            Instruction::Jump { label } => {
                self.ip = self.labels.resolve(label)?;
                Ok(())
            }
            Instruction::JumpIfEq { label, a, b } => {
                let a = self.read_symb(a, false)?;
                let b = self.read_symb(b, false)?;
                self.branch_if(label, true, &a, &b)
            }
            Instruction::JumpIfNeq { label, a, b } => {
                let a = self.read_symb(a, false)?;
                let b = self.read_symb(b, false)?;
                self.branch_if(label, false, &a, &b)
            }

            Instruction::Pushs { src } => {
                let value = self.read_symb(src, true)?;
                self.data_stack.push(value);
                Ok(())
            }
            Instruction::Pops { dst } => {
                let value = self.data_stack.pop()?;
                self.assign(dst, value)
            }
            Instruction::Clears => {
                self.data_stack.clear();
                Ok(())
            }

            Instruction::Add { dst, a, b } => self.binary_arith(ArithOp::Add, dst, a, b),
            Instruction::Sub { dst, a, b } => self.binary_arith(ArithOp::Sub, dst, a, b),
            Instruction::Mul { dst, a, b } => self.binary_arith(ArithOp::Mul, dst, a, b),
            Instruction::IDiv { dst, a, b } => self.binary_arith(ArithOp::IDiv, dst, a, b),
            Instruction::Div { dst, a, b } => self.binary_arith(ArithOp::Div, dst, a, b),

            Instruction::Lt { dst, a, b } => self.binary_compare(CmpOp::Lt, dst, a, b),
            Instruction::Gt { dst, a, b } => self.binary_compare(CmpOp::Gt, dst, a, b),
            Instruction::Eq { dst, a, b } => self.binary_compare(CmpOp::Eq, dst, a, b),

            Instruction::And { dst, a, b } => self.binary_boolean(BoolOp::And, dst, a, b),
            Instruction::Or { dst, a, b } => self.binary_boolean(BoolOp::Or, dst, a, b),
            Instruction::Not { dst, src } => {
                let value = self.read_symb(src, true)?;
                let result = operators::not(&value)?;
                self.assign(dst, result)
            }

            Instruction::Int2Char { dst, src } => {
                let value = self.read_symb(src, true)?;
                let result = operators::int_to_char(&value)?;
                self.assign(dst, result)
            }
            Instruction::Stri2Int { dst, src, index } => {
                let src = self.read_symb(src, true)?;
                let index = self.read_symb(index, true)?;
                let result = operators::char_to_int(&src, &index)?;
                self.assign(dst, result)
            }
            Instruction::Int2Float { dst, src } => {
                let value = self.read_symb(src, true)?;
                let result = operators::int_to_float(&value)?;
                self.assign(dst, result)
            }
            Instruction::Float2Int { dst, src } => {
                let value = self.read_symb(src, true)?;
                let result = operators::float_to_int(&value)?;
                self.assign(dst, result)
            }

            Instruction::Read { dst, ty } => {
                let line = self.input.read_line();
                let value = operators::read_input(line.as_deref(), *ty);
                self.assign(dst, value)
            }
            Instruction::Write { src } => {
                let value = self.read_symb(src, true)?;
                let text = value.render()?;
                self.output.primary(&format!("{text}\n"));
                Ok(())
            }

            Instruction::Concat { dst, a, b } => {
                let a = self.read_symb(a, true)?;
                let b = self.read_symb(b, true)?;
                let result = operators::concat(&a, &b)?;
                self.assign(dst, result)
            }
            Instruction::Strlen { dst, src } => {
                let value = self.read_symb(src, true)?;
                let result = operators::string_length(&value)?;
                self.assign(dst, result)
            }
            Instruction::GetChar { dst, src, index } => {
                let src = self.read_symb(src, true)?;
                let index = self.read_symb(index, true)?;
                let result = operators::get_char(&src, &index)?;
                self.assign(dst, result)
            }
            Instruction::SetChar { dst, index, replacement } => {
                // The destination doubles as an operand and must already hold
                // a string.
                let current = self.memory.lookup(dst.frame, &dst.name, true)?.clone();
                let index = self.read_symb(index, true)?;
                let replacement = self.read_symb(replacement, true)?;
                let result = operators::set_char(&current, &index, &replacement)?;
                self.assign(dst, result)
            }

            Instruction::Type { dst, src } => {
                // The one read of an unassigned slot that never faults.
                let value = self.read_symb(src, false)?;
                self.assign(dst, operators::type_of(&value))
            }
            Instruction::DPrint { src } => {
                let value = self.read_symb(src, true)?;
                let text = value.render()?;
                self.output.diagnostic(&format!("{text}\n"));
                Ok(())
            }
            Instruction::Break => {
                self.break_dump();
                Ok(())
            }

            Instruction::Adds => self.stack_arith(ArithOp::Add),
            Instruction::Subs => self.stack_arith(ArithOp::Sub),
            Instruction::Muls => self.stack_arith(ArithOp::Mul),
            Instruction::IDivs => self.stack_arith(ArithOp::IDiv),
            Instruction::Divs => self.stack_arith(ArithOp::Div),
            Instruction::Lts => self.stack_compare(CmpOp::Lt),
            Instruction::Gts => self.stack_compare(CmpOp::Gt),
            Instruction::Eqs => self.stack_compare(CmpOp::Eq),
            Instruction::Ands => self.stack_boolean(BoolOp::And),
            Instruction::Ors => self.stack_boolean(BoolOp::Or),
            Instruction::Nots => {
                let value = self.data_stack.pop()?;
                let result = operators::not(&value)?;
                self.data_stack.push(result);
                Ok(())
            }
            Instruction::Int2Chars => self.stack_unary(operators::int_to_char),
            Instruction::Stri2Ints => {
                let (src, index) = self.pop_pair()?;
                let result = operators::char_to_int(&src, &index)?;
                self.data_stack.push(result);
                Ok(())
            }
            Instruction::Int2Floats => self.stack_unary(operators::int_to_float),
            Instruction::Float2Ints => self.stack_unary(operators::float_to_int),
            Instruction::JumpIfEqs { label } => {
                let (a, b) = self.pop_pair()?;
                self.branch_if(label, true, &a, &b)
            }
            Instruction::JumpIfNeqs { label } => {
                let (a, b) = self.pop_pair()?;
                self.branch_if(label, false, &a, &b)
            }
        }
    }

    /// Resolves a symbol to a value: constants evaluate to themselves,
    /// variable references go through the memory model.
    fn read_symb(&self, symb: &Symb, require_initialized: bool) -> RunResult<Value> {
        match symb {
            Symb::Const(value) => Ok(value.clone()),
            Symb::Var(var) => self
                .memory
                .lookup(var.frame, &var.name, require_initialized)
                .cloned(),
        }
    }

    fn assign(&mut self, dst: &VarRef, value: Value) -> RunResult<()> {
        self.memory.assign(dst.frame, &dst.name, value)
    }

    /// Pops two operands in reverse order: the deeper value is the first
    /// logical operand.
    fn pop_pair(&mut self) -> RunResult<(Value, Value)> {
        let b = self.data_stack.pop()?;
        let a = self.data_stack.pop()?;
        Ok((a, b))
    }

    fn branch_if(&mut self, label: &str, want_equal: bool, a: &Value, b: &Value) -> RunResult<()> {
        let target = self.labels.resolve(label)?;
        if operators::values_equal(a, b)? == want_equal {
            self.ip = target;
        }
        Ok(())
    }

    fn binary_arith(&mut self, op: ArithOp, dst: &VarRef, a: &Symb, b: &Symb) -> RunResult<()> {
        let a = self.read_symb(a, true)?;
        let b = self.read_symb(b, true)?;
        let result = operators::arith(op, &a, &b)?;
        self.assign(dst, result)
    }

    fn binary_compare(&mut self, op: CmpOp, dst: &VarRef, a: &Symb, b: &Symb) -> RunResult<()> {
        // Only EQ tolerates unassigned operands (two of them compare equal).
        let require_initialized = op != CmpOp::Eq;
        let a = self.read_symb(a, require_initialized)?;
        let b = self.read_symb(b, require_initialized)?;
        let result = operators::compare(op, &a, &b)?;
        self.assign(dst, result)
    }

    fn binary_boolean(&mut self, op: BoolOp, dst: &VarRef, a: &Symb, b: &Symb) -> RunResult<()> {
        let a = self.read_symb(a, true)?;
        let b = self.read_symb(b, true)?;
        let result = operators::boolean(op, &a, &b)?;
        self.assign(dst, result)
    }

    fn stack_arith(&mut self, op: ArithOp) -> RunResult<()> {
        let (a, b) = self.pop_pair()?;
        let result = operators::arith(op, &a, &b)?;
        self.data_stack.push(result);
        Ok(())
    }

    fn stack_compare(&mut self, op: CmpOp) -> RunResult<()> {
        let (a, b) = self.pop_pair()?;
        let result = operators::compare(op, &a, &b)?;
        self.data_stack.push(result);
        Ok(())
    }

    fn stack_boolean(&mut self, op: BoolOp) -> RunResult<()> {
        let (a, b) = self.pop_pair()?;
        let result = operators::boolean(op, &a, &b)?;
        self.data_stack.push(result);
        Ok(())
    }

    fn stack_unary(&mut self, op: fn(&Value) -> RunResult<Value>) -> RunResult<()> {
        let value = self.data_stack.pop()?;
        let result = op(&value)?;
        self.data_stack.push(result);
        Ok(())
    }

    /// BREAK: writes the counters and the contents of every existing frame to
    /// the diagnostic stream, without touching control flow or state.
    fn break_dump(&mut self) {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "BREAK at instruction {} ({} executed)",
            self.ip - 1,
            self.executed
        );
        let _ = writeln!(
            text,
            "variables defined: {} (high water {})",
            self.memory.vars_current(),
            self.memory.vars_high_water()
        );
        let _ = writeln!(text, "call stack depth: {}", self.call_stack.depth());
        self.data_stack.dump(&mut text);
        self.memory.dump(&mut text);
        self.output.diagnostic(&text);
    }
}
