//! Trifold: an interpreter for a small untyped register/stack language with
//! three variable scopes (global, temporary, local), an explicit frame
//! lifecycle, a call stack and a data stack.
//!
//! The [`parse`] function turns source text into a validated instruction
//! list; [`run_program`] (or [`ExecutionEngine`] directly) executes it
//! against pluggable input/output streams and yields [`RunStats`].
//!
//! # Example
//! ```
//! use trifold::{parse, run_program, CollectOutput, EngineOptions, NoInput};
//!
//! let program = parse(".TRIFOLD\nDEFVAR GF@x\nMOVE GF@x string@hello\nWRITE GF@x\n").unwrap();
//! let mut output = CollectOutput::new();
//! run_program(&program, EngineOptions::default(), &mut NoInput, &mut output).unwrap();
//! assert_eq!(output.primary_output(), "hello\n");
//! ```

mod engine;
mod error;
mod frames;
mod io;
mod labels;
mod operators;
mod parser;
mod program;
mod stack;
mod value;

pub use crate::{
    engine::{run_program, EngineOptions, ExecutionEngine, RunStats},
    error::{Fault, FaultKind, RunResult},
    frames::{FrameTag, MemoryModel},
    io::{CollectOutput, InputSource, NoInput, OutputSink, ScriptedInput, StdInput, StdStreams},
    parser::{parse, Opcode, ParseError},
    program::{Instruction, Symb, VarRef},
    value::{float_to_hex, parse_float, DataType, Value},
};
