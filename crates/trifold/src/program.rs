//! The validated instruction list the engine executes.
//!
//! One enum variant per opcode, matched exhaustively by the engine, so adding
//! an opcode is a compile-time coverage obligation. Operands are fully typed:
//! shape and arity problems cannot reach the engine, they are parse errors.

use std::fmt;

use crate::frames::FrameTag;
use crate::value::{DataType, Value};

/// A variable reference: frame tag plus name, e.g. `GF@counter`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub frame: FrameTag,
    pub name: String,
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.frame, self.name)
    }
}

/// A symbol operand: either a constant literal or a variable reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Symb {
    Var(VarRef),
    Const(Value),
}

/// One executable instruction with its typed operands.
///
/// Stack-flavored twins carry no operands (beyond a label for the conditional
/// jumps); they pop their inputs from the data stack in reverse order and push
/// one result, under the same type rules as their explicit forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Frames and assignment
    Move { dst: VarRef, src: Symb },
    CreateFrame,
    PushFrame,
    PopFrame,
    DefVar { var: VarRef },

    // Control transfer
    Call { label: String },
    Return,
    Label { name: String },
    Jump { label: String },
    JumpIfEq { label: String, a: Symb, b: Symb },
    JumpIfNeq { label: String, a: Symb, b: Symb },

    // Data stack
    Pushs { src: Symb },
    Pops { dst: VarRef },
    Clears,

    // Arithmetic
    Add { dst: VarRef, a: Symb, b: Symb },
    Sub { dst: VarRef, a: Symb, b: Symb },
    Mul { dst: VarRef, a: Symb, b: Symb },
    IDiv { dst: VarRef, a: Symb, b: Symb },
    Div { dst: VarRef, a: Symb, b: Symb },

    // Relational
    Lt { dst: VarRef, a: Symb, b: Symb },
    Gt { dst: VarRef, a: Symb, b: Symb },
    Eq { dst: VarRef, a: Symb, b: Symb },

    // Boolean
    And { dst: VarRef, a: Symb, b: Symb },
    Or { dst: VarRef, a: Symb, b: Symb },
    Not { dst: VarRef, src: Symb },

    // Conversions
    Int2Char { dst: VarRef, src: Symb },
    Stri2Int { dst: VarRef, src: Symb, index: Symb },
    Int2Float { dst: VarRef, src: Symb },
    Float2Int { dst: VarRef, src: Symb },

    // IO
    Read { dst: VarRef, ty: DataType },
    Write { src: Symb },

    // Strings
    Concat { dst: VarRef, a: Symb, b: Symb },
    Strlen { dst: VarRef, src: Symb },
    GetChar { dst: VarRef, src: Symb, index: Symb },
    SetChar { dst: VarRef, index: Symb, replacement: Symb },

    // Introspection and diagnostics
    Type { dst: VarRef, src: Symb },
    DPrint { src: Symb },
    Break,

    // Stack-flavored twins
    Adds,
    Subs,
    Muls,
    IDivs,
    Divs,
    Lts,
    Gts,
    Eqs,
    Ands,
    Ors,
    Nots,
    Int2Chars,
    Stri2Ints,
    Int2Floats,
    Float2Ints,
    JumpIfEqs { label: String },
    JumpIfNeqs { label: String },
}
