//! Parser for the textual Trifold source format.
//!
//! The format is flat: a `.TRIFOLD` header, then one instruction per line
//! (`OPCODE operand ...`), `#` starting a comment anywhere. Operands are
//! `GF@name`/`LF@name`/`TF@name` variable references, `int@`/`bool@`/
//! `float@`/`string@` constants, bare label names, and bare type names for
//! READ. Everything structural - opcode vocabulary, arity, operand shape,
//! identifier charset, string escapes - is validated here, so the engine only
//! ever sees well-formed instructions. Violations are [`ParseError`]s, a
//! separate type from the runtime fault taxonomy.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

use crate::frames::FrameTag;
use crate::program::{Instruction, Symb, VarRef};
use crate::value::{parse_float, DataType, Value};

/// The opcode vocabulary, spelled as in source programs (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Opcode {
    Move,
    CreateFrame,
    PushFrame,
    PopFrame,
    DefVar,
    Call,
    Return,
    Pushs,
    Pops,
    Add,
    Sub,
    Mul,
    IDiv,
    Div,
    Lt,
    Gt,
    Eq,
    And,
    Or,
    Not,
    Int2Char,
    Stri2Int,
    Int2Float,
    Float2Int,
    Read,
    Write,
    Concat,
    Strlen,
    GetChar,
    SetChar,
    Type,
    Label,
    Jump,
    JumpIfEq,
    JumpIfNeq,
    DPrint,
    Break,
    Clears,
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
    JumpIfEqs,
    JumpIfNeqs,
}

/// A structural or lexical error in the source text, with its line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    line: usize,
    message: String,
}

impl ParseError {
    fn new(line: usize, message: String) -> Self {
        Self { line, message }
    }

    /// 1-based source line the error was found on.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Process exit status for source-format errors.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        23
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a complete source text into the validated instruction list the
/// engine consumes.
pub fn parse(source: &str) -> Result<Vec<Instruction>, ParseError> {
    let mut instructions = Vec::new();
    let mut saw_header = false;
    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let line = match raw.split_once('#') {
            Some((code, _comment)) => code,
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        if !saw_header {
            if line.eq_ignore_ascii_case(".TRIFOLD") {
                saw_header = true;
                continue;
            }
            return Err(err(number, "first line must be the .TRIFOLD header"));
        }
        instructions.push(parse_instruction(number, line)?);
    }
    if saw_header {
        Ok(instructions)
    } else {
        Err(err(1, "missing .TRIFOLD header"))
    }
}

fn parse_instruction(line: usize, text: &str) -> Result<Instruction, ParseError> {
    let mut tokens = text.split_whitespace();
    let mnemonic = tokens.next().ok_or_else(|| err(line, "empty instruction"))?;
    let opcode: Opcode = mnemonic
        .parse()
        .map_err(|_| err(line, format!("unknown opcode {mnemonic}")))?;
    let args: Vec<&str> = tokens.collect();

    Ok(match opcode {
        Opcode::Move => {
            let [dst, src] = expect_args(line, opcode, &args)?;
            Instruction::Move {
                dst: parse_var(line, dst)?,
                src: parse_symb(line, src)?,
            }
        }
        Opcode::CreateFrame => {
            expect_args::<0>(line, opcode, &args)?;
            Instruction::CreateFrame
        }
        Opcode::PushFrame => {
            expect_args::<0>(line, opcode, &args)?;
            Instruction::PushFrame
        }
        Opcode::PopFrame => {
            expect_args::<0>(line, opcode, &args)?;
            Instruction::PopFrame
        }
        Opcode::DefVar => {
            let [var] = expect_args(line, opcode, &args)?;
            Instruction::DefVar {
                var: parse_var(line, var)?,
            }
        }
        Opcode::Call => {
            let [label] = expect_args(line, opcode, &args)?;
            Instruction::Call {
                label: parse_label(line, label)?,
            }
        }
        Opcode::Return => {
            expect_args::<0>(line, opcode, &args)?;
            Instruction::Return
        }
        Opcode::Pushs => {
            let [src] = expect_args(line, opcode, &args)?;
            Instruction::Pushs {
                src: parse_symb(line, src)?,
            }
        }
        Opcode::Pops => {
            let [dst] = expect_args(line, opcode, &args)?;
            Instruction::Pops {
                dst: parse_var(line, dst)?,
            }
        }
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::IDiv | Opcode::Div => {
            let (dst, a, b) = parse_ternary(line, opcode, &args)?;
            match opcode {
                Opcode::Add => Instruction::Add { dst, a, b },
                Opcode::Sub => Instruction::Sub { dst, a, b },
                Opcode::Mul => Instruction::Mul { dst, a, b },
                Opcode::IDiv => Instruction::IDiv { dst, a, b },
                _ => Instruction::Div { dst, a, b },
            }
        }
        Opcode::Lt | Opcode::Gt | Opcode::Eq => {
            let (dst, a, b) = parse_ternary(line, opcode, &args)?;
            match opcode {
                Opcode::Lt => Instruction::Lt { dst, a, b },
                Opcode::Gt => Instruction::Gt { dst, a, b },
                _ => Instruction::Eq { dst, a, b },
            }
        }
        Opcode::And | Opcode::Or => {
            let (dst, a, b) = parse_ternary(line, opcode, &args)?;
            if opcode == Opcode::And {
                Instruction::And { dst, a, b }
            } else {
                Instruction::Or { dst, a, b }
            }
        }
        Opcode::Not => {
            let (dst, src) = parse_binary(line, opcode, &args)?;
            Instruction::Not { dst, src }
        }
        Opcode::Int2Char => {
            let (dst, src) = parse_binary(line, opcode, &args)?;
            Instruction::Int2Char { dst, src }
        }
        Opcode::Stri2Int => {
            let (dst, src, index) = parse_ternary(line, opcode, &args)?;
            Instruction::Stri2Int { dst, src, index }
        }
        Opcode::Int2Float => {
            let (dst, src) = parse_binary(line, opcode, &args)?;
            Instruction::Int2Float { dst, src }
        }
        Opcode::Float2Int => {
            let (dst, src) = parse_binary(line, opcode, &args)?;
            Instruction::Float2Int { dst, src }
        }
        Opcode::Read => {
            let [dst, ty] = expect_args(line, opcode, &args)?;
            Instruction::Read {
                dst: parse_var(line, dst)?,
                ty: ty
                    .parse::<DataType>()
                    .map_err(|_| err(line, format!("unknown type name {ty}")))?,
            }
        }
        Opcode::Write => {
            let [src] = expect_args(line, opcode, &args)?;
            Instruction::Write {
                src: parse_symb(line, src)?,
            }
        }
        Opcode::Concat => {
            let (dst, a, b) = parse_ternary(line, opcode, &args)?;
            Instruction::Concat { dst, a, b }
        }
        Opcode::Strlen => {
            let (dst, src) = parse_binary(line, opcode, &args)?;
            Instruction::Strlen { dst, src }
        }
        Opcode::GetChar => {
            let (dst, src, index) = parse_ternary(line, opcode, &args)?;
            Instruction::GetChar { dst, src, index }
        }
        Opcode::SetChar => {
            let (dst, index, replacement) = parse_ternary(line, opcode, &args)?;
            Instruction::SetChar { dst, index, replacement }
        }
        Opcode::Type => {
            let (dst, src) = parse_binary(line, opcode, &args)?;
            Instruction::Type { dst, src }
        }
        Opcode::Label => {
            let [name] = expect_args(line, opcode, &args)?;
            Instruction::Label {
                name: parse_label(line, name)?,
            }
        }
        Opcode::Jump => {
            let [label] = expect_args(line, opcode, &args)?;
            Instruction::Jump {
                label: parse_label(line, label)?,
            }
        }
        Opcode::JumpIfEq | Opcode::JumpIfNeq => {
            let [label, a, b] = expect_args(line, opcode, &args)?;
            let label = parse_label(line, label)?;
            let a = parse_symb(line, a)?;
            let b = parse_symb(line, b)?;
            if opcode == Opcode::JumpIfEq {
                Instruction::JumpIfEq { label, a, b }
            } else {
                Instruction::JumpIfNeq { label, a, b }
            }
        }
        Opcode::DPrint => {
            let [src] = expect_args(line, opcode, &args)?;
            Instruction::DPrint {
                src: parse_symb(line, src)?,
            }
        }
        Opcode::Break => {
            expect_args::<0>(line, opcode, &args)?;
            Instruction::Break
        }
        Opcode::Clears => {
            expect_args::<0>(line, opcode, &args)?;
            Instruction::Clears
        }
        Opcode::JumpIfEqs | Opcode::JumpIfNeqs => {
            let [label] = expect_args(line, opcode, &args)?;
            let label = parse_label(line, label)?;
            if opcode == Opcode::JumpIfEqs {
                Instruction::JumpIfEqs { label }
            } else {
                Instruction::JumpIfNeqs { label }
            }
        }
        Opcode::Adds
        | Opcode::Subs
        | Opcode::Muls
        | Opcode::IDivs
        | Opcode::Divs
        | Opcode::Lts
        | Opcode::Gts
        | Opcode::Eqs
        | Opcode::Ands
        | Opcode::Ors
        | Opcode::Nots
        | Opcode::Int2Chars
        | Opcode::Stri2Ints
        | Opcode::Int2Floats
        | Opcode::Float2Ints => {
            expect_args::<0>(line, opcode, &args)?;
            match opcode {
                Opcode::Adds => Instruction::Adds,
                Opcode::Subs => Instruction::Subs,
                Opcode::Muls => Instruction::Muls,
                Opcode::IDivs => Instruction::IDivs,
                Opcode::Divs => Instruction::Divs,
                Opcode::Lts => Instruction::Lts,
                Opcode::Gts => Instruction::Gts,
                Opcode::Eqs => Instruction::Eqs,
                Opcode::Ands => Instruction::Ands,
                Opcode::Ors => Instruction::Ors,
                Opcode::Nots => Instruction::Nots,
                Opcode::Int2Chars => Instruction::Int2Chars,
                Opcode::Stri2Ints => Instruction::Stri2Ints,
                Opcode::Int2Floats => Instruction::Int2Floats,
                _ => Instruction::Float2Ints,
            }
        }
    })
}

fn parse_binary(line: usize, opcode: Opcode, args: &[&str]) -> Result<(VarRef, Symb), ParseError> {
    let [dst, src] = expect_args(line, opcode, args)?;
    Ok((parse_var(line, dst)?, parse_symb(line, src)?))
}

fn parse_ternary(line: usize, opcode: Opcode, args: &[&str]) -> Result<(VarRef, Symb, Symb), ParseError> {
    let [dst, a, b] = expect_args(line, opcode, args)?;
    Ok((parse_var(line, dst)?, parse_symb(line, a)?, parse_symb(line, b)?))
}

fn expect_args<'a, const N: usize>(line: usize, opcode: Opcode, args: &[&'a str]) -> Result<[&'a str; N], ParseError> {
    <[&'a str; N]>::try_from(args)
        .map_err(|_| err(line, format!("{opcode} expects {N} operands, got {}", args.len())))
}

fn parse_var(line: usize, token: &str) -> Result<VarRef, ParseError> {
    let Some((frame, name)) = token.split_once('@') else {
        return Err(err(line, format!("malformed variable reference {token}")));
    };
    let frame: FrameTag = frame
        .parse()
        .map_err(|_| err(line, format!("unknown frame tag {frame}")))?;
    check_identifier(line, name)?;
    Ok(VarRef {
        frame,
        name: name.to_string(),
    })
}

fn parse_symb(line: usize, token: &str) -> Result<Symb, ParseError> {
    let Some((prefix, literal)) = token.split_once('@') else {
        return Err(err(line, format!("malformed operand {token}")));
    };
    match prefix {
        "GF" | "LF" | "TF" => parse_var(line, token).map(Symb::Var),
        "int" => literal
            .parse::<i64>()
            .map(|v| Symb::Const(Value::Int(v)))
            .map_err(|_| err(line, format!("invalid int literal {literal}"))),
        "bool" => match literal {
            "true" => Ok(Symb::Const(Value::Bool(true))),
            "false" => Ok(Symb::Const(Value::Bool(false))),
            _ => Err(err(line, format!("invalid bool literal {literal}"))),
        },
        "float" => parse_float(literal)
            .map(|v| Symb::Const(Value::Float(v)))
            .ok_or_else(|| err(line, format!("invalid float literal {literal}"))),
        "string" => Ok(Symb::Const(Value::Str(unescape_string(line, literal)?))),
        _ => Err(err(line, format!("unknown operand prefix {prefix}"))),
    }
}

fn parse_label(line: usize, token: &str) -> Result<String, ParseError> {
    check_identifier(line, token)?;
    Ok(token.to_string())
}

/// Decodes `\ddd` escapes: a backslash followed by exactly three decimal
/// digits naming a code point.
fn unescape_string(line: usize, text: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut code = 0u32;
        for _ in 0..3 {
            let digit = chars
                .next()
                .and_then(|d| d.to_digit(10))
                .ok_or_else(|| err(line, "string escape must be a backslash and three digits"))?;
            code = code * 10 + digit;
        }
        let c = char::from_u32(code)
            .ok_or_else(|| err(line, format!("string escape \\{code:03} is not a valid code point")))?;
        out.push(c);
    }
    Ok(out)
}

/// Variable and label names: no leading digit, restricted charset.
fn check_identifier(line: usize, name: &str) -> Result<(), ParseError> {
    const SPECIALS: &str = "_-$&%*!?";
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || SPECIALS.contains(c));
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || SPECIALS.contains(c));
    if first_ok && rest_ok {
        Ok(())
    } else {
        Err(err(line, format!("invalid identifier {name}")))
    }
}

fn err(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::new(line, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_required() {
        let error = parse("DEFVAR GF@x\n").unwrap_err();
        assert_eq!(error.line(), 1);
        assert!(parse("").is_err());
        assert!(parse("# only a comment\n").is_err());
        // Header is case-insensitive and may follow comments and blanks.
        parse("# program\n\n.trifold\n").unwrap();
    }

    #[test]
    fn test_basic_program() {
        let program = parse(
            ".TRIFOLD\n\
             DEFVAR GF@x   # a counter\n\
             move GF@x int@42\n\
             WRITE GF@x\n",
        )
        .unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(
            program[1],
            Instruction::Move {
                dst: VarRef {
                    frame: FrameTag::Global,
                    name: "x".to_string()
                },
                src: Symb::Const(Value::Int(42)),
            }
        );
    }

    #[test]
    fn test_constant_literals() {
        let program = parse(
            ".TRIFOLD\n\
             PUSHS int@-7\n\
             PUSHS bool@true\n\
             PUSHS float@0x1.8p+1\n\
             PUSHS float@2.5\n\
             PUSHS string@a\\032b\n",
        )
        .unwrap();
        let constants: Vec<_> = program
            .iter()
            .map(|i| match i {
                Instruction::Pushs { src: Symb::Const(value) } => value.clone(),
                other => panic!("unexpected instruction {other:?}"),
            })
            .collect();
        assert_eq!(
            constants,
            vec![
                Value::Int(-7),
                Value::Bool(true),
                Value::Float(3.0),
                Value::Float(2.5),
                Value::Str("a b".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_opcode_and_bad_arity() {
        let error = parse(".TRIFOLD\nFROBNICATE GF@x\n").unwrap_err();
        assert_eq!(error.line(), 2);
        assert!(error.to_string().contains("unknown opcode"));

        let error = parse(".TRIFOLD\nADD GF@x int@1\n").unwrap_err();
        assert!(error.to_string().contains("expects 3 operands"));

        let error = parse(".TRIFOLD\nBREAK int@1\n").unwrap_err();
        assert!(error.to_string().contains("expects 0 operands"));
    }

    #[test]
    fn test_operand_shape_errors() {
        assert!(parse(".TRIFOLD\nDEFVAR xyz\n").is_err());
        assert!(parse(".TRIFOLD\nDEFVAR gf@x\n").is_err());
        assert!(parse(".TRIFOLD\nDEFVAR GF@9lives\n").is_err());
        assert!(parse(".TRIFOLD\nMOVE GF@x int@4.5\n").is_err());
        assert!(parse(".TRIFOLD\nMOVE GF@x bool@yes\n").is_err());
        assert!(parse(".TRIFOLD\nMOVE GF@x float@xyz\n").is_err());
        assert!(parse(".TRIFOLD\nMOVE GF@x nil@nil\n").is_err());
        assert!(parse(".TRIFOLD\nREAD GF@x integer\n").is_err());
        // Identifier specials are allowed.
        parse(".TRIFOLD\nDEFVAR GF@_under-score$ok!\n").unwrap();
    }

    #[test]
    fn test_string_escapes() {
        let program = parse(".TRIFOLD\nWRITE string@hash\\035tail\n").unwrap();
        assert_eq!(
            program[0],
            Instruction::Write {
                src: Symb::Const(Value::Str("hash#tail".to_string()))
            }
        );
        assert!(parse(".TRIFOLD\nWRITE string@bad\\9\n").is_err());
        assert!(parse(".TRIFOLD\nWRITE string@bad\\01\n").is_err());
    }

    #[test]
    fn test_empty_string_literal() {
        let program = parse(".TRIFOLD\nWRITE string@\n").unwrap();
        assert_eq!(
            program[0],
            Instruction::Write {
                src: Symb::Const(Value::Str(String::new()))
            }
        );
    }

    #[test]
    fn test_stack_twins_and_labels() {
        let program = parse(
            ".TRIFOLD\n\
             LABEL start\n\
             ADDS\n\
             JUMPIFEQS start\n\
             CLEARS\n",
        )
        .unwrap();
        assert_eq!(program[0], Instruction::Label { name: "start".to_string() });
        assert_eq!(program[1], Instruction::Adds);
        assert_eq!(program[2], Instruction::JumpIfEqs { label: "start".to_string() });
        assert_eq!(program[3], Instruction::Clears);
    }

    #[test]
    fn test_opcode_case_insensitive_frame_tags_not() {
        let program = parse(".TRIFOLD\ncreateframe\nPushFrame\n").unwrap();
        assert_eq!(program, vec![Instruction::CreateFrame, Instruction::PushFrame]);
        assert!(parse(".TRIFOLD\nDEFVAR Gf@x\n").is_err());
    }
}
