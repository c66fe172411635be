//! Operator semantics shared by the explicit-operand opcodes and their
//! stack-flavored twins.
//!
//! Every function here is pure over values: the engine resolves operands
//! (variables or constants, explicit or popped) and delegates, so both operand
//! delivery styles apply exactly the same type and value rules.

use strum::{Display, IntoStaticStr};

use crate::error::{fault_err, FaultKind, RunResult};
use crate::value::{parse_float, DataType, Value};

/// Arithmetic opcodes. IDIV accepts only ints, DIV only floats; the others
/// accept either numeric type but both operands must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    IDiv,
    Div,
}

/// Relational opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum CmpOp {
    Lt,
    Gt,
    Eq,
}

/// Binary boolean opcodes (NOT is unary and handled separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum BoolOp {
    And,
    Or,
}

pub fn arith(op: ArithOp, a: &Value, b: &Value) -> RunResult<Value> {
    match op {
        ArithOp::IDiv => match (a, b) {
            (Value::Int(_), Value::Int(0)) => {
                fault_err!(FaultKind::ArithmeticError; "division by zero")
            }
            // Truncates toward zero; wrapping covers i64::MIN / -1.
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_div(*y))),
            _ => type_mismatch(op.into(), "two int operands", a, b),
        },
        ArithOp::Div => match (a, b) {
            (Value::Float(_), Value::Float(y)) if *y == 0.0 => {
                fault_err!(FaultKind::ArithmeticError; "division by zero")
            }
            (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x / y)),
            _ => type_mismatch(op.into(), "two float operands", a, b),
        },
        ArithOp::Add | ArithOp::Sub | ArithOp::Mul => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(match op {
                ArithOp::Add => x.wrapping_add(*y),
                ArithOp::Sub => x.wrapping_sub(*y),
                _ => x.wrapping_mul(*y),
            })),
            (Value::Float(x), Value::Float(y)) => Ok(Value::Float(match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                _ => x * y,
            })),
            _ => type_mismatch(op.into(), "two int or two float operands", a, b),
        },
    }
}

/// Equality shared by EQ, JUMPIFEQ and JUMPIFNEQ.
///
/// The one place Unassigned may be read: two Unassigned values compare equal.
/// Any other type mismatch (including Unassigned against an assigned value)
/// is a fault, never silently false.
pub fn values_equal(a: &Value, b: &Value) -> RunResult<bool> {
    match (a, b) {
        (Value::Unassigned, Value::Unassigned) => Ok(true),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        _ => type_mismatch("EQ", "operands of one shared type", a, b),
    }
}

pub fn compare(op: CmpOp, a: &Value, b: &Value) -> RunResult<Value> {
    if op == CmpOp::Eq {
        return values_equal(a, b).map(Value::Bool);
    }
    let result = match (a, b) {
        (Value::Int(x), Value::Int(y)) => ordered(op, x, y),
        (Value::Float(x), Value::Float(y)) => ordered(op, x, y),
        (Value::Bool(x), Value::Bool(y)) => ordered(op, x, y),
        (Value::Str(x), Value::Str(y)) => ordered(op, x, y),
        _ => return type_mismatch(op.into(), "operands of one shared type", a, b),
    };
    Ok(Value::Bool(result))
}

fn ordered<T: PartialOrd + ?Sized>(op: CmpOp, x: &T, y: &T) -> bool {
    match op {
        CmpOp::Lt => x < y,
        CmpOp::Gt => x > y,
        CmpOp::Eq => unreachable!("EQ is handled by values_equal"),
    }
}

pub fn boolean(op: BoolOp, a: &Value, b: &Value) -> RunResult<Value> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(match op {
            BoolOp::And => *x && *y,
            BoolOp::Or => *x || *y,
        })),
        _ => type_mismatch(op.into(), "two bool operands", a, b),
    }
}

pub fn not(a: &Value) -> RunResult<Value> {
    match a {
        Value::Bool(x) => Ok(Value::Bool(!x)),
        _ => fault_err!(FaultKind::WrongOperandType; "NOT expects a bool operand, got {}", describe(a)),
    }
}

/// INT2CHAR: code point to one-character string.
pub fn int_to_char(a: &Value) -> RunResult<Value> {
    match a {
        Value::Int(code) => {
            let c = u32::try_from(*code).ok().and_then(char::from_u32);
            match c {
                Some(c) => Ok(Value::Str(c.to_string())),
                None => fault_err!(FaultKind::StringIndexError; "{code} is not a valid code point"),
            }
        }
        _ => fault_err!(FaultKind::WrongOperandType; "INT2CHAR expects an int operand, got {}", describe(a)),
    }
}

/// STRI2INT: code point of the character at `index`.
pub fn char_to_int(src: &Value, index: &Value) -> RunResult<Value> {
    match src {
        Value::Str(s) => {
            let at = char_index("STRI2INT", s, index)?;
            // char_index guarantees the position exists
            let c = s.chars().nth(at).unwrap_or('\0');
            Ok(Value::Int(i64::from(u32::from(c))))
        }
        _ => fault_err!(FaultKind::WrongOperandType; "STRI2INT expects a string operand, got {}", describe(src)),
    }
}

/// INT2FLOAT: widening conversion.
pub fn int_to_float(a: &Value) -> RunResult<Value> {
    match a {
        Value::Int(v) => Ok(Value::Float(*v as f64)),
        _ => fault_err!(FaultKind::WrongOperandType; "INT2FLOAT expects an int operand, got {}", describe(a)),
    }
}

/// FLOAT2INT: truncates toward zero.
pub fn float_to_int(a: &Value) -> RunResult<Value> {
    match a {
        Value::Float(v) => Ok(Value::Int(*v as i64)),
        _ => fault_err!(FaultKind::WrongOperandType; "FLOAT2INT expects a float operand, got {}", describe(a)),
    }
}

pub fn concat(a: &Value, b: &Value) -> RunResult<Value> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => {
            let mut joined = String::with_capacity(x.len() + y.len());
            joined.push_str(x);
            joined.push_str(y);
            Ok(Value::Str(joined))
        }
        _ => type_mismatch("CONCAT", "two string operands", a, b),
    }
}

/// STRLEN: count of Unicode scalar values, not bytes.
pub fn string_length(a: &Value) -> RunResult<Value> {
    match a {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        _ => fault_err!(FaultKind::WrongOperandType; "STRLEN expects a string operand, got {}", describe(a)),
    }
}

/// GETCHAR: one-character string at `index`.
pub fn get_char(src: &Value, index: &Value) -> RunResult<Value> {
    match src {
        Value::Str(s) => {
            let at = char_index("GETCHAR", s, index)?;
            let c = s.chars().nth(at).unwrap_or('\0');
            Ok(Value::Str(c.to_string()))
        }
        _ => fault_err!(FaultKind::WrongOperandType; "GETCHAR expects a string operand, got {}", describe(src)),
    }
}

/// SETCHAR: a new string equal to `current` with the character at `index`
/// replaced by the first character of `replacement`.
///
/// The destination must already hold a string; an empty replacement is a
/// StringIndexError like an out-of-range index.
pub fn set_char(current: &Value, index: &Value, replacement: &Value) -> RunResult<Value> {
    let current = match current {
        Value::Str(s) => s,
        _ => {
            return fault_err!(
                FaultKind::WrongOperandType;
                "SETCHAR destination must hold a string, got {}", describe(current)
            )
        }
    };
    let replacement = match replacement {
        Value::Str(s) => s,
        _ => {
            return fault_err!(
                FaultKind::WrongOperandType;
                "SETCHAR replacement must be a string, got {}", describe(replacement)
            )
        }
    };
    let at = char_index("SETCHAR", current, index)?;
    let Some(replacement) = replacement.chars().next() else {
        return fault_err!(FaultKind::StringIndexError; "SETCHAR with an empty replacement string");
    };
    let result = current
        .chars()
        .enumerate()
        .map(|(i, c)| if i == at { replacement } else { c })
        .collect();
    Ok(Value::Str(result))
}

/// TYPE: the one read of Unassigned that never faults.
#[must_use]
pub fn type_of(a: &Value) -> Value {
    Value::Str(a.type_name().to_string())
}

/// READ: converts one line of external input to the requested type.
///
/// Never faults: a failed conversion or exhausted input substitutes the
/// type-appropriate default (0, 0.0, false, empty string).
#[must_use]
pub fn read_input(line: Option<&str>, ty: DataType) -> Value {
    match ty {
        DataType::Int => Value::Int(line.and_then(|l| l.trim().parse().ok()).unwrap_or(0)),
        DataType::Float => Value::Float(line.and_then(|l| parse_float(l)).unwrap_or(0.0)),
        DataType::Bool => Value::Bool(line.is_some_and(|l| l.trim().eq_ignore_ascii_case("true"))),
        DataType::String => Value::Str(line.unwrap_or_default().to_string()),
    }
}

/// Validates a bounds-checked character index: an int with 0 <= index < len.
fn char_index(opcode: &str, s: &str, index: &Value) -> RunResult<usize> {
    let index = match index {
        Value::Int(v) => *v,
        _ => {
            return fault_err!(
                FaultKind::WrongOperandType;
                "{opcode} index must be an int, got {}", describe(index)
            )
        }
    };
    let length = s.chars().count();
    if index < 0 || index as usize >= length {
        return fault_err!(
            FaultKind::StringIndexError;
            "{opcode} index {index} out of range for string of length {length}"
        );
    }
    Ok(index as usize)
}

/// Type tag for fault messages; never empty, unlike [`Value::type_name`].
fn describe(value: &Value) -> &'static str {
    match value {
        Value::Unassigned => "unassigned",
        _ => value.type_name(),
    }
}

fn type_mismatch<T>(opcode: &str, expected: &str, a: &Value, b: &Value) -> RunResult<T> {
    fault_err!(
        FaultKind::WrongOperandType;
        "{opcode} expects {expected}, got {} and {}", describe(a), describe(b)
    )
}
