//! Runtime value representation.
//!
//! Values are a closed sum type; every operator family matches on the operand
//! type-tag pair rather than inspecting types at run time. Values are replaced
//! wholesale on write - the only "mutation" is SETCHAR, which produces a new
//! string value.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{fault_err, FaultKind, RunResult};

/// A runtime value held by a variable or the data stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// Declared but never written. Reading it is a fault everywhere except
    /// TYPE, which reports it as an empty string.
    Unassigned,
}

/// The four assignable data types, as named in source programs (`READ` type
/// operands and `TYPE` output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    Int,
    Float,
    Bool,
    String,
}

impl Value {
    /// Runtime type name as reported by TYPE: `""` for Unassigned.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::Unassigned => "",
        }
    }

    /// Renders the value to its output text form.
    ///
    /// Floats render in lossless hex notation so output is reproducible across
    /// runs and platforms. Rendering Unassigned is a MissingValue fault (WRITE
    /// and DPRINT of a never-written variable).
    pub fn render(&self) -> RunResult<String> {
        match self {
            Self::Int(v) => Ok(v.to_string()),
            Self::Float(v) => Ok(float_to_hex(*v)),
            Self::Bool(true) => Ok("true".to_string()),
            Self::Bool(false) => Ok("false".to_string()),
            Self::Str(s) => Ok(s.clone()),
            Self::Unassigned => {
                fault_err!(FaultKind::MissingValue; "cannot write an unassigned value")
            }
        }
    }
}

impl fmt::Display for Value {
    /// Diagnostic form used in frame and stack dumps; distinct from
    /// [`Value::render`] in that Unassigned and string quoting are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "int@{v}"),
            Self::Float(v) => write!(f, "float@{}", float_to_hex(*v)),
            Self::Bool(v) => write!(f, "bool@{v}"),
            Self::Str(s) => write!(f, "string@{s}"),
            Self::Unassigned => f.write_str("<unassigned>"),
        }
    }
}

/// Formats a float in hex notation, e.g. `0x1.8p+1` for 3.0.
///
/// The mantissa always carries all 13 hex digits for normal numbers, so the
/// text form is bit-exact and re-parseable by [`parse_float`].
#[must_use]
pub fn float_to_hex(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    let bits = v.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let exponent = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;
    if exponent == 0 {
        if mantissa == 0 {
            format!("{sign}0x0.0p+0")
        } else {
            // Subnormal: leading digit 0, fixed binary exponent -1022.
            format!("{sign}0x0.{mantissa:013x}p-1022")
        }
    } else {
        format!("{sign}0x1.{mantissa:013x}p{:+}", exponent - 1023)
    }
}

/// Parses a float from either decimal (`3.5`, `1e-3`) or hex (`0x1.cp+1`)
/// notation. Returns `None` when the text is neither.
#[must_use]
pub fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<f64>() {
        return Some(v);
    }
    parse_hex_float(text)
}

fn parse_hex_float(text: &str) -> Option<f64> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1.0, &text[1..]),
        b'-' => (-1.0, &text[1..]),
        _ => (1.0, text),
    };
    let rest = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))?;
    let (mantissa, exponent) = match rest.split_once(['p', 'P']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (rest, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut value = 0.0_f64;
    for c in int_part.chars() {
        value = value * 16.0 + f64::from(c.to_digit(16)?);
    }
    let mut scale = 1.0 / 16.0;
    for c in frac_part.chars() {
        value += f64::from(c.to_digit(16)?) * scale;
        scale /= 16.0;
    }
    let exponent: i32 = match exponent {
        Some(exponent) => exponent.parse().ok()?,
        None => 0,
    };
    Some(sign * value * 2.0_f64.powi(exponent))
}
