//! Variable frames and the memory model.
//!
//! Three scopes exist: the permanent global frame, an optional temporary frame
//! recreated wholesale by CREATEFRAME, and the local frame. Local is not
//! separate storage - it is always the top of the frame stack and is undefined
//! while the stack is empty. Deriving it this way (rather than keeping an
//! independently mutable alias) avoids the divergence bugs of recomputing it
//! ad hoc.

use std::fmt::Write;

use ahash::RandomState;
use indexmap::IndexMap;
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{fault_err, fault_fmt, Fault, FaultKind, RunResult};
use crate::value::Value;

/// Which frame a variable reference designates. Parses from / displays as the
/// source-program prefixes `GF`, `LF`, `TF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum FrameTag {
    #[strum(serialize = "GF")]
    Global,
    #[strum(serialize = "LF")]
    Local,
    #[strum(serialize = "TF")]
    Temporary,
}

/// A single frame: variable names mapped to their values, insertion-ordered so
/// diagnostic dumps list variables in definition order.
#[derive(Debug, Default)]
pub struct Frame(IndexMap<String, Value, RandomState>);

impl Frame {
    fn new() -> Self {
        Self(IndexMap::default())
    }

    fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn insert_unassigned(&mut self, name: &str) {
        self.0.insert(name.to_string(), Value::Unassigned);
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Owner of all three frame scopes plus the frame stack.
///
/// Also tracks the run statistic for variables: the historical maximum of
/// simultaneously defined variables across all currently existing frames
/// (global + temporary + every frame on the stack, buried frames included).
#[derive(Debug)]
pub struct MemoryModel {
    global: Frame,
    temporary: Option<Frame>,
    stack: Vec<Frame>,
    vars_high_water: usize,
    /// When set, a duplicate DEFVAR into LF faults like GF/TF instead of
    /// being silently ignored.
    strict_local_redefine: bool,
}

impl MemoryModel {
    #[must_use]
    pub fn new(strict_local_redefine: bool) -> Self {
        Self {
            global: Frame::new(),
            temporary: None,
            stack: Vec::new(),
            vars_high_water: 0,
            strict_local_redefine,
        }
    }

    /// CREATEFRAME: installs a fresh empty temporary frame, discarding any
    /// prior one and its contents.
    pub fn create_temporary(&mut self) {
        self.temporary = Some(Frame::new());
        self.note_var_count();
    }

    /// PUSHFRAME: moves TF onto the frame stack, making it the new LF.
    /// TF ceases to exist.
    pub fn push_frame(&mut self) -> RunResult<()> {
        match self.temporary.take() {
            Some(frame) => {
                self.stack.push(frame);
                self.note_var_count();
                Ok(())
            }
            None => fault_err!(FaultKind::FrameError; "PUSHFRAME with no temporary frame"),
        }
    }

    /// POPFRAME: moves the current LF back into TF, discarding the prior TF.
    /// LF becomes the new stack top, or undefined if the stack is now empty.
    pub fn pop_frame(&mut self) -> RunResult<()> {
        match self.stack.pop() {
            Some(frame) => {
                self.temporary = Some(frame);
                self.note_var_count();
                Ok(())
            }
            None => fault_err!(FaultKind::FrameError; "POPFRAME with an empty frame stack"),
        }
    }

    /// DEFVAR: creates `name` in the designated frame with value Unassigned.
    ///
    /// GF and TF reject duplicates. LF silently ignores them (preserved from
    /// the reference behavior) unless `strict_local_redefine` is set.
    pub fn define(&mut self, tag: FrameTag, name: &str) -> RunResult<()> {
        let strict = tag != FrameTag::Local || self.strict_local_redefine;
        let frame = self.frame_mut(tag)?;
        if frame.contains(name) {
            if strict {
                return fault_err!(
                    FaultKind::DuplicateDefinition;
                    "variable {name} already defined in {tag}"
                );
            }
        } else {
            frame.insert_unassigned(name);
        }
        self.note_var_count();
        Ok(())
    }

    /// Reads a variable's value.
    ///
    /// Faults with FrameError if the designated frame does not exist,
    /// UndefinedVariable if the name is absent, and MissingValue if
    /// `require_initialized` is set and the slot is Unassigned. Only TYPE and
    /// the equality operators read with `require_initialized == false`.
    pub fn lookup(&self, tag: FrameTag, name: &str, require_initialized: bool) -> RunResult<&Value> {
        let value = self
            .frame(tag)?
            .get(name)
            .ok_or_else(|| undefined_variable(tag, name))?;
        if require_initialized && *value == Value::Unassigned {
            return fault_err!(FaultKind::MissingValue; "variable {tag}@{name} has no value");
        }
        Ok(value)
    }

    /// Writes a value into an existing variable, replacing it wholesale.
    pub fn assign(&mut self, tag: FrameTag, name: &str, value: Value) -> RunResult<()> {
        let slot = self
            .frame_mut(tag)?
            .get_mut(name)
            .ok_or_else(|| undefined_variable(tag, name))?;
        *slot = value;
        Ok(())
    }

    fn frame(&self, tag: FrameTag) -> RunResult<&Frame> {
        match tag {
            FrameTag::Global => Ok(&self.global),
            FrameTag::Temporary => self
                .temporary
                .as_ref()
                .ok_or_else(|| fault_fmt!(FaultKind::FrameError; "TF is not defined")),
            FrameTag::Local => self
                .stack
                .last()
                .ok_or_else(|| fault_fmt!(FaultKind::FrameError; "LF is not defined")),
        }
    }

    fn frame_mut(&mut self, tag: FrameTag) -> RunResult<&mut Frame> {
        match tag {
            FrameTag::Global => Ok(&mut self.global),
            FrameTag::Temporary => self
                .temporary
                .as_mut()
                .ok_or_else(|| fault_fmt!(FaultKind::FrameError; "TF is not defined")),
            FrameTag::Local => self
                .stack
                .last_mut()
                .ok_or_else(|| fault_fmt!(FaultKind::FrameError; "LF is not defined")),
        }
    }

    /// Number of variables currently defined across all existing frames.
    #[must_use]
    pub fn vars_current(&self) -> usize {
        let temporary = self.temporary.as_ref().map_or(0, Frame::len);
        let stacked: usize = self.stack.iter().map(Frame::len).sum();
        self.global.len() + temporary + stacked
    }

    /// Historical maximum of [`Self::vars_current`] over the run so far.
    #[must_use]
    pub fn vars_high_water(&self) -> usize {
        self.vars_high_water
    }

    fn note_var_count(&mut self) {
        let current = self.vars_current();
        if current > self.vars_high_water {
            self.vars_high_water = current;
        }
    }

    /// Writes the contents of every existing frame into `out`, for BREAK.
    pub fn dump(&self, out: &mut String) {
        dump_frame(out, "GF", &self.global);
        match &self.temporary {
            Some(frame) => dump_frame(out, "TF", frame),
            None => out.push_str("TF: <not defined>\n"),
        }
        if self.stack.is_empty() {
            out.push_str("LF: <not defined>\n");
        } else {
            // Top of the stack first, so LF leads.
            for (depth, frame) in self.stack.iter().rev().enumerate() {
                let name = if depth == 0 { "LF".to_string() } else { format!("LF-{depth}") };
                dump_frame(out, &name, frame);
            }
        }
    }
}

fn dump_frame(out: &mut String, name: &str, frame: &Frame) {
    let _ = writeln!(out, "{name} ({} variables):", frame.len());
    for (var, value) in frame.iter() {
        let _ = writeln!(out, "  {var} = {value}");
    }
}

fn undefined_variable(tag: FrameTag, name: &str) -> Fault {
    fault_fmt!(FaultKind::UndefinedVariable; "variable {name} is not defined in {tag}")
}
