//! Label table for control transfer.

use ahash::RandomState;
use indexmap::IndexMap;

use crate::error::{fault_err, FaultKind, RunResult};
use crate::program::Instruction;

/// Label name to instruction index, built in one forward pass before
/// execution begins.
#[derive(Debug, Default)]
pub struct LabelTable(IndexMap<String, usize, RandomState>);

impl LabelTable {
    /// Scans the program for LABEL instructions. A repeated label name is a
    /// DuplicateDefinition fault at build time, before anything executes.
    pub fn build(program: &[Instruction]) -> RunResult<Self> {
        let mut table: IndexMap<String, usize, RandomState> = IndexMap::default();
        for (index, instruction) in program.iter().enumerate() {
            if let Instruction::Label { name } = instruction {
                if table.insert(name.clone(), index).is_some() {
                    return fault_err!(FaultKind::DuplicateDefinition; "label {name} defined twice");
                }
            }
        }
        Ok(Self(table))
    }

    /// Resolves a jump/call target at the moment the transfer executes.
    pub fn resolve(&self, name: &str) -> RunResult<usize> {
        match self.0.get(name) {
            Some(index) => Ok(*index),
            None => fault_err!(FaultKind::UndefinedLabel; "label {name} is not defined"),
        }
    }
}
