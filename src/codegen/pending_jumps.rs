//! Labels and forward-branch bookkeeping for one method body
//!
//! A branch to a label that is not placed yet leaves a [`PendingBranch`]; placing the
//! label hands back every pending branch so the emitter can patch its operand.

use super::error::{BytecodeError, BytecodeResult};
use std::fmt;

/// Symbolic branch target inside one method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A branch emitted before its target was known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingBranch {
    /// Offset of the branch opcode; the relative offset is computed from here.
    pub at: usize,
    /// Offset of the 16-bit operand to patch.
    pub operand: usize,
    pub label: Label,
}

#[derive(Debug, Clone, Default)]
struct LabelState {
    offset: Option<usize>,
    /// Operand stack depth on entry, fixed by the first branch or by placement.
    entry_depth: Option<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    labels: Vec<LabelState>,
    pending: Vec<PendingBranch>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelState::default());
        Label(self.labels.len() as u32 - 1)
    }

    fn state(&self, label: Label) -> &LabelState {
        &self.labels[label.0 as usize]
    }

    fn state_mut(&mut self, label: Label) -> &mut LabelState {
        &mut self.labels[label.0 as usize]
    }

    /// Resolved offset of `label`, if placed.
    pub fn offset(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0 as usize).and_then(|s| s.offset)
    }

    pub fn entry_depth(&self, label: Label) -> Option<u16> {
        self.state(label).entry_depth
    }

    /// Record the stack depth a branch carries into `label`; the first one wins.
    pub fn note_entry_depth(&mut self, label: Label, depth: u16) {
        let state = self.state_mut(label);
        if state.entry_depth.is_none() {
            state.entry_depth = Some(depth);
        }
    }

    pub fn add_pending(&mut self, branch: PendingBranch) {
        self.pending.push(branch);
    }

    /// Fix `label` at `offset` and take every branch waiting for it.
    pub fn place(&mut self, label: Label, offset: usize) -> BytecodeResult<Vec<PendingBranch>> {
        let state = self.state_mut(label);
        if state.offset.is_some() {
            return Err(BytecodeError::LabelAlreadyPlaced { label: label.0 });
        }
        state.offset = Some(offset);
        let (resolved, still_pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|b| b.label == label);
        self.pending = still_pending;
        Ok(resolved)
    }

    /// First label that still has branches waiting for it.
    pub fn first_unresolved(&self) -> Option<Label> {
        self.pending.iter().map(|b| b.label).min()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
