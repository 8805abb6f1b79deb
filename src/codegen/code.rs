//! Per-method bytecode buffer
//!
//! [`Code`] appends instructions, tracks the operand stack depth (recording its maximum
//! for the `Code` attribute) and the highest local slot touched, and resolves branches
//! through the label table in [`super::pending_jumps`]. A method's `Code` lives until
//! [`Code::finalize`], which refuses to hand out bytes while any branch is unresolved.

use super::error::{BytecodeError, BytecodeResult};
use super::opcodes;
use super::pending_jumps::{Label, LabelTable, PendingBranch};
use super::types::StackKind;

/// Largest method body the `Code` attribute can describe
pub const MAX_CODE_LENGTH: usize = 65535;

/// Operand stack bookkeeping
#[derive(Debug, Clone, Default)]
pub struct State {
    pub stacksize: u16,
    pub max_stacksize: u16,
}

impl State {
    pub fn push(&mut self, n: u16) {
        self.stacksize += n;
        self.max_stacksize = self.max_stacksize.max(self.stacksize);
    }

    pub fn pop(&mut self, n: u16, at: usize) -> BytecodeResult<()> {
        self.stacksize = self
            .stacksize
            .checked_sub(n)
            .ok_or(BytecodeError::StackUnderflow { at })?;
        Ok(())
    }
}

/// Output of a finalized method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedCode {
    pub code: Vec<u8>,
    pub max_stack: u16,
    pub max_locals: u16,
    /// Every branch as (instruction offset, resolved target offset).
    pub branches: Vec<(usize, usize)>,
}

/// Bytecode emitter for one method
#[derive(Debug)]
pub struct Code {
    code: Vec<u8>,
    state: State,
    max_locals: u16,
    labels: LabelTable,
    branches: Vec<(usize, Label)>,
    alive: bool,
    debug_code: bool,
}

/// The bytecode emitter under its component name.
pub type BytecodeEmitter = Code;

/// Fixed (pop, push) stack effect of operand-free instructions.
fn stack_effect(op: u8) -> Option<(u16, u16)> {
    use opcodes::*;
    let effect = match op {
        NOP => (0, 0),
        ACONST_NULL | ICONST_M1..=ICONST_5 => (0, 1),
        LCONST_0 | LCONST_1 => (0, 2),
        POP => (1, 0),
        POP2 => (2, 0),
        DUP => (1, 2),
        IADD | ISUB | IMUL | IDIV | IREM | ISHL | ISHR | IUSHR | IAND | IOR | IXOR => (2, 1),
        LADD | LSUB | LMUL | LDIV | LREM | LAND | LOR | LXOR => (4, 2),
        LSHL | LSHR | LUSHR => (3, 2),
        INEG | I2B | I2C | I2S => (1, 1),
        LNEG => (2, 2),
        I2L => (1, 2),
        L2I => (2, 1),
        LCMP => (4, 1),
        IRETURN | ARETURN => (1, 0),
        LRETURN => (2, 0),
        RETURN => (0, 0),
        _ => return None,
    };
    Some(effect)
}

/// Operand words a conditional branch consumes.
fn branch_pops(op: u8) -> u16 {
    match op {
        opcodes::IFEQ..=opcodes::IFLE => 1,
        opcodes::IF_ICMPEQ..=opcodes::IF_ACMPNE => 2,
        _ => 0,
    }
}

impl Code {
    /// Empty body whose first `initial_locals` slots hold the receiver and parameters.
    pub fn new(initial_locals: u16, debug_code: bool) -> Self {
        Self {
            code: Vec::with_capacity(64),
            state: State::default(),
            max_locals: initial_locals,
            labels: LabelTable::new(),
            branches: Vec::new(),
            alive: true,
            debug_code,
        }
    }

    /// Current code offset.
    pub fn pc(&self) -> usize {
        self.code.len()
    }

    pub fn stack_depth(&self) -> u16 {
        self.state.stacksize
    }

    pub fn max_stack_depth(&self) -> u16 {
        self.state.max_stacksize
    }

    /// False right after an unconditional transfer until a label is placed.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn bytes(&self) -> &[u8] {
        &self.code
    }

    fn emit1(&mut self, od: u8) {
        self.code.push(od);
    }

    fn emit2(&mut self, od: u16) {
        self.code.extend_from_slice(&od.to_be_bytes());
    }

    fn put2(&mut self, pc: usize, od: i16) {
        self.code[pc..pc + 2].copy_from_slice(&od.to_be_bytes());
    }

    fn trace(&self, op: u8) {
        if self.debug_code {
            log::debug!("emit@{} stack={}: {}", self.pc(), self.state.stacksize, opcodes::mnemonic(op));
        }
    }

    fn adjust(&mut self, pops: u16, pushes: u16, at: usize) -> BytecodeResult<()> {
        self.state.pop(pops, at)?;
        self.state.push(pushes);
        Ok(())
    }

    fn mark_terminal(&mut self, op: u8) {
        if opcodes::is_terminal(op) {
            self.alive = false;
        }
    }

    /// Emit an instruction without operands.
    pub fn emitop(&mut self, op: u8) -> BytecodeResult<()> {
        let (pops, pushes) = stack_effect(op).ok_or(BytecodeError::NoStackEffect { op })?;
        self.trace(op);
        let at = self.pc();
        self.emit1(op);
        self.adjust(pops, pushes, at)?;
        self.mark_terminal(op);
        Ok(())
    }

    /// Emit an instruction with an explicit stack effect and a one-byte operand.
    pub fn emitop1(&mut self, op: u8, od: u8, pops: u16, pushes: u16) -> BytecodeResult<()> {
        self.trace(op);
        let at = self.pc();
        self.emit1(op);
        self.emit1(od);
        self.adjust(pops, pushes, at)
    }

    /// Emit an instruction with an explicit stack effect and a two-byte operand.
    pub fn emitop2(&mut self, op: u8, od: u16, pops: u16, pushes: u16) -> BytecodeResult<()> {
        self.trace(op);
        let at = self.pc();
        self.emit1(op);
        self.emit2(od);
        self.adjust(pops, pushes, at)
    }

    /// Push a 32-bit constant that needs no constant-pool entry, if possible.
    ///
    /// Returns `false` when the value needs `ldc`.
    pub fn emit_small_int(&mut self, value: i32) -> BytecodeResult<bool> {
        match value {
            -1..=5 => self.emitop((opcodes::ICONST_0 as i32 + value) as u8)?,
            -128..=127 => self.emitop1(opcodes::BIPUSH, value as i8 as u8, 0, 1)?,
            -32768..=32767 => self.emitop2(opcodes::SIPUSH, value as i16 as u16, 0, 1)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// `ldc`/`ldc_w` of a one-word constant.
    pub fn emit_ldc(&mut self, index: u16) -> BytecodeResult<()> {
        if index <= 0xff {
            self.emitop1(opcodes::LDC, index as u8, 0, 1)
        } else {
            self.emitop2(opcodes::LDC_W, index, 0, 1)
        }
    }

    pub fn emit_ldc2(&mut self, index: u16) -> BytecodeResult<()> {
        self.emitop2(opcodes::LDC2_W, index, 0, 2)
    }

    fn touch_local(&mut self, slot: u16, kind: StackKind) {
        self.max_locals = self.max_locals.max(slot + kind.size());
    }

    fn emit_local(&mut self, op: u8, short: u8, slot: u16) {
        if slot <= 3 {
            self.trace(short);
            self.emit1(short + slot as u8);
        } else if slot <= 0xff {
            self.trace(op);
            self.emit1(op);
            self.emit1(slot as u8);
        } else {
            self.trace(opcodes::WIDE);
            self.emit1(opcodes::WIDE);
            self.emit1(op);
            self.emit2(slot);
        }
    }

    pub fn emit_load(&mut self, kind: StackKind, slot: u16) -> BytecodeResult<()> {
        self.emit_local(kind.load_op(), kind.load_short(), slot);
        self.touch_local(slot, kind);
        self.state.push(kind.size());
        Ok(())
    }

    pub fn emit_store(&mut self, kind: StackKind, slot: u16) -> BytecodeResult<()> {
        let at = self.pc();
        self.emit_local(kind.store_op(), kind.store_short(), slot);
        self.touch_local(slot, kind);
        self.state.pop(kind.size(), at)
    }

    /// `xreturn` for `kind`, or plain `return` for `None`.
    pub fn emit_return(&mut self, kind: Option<StackKind>) -> BytecodeResult<()> {
        self.emitop(kind.map_or(opcodes::RETURN, StackKind::return_op))
    }

    /// Invocation of a method taking `arg_size` argument words and returning `return_size`.
    /// Virtual and special calls also consume the receiver.
    pub fn emit_invoke(&mut self, op: u8, meth_index: u16, arg_size: u16, return_size: u16) -> BytecodeResult<()> {
        let receiver = if op == opcodes::INVOKESTATIC { 0 } else { 1 };
        self.emitop2(op, meth_index, arg_size + receiver, return_size)
    }

    pub fn emit_getstatic(&mut self, field_index: u16, field_size: u16) -> BytecodeResult<()> {
        self.emitop2(opcodes::GETSTATIC, field_index, 0, field_size)
    }

    pub fn emit_new(&mut self, class_index: u16) -> BytecodeResult<()> {
        self.emitop2(opcodes::NEW, class_index, 0, 1)
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.new_label()
    }

    pub fn label_offset(&self, label: Label) -> Option<usize> {
        self.labels.offset(label)
    }

    fn relative(at: usize, target: usize) -> BytecodeResult<i16> {
        let offset = target as i64 - at as i64;
        i16::try_from(offset).map_err(|_| BytecodeError::BranchTooFar { at, target })
    }

    /// Emit a branch to `label`. Backward targets are encoded at once; forward ones are
    /// left as a placeholder until the label is placed.
    pub fn emit_branch(&mut self, op: u8, label: Label) -> BytecodeResult<()> {
        self.trace(op);
        let at = self.pc();
        self.state.pop(branch_pops(op), at)?;
        self.labels.note_entry_depth(label, self.state.stacksize);
        self.emit1(op);
        self.branches.push((at, label));
        match self.labels.offset(label) {
            Some(target) => {
                let offset = Self::relative(at, target)?;
                self.emit2(offset as u16);
            }
            None => {
                let operand = self.pc();
                self.emit2(0);
                self.labels.add_pending(PendingBranch { at, operand, label });
            }
        }
        self.mark_terminal(op);
        Ok(())
    }

    /// Bind `label` to the current offset and patch every branch waiting for it.
    pub fn place_label(&mut self, label: Label) -> BytecodeResult<()> {
        let target = self.pc();
        for branch in self.labels.place(label, target)? {
            let offset = Self::relative(branch.at, target)?;
            log::trace!("patch branch at {} -> {} ({:+})", branch.at, target, offset);
            self.put2(branch.operand, offset);
        }
        match self.labels.entry_depth(label) {
            Some(depth) if !self.alive => self.state.stacksize = depth,
            Some(_) => {}
            None => self.labels.note_entry_depth(label, self.state.stacksize),
        }
        self.alive = true;
        Ok(())
    }

    /// Close the method body.
    pub fn finalize(self) -> BytecodeResult<FinishedCode> {
        if let Some(label) = self.labels.first_unresolved() {
            return Err(BytecodeError::UnresolvedBranch { label: label.0 });
        }
        if self.code.len() > MAX_CODE_LENGTH {
            return Err(BytecodeError::CodeTooLarge { size: self.code.len() });
        }
        let mut branches = Vec::with_capacity(self.branches.len());
        for (at, label) in &self.branches {
            let target = self
                .labels
                .offset(*label)
                .ok_or(BytecodeError::UnresolvedBranch { label: label.0 })?;
            branches.push((*at, target));
        }
        Ok(FinishedCode {
            code: self.code,
            max_stack: self.state.max_stacksize,
            max_locals: self.max_locals,
            branches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::opcodes::*;

    fn read_offset(code: &[u8], at: usize) -> i16 {
        i16::from_be_bytes([code[at + 1], code[at + 2]])
    }

    #[test]
    fn test_forward_branch_is_patched() {
        let mut code = Code::new(0, false);
        let end = code.new_label();
        code.emitop(ICONST_1).unwrap();
        code.emit_branch(IFEQ, end).unwrap();
        code.emitop(NOP).unwrap();
        code.place_label(end).unwrap();
        code.emit_return(None).unwrap();
        let finished = code.finalize().unwrap();
        assert_eq!(finished.code, vec![ICONST_1, IFEQ, 0, 4, NOP, RETURN]);
        assert_eq!(finished.branches, vec![(1, 5)]);
        assert_eq!(finished.max_stack, 1);
    }

    #[test]
    fn test_backward_branch_is_written_immediately() {
        let mut code = Code::new(0, false);
        let top = code.new_label();
        code.place_label(top).unwrap();
        code.emitop(NOP).unwrap();
        code.emit_branch(GOTO, top).unwrap();
        assert!(!code.is_alive());
        let finished = code.finalize().unwrap();
        assert_eq!(read_offset(&finished.code, 1), -1);
    }

    #[test]
    fn test_unplaced_label_fails_finalize() {
        let mut code = Code::new(0, false);
        let nowhere = code.new_label();
        code.emit_branch(GOTO, nowhere).unwrap();
        assert_eq!(code.finalize(), Err(BytecodeError::UnresolvedBranch { label: 0 }));
    }

    #[test]
    fn test_label_restores_branch_depth() {
        // cond ? 1 : 0 with two words already on the stack
        let mut code = Code::new(0, false);
        let f = code.new_label();
        let end = code.new_label();
        code.emitop(ICONST_3).unwrap();
        code.emitop(ICONST_4).unwrap();
        code.emit_branch(IF_ICMPLE, f).unwrap();
        code.emitop(ICONST_1).unwrap();
        code.emit_branch(GOTO, end).unwrap();
        code.place_label(f).unwrap();
        assert_eq!(code.stack_depth(), 0);
        code.emitop(ICONST_0).unwrap();
        code.place_label(end).unwrap();
        assert_eq!(code.stack_depth(), 1);
        assert_eq!(code.max_stack_depth(), 2);
    }

    #[test]
    fn test_local_forms_and_max_locals() {
        let mut code = Code::new(1, false);
        code.emit_load(StackKind::Int, 2).unwrap();
        code.emit_store(StackKind::Int, 200).unwrap();
        code.emit_load(StackKind::Long, 300).unwrap();
        code.emit_store(StackKind::Long, 0).unwrap();
        let finished = code.finalize().unwrap();
        assert_eq!(
            finished.code,
            vec![ILOAD_0 + 2, ISTORE, 200, WIDE, LLOAD, 0x01, 0x2c, LSTORE_0]
        );
        assert_eq!(finished.max_locals, 302);
        assert_eq!(finished.max_stack, 2);
    }

    #[test]
    fn test_underflow_is_reported() {
        let mut code = Code::new(0, false);
        assert_eq!(code.emitop(IADD), Err(BytecodeError::StackUnderflow { at: 0 }));
    }

    #[test]
    fn test_small_ints() {
        let mut code = Code::new(0, false);
        assert!(code.emit_small_int(-1).unwrap());
        assert!(code.emit_small_int(100).unwrap());
        assert!(code.emit_small_int(-300).unwrap());
        assert!(!code.emit_small_int(70000).unwrap());
        assert_eq!(code.bytes(), &[ICONST_M1, BIPUSH, 100, SIPUSH, 0xfe, 0xd4]);
    }

    #[test]
    fn test_branch_too_far() {
        let mut code = Code::new(0, false);
        let end = code.new_label();
        code.emit_branch(GOTO, end).unwrap();
        for _ in 0..40000 {
            code.emitop(NOP).unwrap();
        }
        assert!(matches!(code.place_label(end), Err(BytecodeError::BranchTooFar { at: 0, .. })));
    }
}
