use crate::instruction::{Condition, Instruction};
use crate::op::Op;

/// A forward jump whose offset has not yet been resolved.
///
/// Created by [`BytecodeBuilder::jump`]. Resolve it with
/// [`BytecodeBuilder::bind`].
#[derive(Debug)]
#[must_use]
pub struct Label {
    /// Position of the offset word in the buffer.
    offset_pos: usize,
    /// Position right after the jump instruction (base for relative offset).
    base: usize,
}

/// Builds a bytecode byte sequence.
#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    buf: Vec<u8>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Current byte offset in the bytecode stream.
    pub fn current_offset(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit_op(&mut self, op: Op) {
        self.buf.push(op as u8);
    }

    fn emit_word(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn emit(&mut self, insn: Instruction) {
        self.emit_op(insn.op());
        for word in insn.operands() {
            self.emit_word(word);
        }
    }

    // ── common shapes ──────────────────────────────────────────────

    pub fn halt(&mut self) {
        self.emit(Instruction::Halt);
    }

    pub fn syscall(&mut self, id: i32) {
        self.emit(Instruction::Syscall { id });
    }

    pub fn call(&mut self, selector: u32) {
        self.emit(Instruction::Call { selector });
    }

    pub fn return_(&mut self) {
        self.emit(Instruction::Return);
    }

    pub fn return_top(&mut self) {
        self.emit(Instruction::ReturnTop);
    }

    pub fn push_int(&mut self, value: i32) {
        self.emit(Instruction::PushInt { value });
    }

    pub fn new_int(&mut self, value: i32) {
        self.emit(Instruction::NewInt { value });
    }

    pub fn pop_arg(&mut self, index: u32) {
        self.emit(Instruction::PopArg { index });
    }

    // ── jumps ──────────────────────────────────────────────────────

    /// Emit a jump with a placeholder offset. Must be [`bind`](Self::bind)ed.
    pub fn jump(&mut self, op: Op) -> Label {
        debug_assert!(op.is_jump(), "{op:?} is not a jump");
        self.emit_op(op);
        let offset_pos = self.buf.len();
        self.emit_word(0);
        Label {
            offset_pos,
            base: self.buf.len(),
        }
    }

    /// Point `label` at the current offset.
    pub fn bind(&mut self, label: Label) {
        let offset = self.buf.len() as i32 - label.base as i32;
        self.buf[label.offset_pos..label.offset_pos + 4].copy_from_slice(&offset.to_be_bytes());
    }

    /// Emit a jump to an already emitted `target` offset.
    pub fn jump_to(&mut self, op: Op, target: usize) {
        debug_assert!(op.is_jump(), "{op:?} is not a jump");
        let base = self.buf.len() + op.encoded_len();
        let offset = target as i32 - base as i32;
        let insn = match Condition::from_op(op) {
            Some(cond) => Instruction::Branch { cond, offset },
            None => Instruction::Jmp { offset },
        };
        self.emit(insn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BytecodeDecoder;

    fn decode_all(bytes: &[u8]) -> Vec<Instruction> {
        BytecodeDecoder::new(bytes).map(|r| r.unwrap()).collect()
    }

    #[test]
    fn words_are_big_endian() {
        let mut b = BytecodeBuilder::new();
        b.push_int(258);
        assert_eq!(b.as_bytes(), &[0x0A, 0, 0, 1, 2]);
    }

    #[test]
    fn forward_label() {
        let mut b = BytecodeBuilder::new();
        let skip = b.jump(Op::Jmp);
        b.new_int(1);
        b.bind(skip);
        b.halt();

        let insns = decode_all(b.as_bytes());
        assert_eq!(insns[0], Instruction::Jmp { offset: 5 });
        assert_eq!(insns[2], Instruction::Halt);
    }

    #[test]
    fn backward_jump() {
        let mut b = BytecodeBuilder::new();
        let top = b.current_offset();
        b.new_int(1);
        b.new_int(2);
        b.jump_to(Op::JmpLtInt, top);

        let insns = decode_all(&b.into_bytes());
        // 5 + 5 + 5 bytes back to offset 0
        assert_eq!(insns[2], Instruction::Branch { cond: Condition::Lt, offset: -15 });
    }
}
