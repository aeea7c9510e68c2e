//! Bytecode format of the VM: the opcode table, decoded instructions, a
//! builder, a decoder and the textual assembler.

mod op;
mod instruction;
mod builder;
mod decoder;
mod assembler;
mod error;

pub use op::Op;
pub use instruction::{Condition, Instruction};
pub use builder::{BytecodeBuilder, Label};
pub use decoder::{BytecodeDecoder, disassemble};
pub use assembler::{OperandResolver, assemble, assemble_lines};
pub use error::{AssembleError, DecodeError};

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Instruction> {
        BytecodeDecoder::new(bytes).map(|r| r.unwrap()).collect()
    }

    // ── Decoding ───────────────────────────────────────────────────

    #[test]
    fn builder_output_decodes() {
        let mut b = BytecodeBuilder::new();
        b.pop_arg(0);
        b.push_int(0);
        b.emit(Instruction::GetField);
        b.new_int(1);
        b.emit(Instruction::AddInt);
        b.emit(Instruction::PushArg { index: 2, ptr: 0xFFFF_FFFF });
        b.syscall(8);
        b.call(3);
        b.return_top();

        assert_eq!(decode_all(&b.into_bytes()), vec![
            Instruction::PopArg { index: 0 },
            Instruction::PushInt { value: 0 },
            Instruction::GetField,
            Instruction::NewInt { value: 1 },
            Instruction::AddInt,
            Instruction::PushArg { index: 2, ptr: u32::MAX },
            Instruction::Syscall { id: 8 },
            Instruction::Call { selector: 3 },
            Instruction::ReturnTop,
        ]);
    }

    #[test]
    fn unknown_opcode_stops_decoding() {
        let bytes = [0x03, 0x42, 0x03];
        let items: Vec<_> = BytecodeDecoder::new(&bytes).collect();
        assert_eq!(items, vec![
            Ok(Instruction::Return),
            Err(DecodeError::UnknownOpcode { byte: 0x42, at: 1 }),
        ]);
    }

    #[test]
    fn truncated_operand() {
        let bytes = [0x0A, 0, 0];
        assert_eq!(
            BytecodeDecoder::new(&bytes).next(),
            Some(Err(DecodeError::Truncated { op: Op::PushInt, at: 0 }))
        );
    }

    // ── Listing ────────────────────────────────────────────────────

    #[test]
    fn disassembly_listing() {
        let mut b = BytecodeBuilder::new();
        b.new_int(3);
        let l = b.jump(Op::Jmp);
        b.halt();
        b.bind(l);
        b.return_();
        let text = disassemble(b.as_bytes(), 100).unwrap();
        assert_eq!(
            text,
            "000100: new-int 3\n000105: jmp +1\n000110: halt\n000111: return\n"
        );
    }
}
