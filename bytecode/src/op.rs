/// Bytecode opcodes.
///
/// Every instruction is one opcode byte followed by [`Op::arity`] operands,
/// each a 4-byte big-endian word. Jump offsets are relative to the end of
/// the jump instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    /// Stop interpretation.
    Halt = 0x00,

    /// Invoke a host syscall.
    /// Operands: `id`
    Syscall,

    /// Pop a receiver and send it a message.
    /// Operands: `selector:const`
    Call,

    /// Discard the current frame and resume at its return address.
    Return,

    /// Pop a value, discard the frame, push the value back.
    ReturnTop,

    /// Instantiate a class; field count comes from the class.
    /// Operands: `class:index`
    New,

    /// Pop a raw index and an object, push the field.
    GetField,

    /// Pop a value, a raw index and an object, store the field.
    SetField,

    /// Push a raw heap address.
    /// Operands: `ptr`
    PushRef,

    /// Drop the top reference.
    PopRef,

    /// Push a raw integer word.
    /// Operands: `value`
    PushInt,

    /// Drop the top integer word.
    PopInt,

    /// Pop the top of stack into a local slot.
    /// Operands: `index`
    PushLocal,

    /// Push a local slot.
    /// Operands: `index`
    PopLocal,

    /// Pop `b`, pop `a`, push a new Integer `a + b`.
    AddInt,
    SubInt,
    MulInt,
    DivInt,
    ModInt,

    /// Store an immediate pointer into an argument slot.
    /// Operands: `index`, `ptr`
    PushArg,

    /// Push an argument slot.
    /// Operands: `index`
    PopArg,

    /// Pop a byte-indexed object and overwrite its first word.
    /// Operands: `value`
    SetBytes,

    /// Push a new Integer.
    /// Operands: `value`
    NewInt,

    /// Push a new String built from a string constant.
    /// Operands: `text:const`
    NewStr,

    /// Push a new Array sized by an integer constant.
    /// Operands: `length:const`
    NewArr,

    /// Operands: `offset`
    Jmp,

    /// Pop two Integers and jump if the first pushed compares to the second
    /// pushed. Operands: `offset`
    JmpEqInt,
    JmpNeqInt,
    JmpGtInt,
    JmpGeInt,
    JmpLtInt,
    JmpLeInt,
}

impl Op {
    pub const COUNT: usize = Op::JmpLeInt as usize + 1;

    pub const ALL: [Op; Op::COUNT] = [
        Op::Halt,
        Op::Syscall,
        Op::Call,
        Op::Return,
        Op::ReturnTop,
        Op::New,
        Op::GetField,
        Op::SetField,
        Op::PushRef,
        Op::PopRef,
        Op::PushInt,
        Op::PopInt,
        Op::PushLocal,
        Op::PopLocal,
        Op::AddInt,
        Op::SubInt,
        Op::MulInt,
        Op::DivInt,
        Op::ModInt,
        Op::PushArg,
        Op::PopArg,
        Op::SetBytes,
        Op::NewInt,
        Op::NewStr,
        Op::NewArr,
        Op::Jmp,
        Op::JmpEqInt,
        Op::JmpNeqInt,
        Op::JmpGtInt,
        Op::JmpGeInt,
        Op::JmpLtInt,
        Op::JmpLeInt,
    ];

    /// Number of 4-byte operands following the opcode byte.
    pub const fn arity(self) -> usize {
        match self {
            Op::Halt
            | Op::Return
            | Op::ReturnTop
            | Op::GetField
            | Op::SetField
            | Op::PopRef
            | Op::PopInt
            | Op::AddInt
            | Op::SubInt
            | Op::MulInt
            | Op::DivInt
            | Op::ModInt => 0,
            Op::PushArg => 2,
            _ => 1,
        }
    }

    /// Encoded length in bytes.
    pub const fn encoded_len(self) -> usize {
        1 + self.arity() * 4
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Op::Halt => "halt",
            Op::Syscall => "syscall",
            Op::Call => "call",
            Op::Return => "return",
            Op::ReturnTop => "return-top",
            Op::New => "new",
            Op::GetField => "get-field",
            Op::SetField => "set-field",
            Op::PushRef => "push-ref",
            Op::PopRef => "pop-ref",
            Op::PushInt => "push-int",
            Op::PopInt => "pop-int",
            Op::PushLocal => "push-local",
            Op::PopLocal => "pop-local",
            Op::AddInt => "add-int",
            Op::SubInt => "sub-int",
            Op::MulInt => "mul-int",
            Op::DivInt => "div-int",
            Op::ModInt => "mod-int",
            Op::PushArg => "push-arg",
            Op::PopArg => "pop-arg",
            Op::SetBytes => "set-bytes",
            Op::NewInt => "new-int",
            Op::NewStr => "new-str",
            Op::NewArr => "new-arr",
            Op::Jmp => "jmp",
            Op::JmpEqInt => "jmp-eq-int",
            Op::JmpNeqInt => "jmp-neq-int",
            Op::JmpGtInt => "jmp-gt-int",
            Op::JmpGeInt => "jmp-ge-int",
            Op::JmpLtInt => "jmp-lt-int",
            Op::JmpLeInt => "jmp-le-int",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == mnemonic)
    }

    /// Whether the single operand is a relative jump offset.
    pub const fn is_jump(self) -> bool {
        matches!(
            self,
            Op::Jmp
                | Op::JmpEqInt
                | Op::JmpNeqInt
                | Op::JmpGtInt
                | Op::JmpGeInt
                | Op::JmpLtInt
                | Op::JmpLeInt
        )
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Self::ALL.get(byte as usize).copied().ok_or(byte)
    }
}
