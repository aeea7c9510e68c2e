use core::fmt;

use crate::op::Op;

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Halt,
    Syscall { id: i32 },
    Call { selector: u32 },
    Return,
    ReturnTop,
    New { class: u32 },
    GetField,
    SetField,
    PushRef { ptr: u32 },
    PopRef,
    PushInt { value: i32 },
    PopInt,
    PushLocal { index: u32 },
    PopLocal { index: u32 },
    AddInt,
    SubInt,
    MulInt,
    DivInt,
    ModInt,
    PushArg { index: u32, ptr: u32 },
    PopArg { index: u32 },
    SetBytes { value: i32 },
    NewInt { value: i32 },
    NewStr { text: u32 },
    NewArr { length: u32 },
    Jmp { offset: i32 },
    Branch { cond: Condition, offset: i32 },
}

/// Comparison of a conditional jump, applied as `left cond right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Condition {
    pub fn from_op(op: Op) -> Option<Self> {
        Some(match op {
            Op::JmpEqInt => Self::Eq,
            Op::JmpNeqInt => Self::Neq,
            Op::JmpGtInt => Self::Gt,
            Op::JmpGeInt => Self::Ge,
            Op::JmpLtInt => Self::Lt,
            Op::JmpLeInt => Self::Le,
            _ => return None,
        })
    }

    pub fn op(self) -> Op {
        match self {
            Self::Eq => Op::JmpEqInt,
            Self::Neq => Op::JmpNeqInt,
            Self::Gt => Op::JmpGtInt,
            Self::Ge => Op::JmpGeInt,
            Self::Lt => Op::JmpLtInt,
            Self::Le => Op::JmpLeInt,
        }
    }

    #[inline]
    pub fn holds(self, left: i32, right: i32) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Neq => left != right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Lt => left < right,
            Self::Le => left <= right,
        }
    }
}

impl Instruction {
    /// Build an instruction from its opcode, pulling each operand word from
    /// `next` in encoding order.
    pub fn read<E>(op: Op, mut next: impl FnMut() -> Result<i32, E>) -> Result<Self, E> {
        let insn = match op {
            Op::Halt => Self::Halt,
            Op::Syscall => Self::Syscall { id: next()? },
            Op::Call => Self::Call { selector: next()? as u32 },
            Op::Return => Self::Return,
            Op::ReturnTop => Self::ReturnTop,
            Op::New => Self::New { class: next()? as u32 },
            Op::GetField => Self::GetField,
            Op::SetField => Self::SetField,
            Op::PushRef => Self::PushRef { ptr: next()? as u32 },
            Op::PopRef => Self::PopRef,
            Op::PushInt => Self::PushInt { value: next()? },
            Op::PopInt => Self::PopInt,
            Op::PushLocal => Self::PushLocal { index: next()? as u32 },
            Op::PopLocal => Self::PopLocal { index: next()? as u32 },
            Op::AddInt => Self::AddInt,
            Op::SubInt => Self::SubInt,
            Op::MulInt => Self::MulInt,
            Op::DivInt => Self::DivInt,
            Op::ModInt => Self::ModInt,
            Op::PushArg => {
                let index = next()? as u32;
                let ptr = next()? as u32;
                Self::PushArg { index, ptr }
            }
            Op::PopArg => Self::PopArg { index: next()? as u32 },
            Op::SetBytes => Self::SetBytes { value: next()? },
            Op::NewInt => Self::NewInt { value: next()? },
            Op::NewStr => Self::NewStr { text: next()? as u32 },
            Op::NewArr => Self::NewArr { length: next()? as u32 },
            Op::Jmp => Self::Jmp { offset: next()? },
            Op::JmpEqInt => Self::Branch { cond: Condition::Eq, offset: next()? },
            Op::JmpNeqInt => Self::Branch { cond: Condition::Neq, offset: next()? },
            Op::JmpGtInt => Self::Branch { cond: Condition::Gt, offset: next()? },
            Op::JmpGeInt => Self::Branch { cond: Condition::Ge, offset: next()? },
            Op::JmpLtInt => Self::Branch { cond: Condition::Lt, offset: next()? },
            Op::JmpLeInt => Self::Branch { cond: Condition::Le, offset: next()? },
        };
        Ok(insn)
    }

    pub fn op(&self) -> Op {
        match *self {
            Self::Halt => Op::Halt,
            Self::Syscall { .. } => Op::Syscall,
            Self::Call { .. } => Op::Call,
            Self::Return => Op::Return,
            Self::ReturnTop => Op::ReturnTop,
            Self::New { .. } => Op::New,
            Self::GetField => Op::GetField,
            Self::SetField => Op::SetField,
            Self::PushRef { .. } => Op::PushRef,
            Self::PopRef => Op::PopRef,
            Self::PushInt { .. } => Op::PushInt,
            Self::PopInt => Op::PopInt,
            Self::PushLocal { .. } => Op::PushLocal,
            Self::PopLocal { .. } => Op::PopLocal,
            Self::AddInt => Op::AddInt,
            Self::SubInt => Op::SubInt,
            Self::MulInt => Op::MulInt,
            Self::DivInt => Op::DivInt,
            Self::ModInt => Op::ModInt,
            Self::PushArg { .. } => Op::PushArg,
            Self::PopArg { .. } => Op::PopArg,
            Self::SetBytes { .. } => Op::SetBytes,
            Self::NewInt { .. } => Op::NewInt,
            Self::NewStr { .. } => Op::NewStr,
            Self::NewArr { .. } => Op::NewArr,
            Self::Jmp { .. } => Op::Jmp,
            Self::Branch { cond, .. } => cond.op(),
        }
    }

    /// Operand words in encoding order.
    pub fn operands(&self) -> Vec<i32> {
        match *self {
            Self::Syscall { id } => vec![id],
            Self::Call { selector } => vec![selector as i32],
            Self::New { class } => vec![class as i32],
            Self::PushRef { ptr } => vec![ptr as i32],
            Self::PushInt { value } | Self::SetBytes { value } | Self::NewInt { value } => {
                vec![value]
            }
            Self::PushLocal { index } | Self::PopLocal { index } | Self::PopArg { index } => {
                vec![index as i32]
            }
            Self::PushArg { index, ptr } => vec![index as i32, ptr as i32],
            Self::NewStr { text } => vec![text as i32],
            Self::NewArr { length } => vec![length as i32],
            Self::Jmp { offset } | Self::Branch { offset, .. } => vec![offset],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.op().mnemonic();
        match *self {
            Self::Call { selector } => write!(f, "{name} #{selector}"),
            Self::New { class } => write!(f, "{name} class#{class}"),
            Self::PushRef { ptr } => write!(f, "{name} @{ptr}"),
            Self::PushArg { index, ptr } => write!(f, "{name} {index} @{ptr}"),
            Self::NewStr { text } => write!(f, "{name} #{text}"),
            Self::NewArr { length } => write!(f, "{name} #{length}"),
            Self::Jmp { offset } | Self::Branch { offset, .. } => write!(f, "{name} {offset:+}"),
            _ => {
                f.write_str(name)?;
                for operand in self.operands() {
                    write!(f, " {operand}")?;
                }
                Ok(())
            }
        }
    }
}
