use thiserror::Error;

use crate::Op;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode 0x{byte:02X} at offset {at}")]
    UnknownOpcode { byte: u8, at: usize },

    #[error("`{}` at offset {at} is missing operands", op.mnemonic())]
    Truncated { op: Op, at: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: `{mnemonic}` takes {expected} operand(s), found {found}")]
    Arity {
        line: usize,
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid operand `{operand}`")]
    BadOperand { line: usize, operand: String },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: label `{label}` defined twice")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: unknown label `{label}`")]
    UnknownLabel { line: usize, label: String },

    #[error("line {line}: cannot resolve `{name}` for `{mnemonic}`")]
    Unresolved {
        line: usize,
        mnemonic: &'static str,
        name: String,
    },
}
