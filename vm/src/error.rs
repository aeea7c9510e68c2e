use std::io;

use bytecode::{AssembleError, DecodeError};
use heap::MemoryError;
use object::{CodePointer, HeapPointer};
use thiserror::Error;

/// Everything that aborts a program run.
#[derive(Debug, Error)]
pub enum VmError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("unknown opcode 0x{byte:02X} at {at}")]
    UnknownOpcode { byte: u8, at: CodePointer },

    #[error("method {selector:?} not found in class {class}")]
    MethodNotFound { selector: String, class: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("field {index} is out of bounds for {object}")]
    FieldOutOfBounds { object: HeapPointer, index: i32 },

    #[error("expected {expected} at {object}")]
    TypeMismatch {
        expected: &'static str,
        object: HeapPointer,
    },

    #[error("negative array length {0}")]
    NegativeLength(i32),

    #[error("constant #{index} is not {expected}")]
    ConstantKind { index: u32, expected: &'static str },

    #[error("unknown syscall {0}")]
    UnknownSyscall(i32),

    #[error("unknown file handle {0}")]
    UnknownFileHandle(i32),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
