use object::{CodePointer, HeapPointer};
use thiserror::Error;

/// Fatal conditions raised by the memory manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("out of memory: requested {requested} bytes, {available} available after collection")]
    OutOfMemory { requested: usize, available: usize },

    #[error("code arena overflow: requested {requested} bytes, {available} available")]
    CodeOverflow { requested: usize, available: usize },

    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("frame at stack offset {0} has a broken caller link")]
    CorruptFrame(u32),

    #[error("dereferenced NULL")]
    NullDereference,

    #[error("no valid object at {0}")]
    InvalidObject(HeapPointer),

    #[error("program counter {0} outside the code arena")]
    PcOutOfBounds(CodePointer),

    #[error("constant index {0} out of range")]
    ConstantOutOfRange(u32),

    #[error("method index {0} out of range")]
    MethodOutOfRange(u32),

    #[error("class index {0} out of range")]
    ClassOutOfRange(u32),

    #[error("invalid memory settings: {0}")]
    InvalidSettings(&'static str),
}
