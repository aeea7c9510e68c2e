pub mod alloc;
mod error;
pub mod interpreter;
pub mod lookup;
pub mod special;
pub mod syscalls;

use std::io::{self, Write};

use bytecode::{Op, OperandResolver};
use heap::{Constant, MemoryManager, MemorySettings};
use object::CodePointer;

pub use error::VmError;
pub use special::SpecialClasses;
pub use syscalls::{FileTable, SyscallDesc, SyscallTable, default_syscalls};

/// A virtual machine: memory, bootstrapped library classes and the host
/// side of the syscall interface.
pub struct Vm {
    pub mm: MemoryManager,
    pub special: SpecialClasses,
    pub syscalls: SyscallTable,
    /// Sink for `print` and `print-int`.
    pub output: Box<dyn Write>,
    pub files: FileTable,
}

pub struct VmCreateInfo {
    pub memory: MemorySettings,
    pub syscalls: SyscallTable,
    pub output: Box<dyn Write>,
}

impl Default for VmCreateInfo {
    fn default() -> Self {
        Self {
            memory: MemorySettings::default(),
            syscalls: SyscallTable::default(),
            output: Box::new(io::stdout()),
        }
    }
}

impl Vm {
    /// Create a VM with the library classes in place.
    pub fn new(info: VmCreateInfo) -> Result<Self, VmError> {
        let mut vm = Self::bare(info)?;
        special::bootstrap(&mut vm)?;
        Ok(vm)
    }

    /// Create a VM with empty class tables.
    pub fn bare(info: VmCreateInfo) -> Result<Self, VmError> {
        Ok(Self {
            mm: MemoryManager::new(info.memory)?,
            special: SpecialClasses::default(),
            syscalls: info.syscalls,
            output: info.output,
            files: FileTable::default(),
        })
    }

    /// Assemble `source` and store it in the code arena.
    pub fn assemble(&mut self, source: &str) -> Result<CodePointer, VmError> {
        let code = bytecode::assemble(source, self)?;
        Ok(self.mm.store_code(&code)?)
    }

    /// Assemble a method body given one instruction per entry.
    pub fn assemble_lines(&mut self, lines: &[&str]) -> Result<CodePointer, VmError> {
        let code = bytecode::assemble_lines(lines, self)?;
        Ok(self.mm.store_code(&code)?)
    }

    /// Run from `entry` in a fresh frame with `num_locals` locals.
    pub fn run(&mut self, entry: CodePointer, num_locals: u32) -> Result<(), VmError> {
        interpreter::interpret(self, entry, num_locals)
    }
}

impl OperandResolver for Vm {
    fn string_constant(&mut self, text: &str) -> u32 {
        self.mm.add_constant(Constant::Str(text.to_string()))
    }

    fn int_constant(&mut self, value: i32) -> u32 {
        self.mm.add_constant(Constant::Int(value))
    }

    fn name(&mut self, op: Op, name: &str) -> Option<i32> {
        match op {
            Op::Syscall => self.syscalls.id_of(name),
            Op::New => self.class_named(name).map(|id| id.0 as i32),
            Op::Call => Some(self.string_constant(name) as i32),
            _ => None,
        }
    }
}
