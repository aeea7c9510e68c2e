//! Host services reached through the `syscall` instruction.
//!
//! A syscall takes no operands of its own: it pops what it needs from the
//! operand stack and pushes its result, if any.

use crate::{Vm, VmError};

pub mod array;
pub mod file;
pub mod io;
pub mod string;

pub use file::FileTable;

pub type SyscallFn = fn(&mut Vm) -> Result<(), VmError>;

#[derive(Clone, Copy)]
pub struct SyscallDesc {
    pub id: i32,
    pub name: &'static str,
    pub func: SyscallFn,
}

impl SyscallDesc {
    pub const fn new(id: i32, name: &'static str, func: SyscallFn) -> Self {
        Self { id, name, func }
    }
}

impl std::fmt::Debug for SyscallDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "syscall {} ({})", self.id, self.name)
    }
}

pub fn default_syscalls() -> Vec<SyscallDesc> {
    vec![
        SyscallDesc::new(1, "print", io::print),
        SyscallDesc::new(2, "open-file-r", file::open_file_r),
        SyscallDesc::new(3, "open-file-w", file::open_file_w),
        SyscallDesc::new(4, "close-file-r", file::close_file_r),
        SyscallDesc::new(5, "close-file-w", file::close_file_w),
        SyscallDesc::new(6, "read-line", file::read_line),
        SyscallDesc::new(7, "write-line", file::write_line),
        SyscallDesc::new(8, "print-int", io::print_int),
        SyscallDesc::new(9, "str-length", string::str_length),
        SyscallDesc::new(10, "str-append", string::str_append),
        SyscallDesc::new(11, "arr-length", array::arr_length),
        SyscallDesc::new(12, "str-split", string::str_split),
    ]
}

/// Syscalls by id, owned by the [`Vm`].
#[derive(Debug, Clone)]
pub struct SyscallTable {
    entries: Vec<SyscallDesc>,
}

impl SyscallTable {
    pub fn new(entries: Vec<SyscallDesc>) -> Self {
        Self { entries }
    }

    pub fn get(&self, id: i32) -> Option<&SyscallDesc> {
        self.entries.iter().find(|desc| desc.id == id)
    }

    pub fn id_of(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|desc| desc.name == name)
            .map(|desc| desc.id)
    }

    /// Add `desc`, replacing any entry with the same id.
    pub fn register(&mut self, desc: SyscallDesc) {
        self.entries.retain(|d| d.id != desc.id);
        self.entries.push(desc);
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyscallDesc> {
        self.entries.iter()
    }
}

impl Default for SyscallTable {
    fn default() -> Self {
        Self::new(default_syscalls())
    }
}

/// Run syscall `id` against the operand stack.
pub fn invoke(vm: &mut Vm, id: i32) -> Result<(), VmError> {
    let desc = vm
        .syscalls
        .get(id)
        .copied()
        .ok_or(VmError::UnknownSyscall(id))?;
    log::trace!("{desc:?}");
    (desc.func)(vm)
}
