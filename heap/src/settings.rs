use object::HEADER_SIZE;

use crate::MemoryError;

/// Bytes at the bottom of the heap buffer that are never handed out.
///
/// Small integers left on the stack therefore cannot alias an object start
/// during the conservative stack scan.
pub const LOW_ADDRESS_GUARD: usize = 4096;

/// Arena sizes of a [`MemoryManager`](crate::MemoryManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySettings {
    /// Total heap size in bytes. Split into two equal semi-spaces.
    pub heap_size: usize,
    /// Operand/frame stack size in bytes.
    pub stack_size: usize,
    /// Code arena size in bytes.
    pub code_size: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            heap_size: 64 * 1024,  // 2 x 32 KiB
            stack_size: 16 * 1024, // 4096 words
            code_size: 64 * 1024,
        }
    }
}

impl MemorySettings {
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.heap_size == 0 || self.stack_size == 0 || self.code_size == 0 {
            return Err(MemoryError::InvalidSettings("sizes must be > 0"));
        }
        if self.heap_size / 2 < HEADER_SIZE {
            return Err(MemoryError::InvalidSettings(
                "heap_size must fit one object header per semi-space",
            ));
        }
        if LOW_ADDRESS_GUARD + self.heap_size >= u32::MAX as usize {
            return Err(MemoryError::InvalidSettings(
                "heap_size exceeds the 32-bit address range",
            ));
        }
        if self.stack_size >= u32::MAX as usize || self.code_size >= u32::MAX as usize {
            return Err(MemoryError::InvalidSettings(
                "stack_size and code_size must be addressable with 32 bits",
            ));
        }
        Ok(())
    }
}
