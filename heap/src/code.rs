use object::word::read_i32;
use object::{CodePointer, WORD_SIZE};

use crate::MemoryError;

/// Append-only bytecode storage.
pub struct CodeArena {
    bytes: Vec<u8>,
    limit: usize,
}

impl CodeArena {
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Append `code` and return where it starts.
    pub fn store(&mut self, code: &[u8]) -> Result<CodePointer, MemoryError> {
        let available = self.limit - self.bytes.len();
        if code.len() > available {
            return Err(MemoryError::CodeOverflow {
                requested: code.len(),
                available,
            });
        }
        let start = CodePointer::new(self.bytes.len() as u32);
        self.bytes.extend_from_slice(code);
        Ok(start)
    }

    pub fn read_u8(&self, at: CodePointer) -> Result<u8, MemoryError> {
        self.bytes
            .get(at.address() as usize)
            .copied()
            .ok_or(MemoryError::PcOutOfBounds(at))
    }

    pub fn read_word(&self, at: CodePointer) -> Result<i32, MemoryError> {
        let start = at.address() as usize;
        if start + WORD_SIZE > self.bytes.len() {
            return Err(MemoryError::PcOutOfBounds(at));
        }
        Ok(read_i32(&self.bytes, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_appends() {
        let mut code = CodeArena::new(16);
        let a = code.store(&[0x0A, 0, 0, 0, 7]).unwrap();
        let b = code.store(&[0x03]).unwrap();
        assert_eq!(a, CodePointer::new(0));
        assert_eq!(b, CodePointer::new(5));
        assert_eq!(code.read_u8(a), Ok(0x0A));
        assert_eq!(code.read_word(a.arith(1)), Ok(7));
        assert_eq!(code.read_word(b), Err(MemoryError::PcOutOfBounds(b)));
    }

    #[test]
    fn overflow_is_reported() {
        let mut code = CodeArena::new(4);
        code.store(&[1, 2, 3]).unwrap();
        assert_eq!(
            code.store(&[4, 5]),
            Err(MemoryError::CodeOverflow { requested: 2, available: 1 })
        );
        assert_eq!(code.len(), 3);
    }
}
