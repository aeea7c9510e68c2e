use core::fmt;

/// A byte address into the heap buffer.
///
/// The pointer is a plain handle: it does not own anything and may go stale
/// when the collector moves the object it addresses. [`HeapPointer::NULL`]
/// is the reserved out-of-range sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct HeapPointer(u32);

impl HeapPointer {
    pub const NULL: Self = Self(u32::MAX);

    #[inline(always)]
    pub const fn new(address: u32) -> Self {
        Self(address)
    }

    /// Reinterpret a raw stack or field word as a pointer.
    #[inline(always)]
    pub const fn from_word(word: i32) -> Self {
        Self(word as u32)
    }

    #[inline(always)]
    pub const fn address(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub const fn as_word(self) -> i32 {
        self.0 as i32
    }

    #[inline(always)]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    /// `None` for the sentinel, the pointer otherwise.
    #[inline]
    pub const fn non_null(self) -> Option<Self> {
        if self.is_null() { None } else { Some(self) }
    }

    #[inline(always)]
    pub const fn offset(self, bytes: usize) -> usize {
        self.0 as usize + bytes
    }
}

impl fmt::Debug for HeapPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "HeapPointer(NULL)")
        } else {
            write!(f, "HeapPointer({:#06x})", self.0)
        }
    }
}

impl fmt::Display for HeapPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("NULL")
        } else {
            write!(f, "@{}", self.0)
        }
    }
}

/// A byte address into the append-only code arena.
///
/// Used both as the program counter and as method entry points. Supports
/// signed arithmetic for relative jumps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct CodePointer(u32);

impl CodePointer {
    #[inline(always)]
    pub const fn new(address: u32) -> Self {
        Self(address)
    }

    #[inline(always)]
    pub const fn address(self) -> u32 {
        self.0
    }

    /// Pointer arithmetic: move `delta` bytes forward (or backward when
    /// negative). Wraps like the 32-bit address it models.
    #[inline(always)]
    pub const fn arith(self, delta: i32) -> Self {
        Self(self.0.wrapping_add_signed(delta))
    }

    #[inline(always)]
    pub const fn as_word(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Debug for CodePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodePointer({:#06x})", self.0)
    }
}

impl fmt::Display for CodePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_pointer_equality() {
        let p1 = CodePointer::new(123);
        let p2 = CodePointer::new(123);
        let p3 = CodePointer::new(321);

        assert_eq!(p1, p2);
        assert_eq!(p2, p1);
        assert_ne!(p1, p3);
        assert_ne!(p3, p2);
    }

    #[test]
    fn code_pointer_arithmetic() {
        let p = CodePointer::new(123);
        let p = p.arith(10);
        assert_eq!(p.address(), 133);
        let p = p.arith(-20);
        assert_eq!(p.address(), 113);
    }

    #[test]
    fn null_sentinel() {
        assert!(HeapPointer::NULL.is_null());
        assert_eq!(HeapPointer::NULL.non_null(), None);
        assert_eq!(HeapPointer::from_word(-1), HeapPointer::NULL);
        assert!(!HeapPointer::new(0).is_null());
        assert_eq!(HeapPointer::new(40).non_null(), Some(HeapPointer::new(40)));
    }

    #[test]
    fn pointer_word_round_trip() {
        let p = HeapPointer::new(0x1234);
        assert_eq!(HeapPointer::from_word(p.as_word()), p);
        assert_eq!(HeapPointer::NULL.as_word(), -1);
    }
}
