use object::HeapPointer;

use crate::settings::LOW_ADDRESS_GUARD;

/// The heap buffer, split into two equal semi-spaces.
///
/// Addresses are absolute offsets into the buffer, so an address tells which
/// semi-space it belongs to. Only the active space receives allocations.
pub struct SemiSpaces {
    bytes: Vec<u8>,
    half: usize,
    active: usize,
    top: usize,
}

impl SemiSpaces {
    pub fn new(heap_size: usize) -> Self {
        let half = heap_size / 2;
        Self {
            bytes: vec![0; LOW_ADDRESS_GUARD + 2 * half],
            half,
            active: 0,
            top: LOW_ADDRESS_GUARD,
        }
    }

    #[inline(always)]
    fn start_of(&self, space: usize) -> usize {
        LOW_ADDRESS_GUARD + space * self.half
    }

    #[inline]
    pub fn active_start(&self) -> usize {
        self.start_of(self.active)
    }

    #[inline]
    pub fn active_end(&self) -> usize {
        self.active_start() + self.half
    }

    #[inline]
    pub fn inactive_start(&self) -> usize {
        self.start_of(1 - self.active)
    }

    /// Allocation cursor.
    #[inline]
    pub fn top(&self) -> usize {
        self.top
    }

    /// Size of one semi-space.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.half
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.top - self.active_start()
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.active_end() - self.top
    }

    /// Bump-allocate `size` zeroed bytes from the active space.
    pub fn bump(&mut self, size: usize) -> Option<HeapPointer> {
        if size > self.free() {
            return None;
        }
        let at = self.top;
        self.bytes[at..at + size].fill(0);
        self.top += size;
        Some(HeapPointer::new(at as u32))
    }

    /// Whether `[at, at + len)` lies in the allocated part of the active space.
    #[inline]
    pub fn is_allocated(&self, at: HeapPointer, len: usize) -> bool {
        !at.is_null() && at.offset(0) >= self.active_start() && at.offset(len) <= self.top
    }

    /// Make the inactive space active with its cursor at `top` and wipe the
    /// space that was active until now.
    pub fn flip(&mut self, top: usize) {
        let old = self.active_start();
        self.bytes[old..old + self.half].fill(0);
        self.active = 1 - self.active;
        debug_assert!(top >= self.active_start() && top <= self.active_end());
        self.top = top;
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
