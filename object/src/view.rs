//! Typed views over raw heap bytes.
//!
//! A view is a `(buffer, address)` pair plus the decoded header. It never
//! owns memory and is only valid until the next allocation, since an
//! allocation may run the collector and move the object.

use crate::header::{DATA_OFFSET, Header, ObjectKind, set_class};
use crate::word::{REF_SIZE, bytes_to_int, read_i32, write_i32};
use crate::HeapPointer;

#[derive(Clone, Copy)]
pub struct ObjectView<'a> {
    heap: &'a [u8],
    at: HeapPointer,
    header: Header,
}

impl<'a> ObjectView<'a> {
    /// Read the object at `at`. `None` if there is no valid, fully
    /// contained object there.
    pub fn new(heap: &'a [u8], at: HeapPointer) -> Option<Self> {
        let header = Header::read(heap, at)?;
        if at.offset(header.object_bytes()) > heap.len() {
            return None;
        }
        Some(Self { heap, at, header })
    }

    #[inline]
    pub fn address(&self) -> HeapPointer {
        self.at
    }

    #[inline]
    pub fn header(&self) -> Header {
        self.header
    }

    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.header.kind
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.header.size
    }

    #[inline]
    pub fn class(&self) -> Option<HeapPointer> {
        self.header.class()
    }

    #[inline]
    pub fn is_pointer_indexed(&self) -> bool {
        self.header.kind == ObjectKind::PointerIndexed
    }

    #[inline]
    pub fn is_byte_indexed(&self) -> bool {
        self.header.kind == ObjectKind::ByteIndexed
    }

    /// Raw word stored in field `index` of a pointer-indexed object.
    pub fn field_word(&self, index: u32) -> Option<i32> {
        if !self.is_pointer_indexed() || index >= self.header.size {
            return None;
        }
        Some(read_i32(self.heap, field_offset(self.at, index)))
    }

    pub fn field(&self, index: u32) -> Option<HeapPointer> {
        self.field_word(index).map(HeapPointer::from_word)
    }

    /// Iterate over every field as a pointer. Empty for byte-indexed objects.
    pub fn fields(&self) -> impl Iterator<Item = HeapPointer> + '_ {
        let count = if self.is_pointer_indexed() { self.header.size } else { 0 };
        (0..count).filter_map(|i| self.field(i))
    }

    /// Raw payload of the object.
    pub fn bytes(&self) -> &'a [u8] {
        let start = self.at.offset(DATA_OFFSET);
        &self.heap[start..start + self.header.payload_bytes()]
    }

    /// Integer value of a byte-indexed object with at least four bytes.
    pub fn int_value(&self) -> Option<i32> {
        if !self.is_byte_indexed() {
            return None;
        }
        bytes_to_int(self.bytes())
    }
}

impl core::fmt::Debug for ObjectView<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectView")
            .field("at", &self.at)
            .field("header", &self.header)
            .finish()
    }
}

/// Mutable counterpart of [`ObjectView`].
pub struct ObjectViewMut<'a> {
    heap: &'a mut [u8],
    at: HeapPointer,
    header: Header,
}

impl<'a> ObjectViewMut<'a> {
    pub fn new(heap: &'a mut [u8], at: HeapPointer) -> Option<Self> {
        let header = Header::read(heap, at)?;
        if at.offset(header.object_bytes()) > heap.len() {
            return None;
        }
        Some(Self { heap, at, header })
    }

    #[inline]
    pub fn header(&self) -> Header {
        self.header
    }

    /// Store a raw word into field `index`. Returns `false` if the object is
    /// byte-indexed or the index is out of bounds.
    pub fn set_field_word(&mut self, index: u32, value: i32) -> bool {
        if self.header.kind != ObjectKind::PointerIndexed || index >= self.header.size {
            return false;
        }
        write_i32(self.heap, field_offset(self.at, index), value);
        true
    }

    pub fn set_field(&mut self, index: u32, value: HeapPointer) -> bool {
        self.set_field_word(index, value.as_word())
    }

    /// Overwrite the class slot. Only meaningful for a normal header.
    pub fn set_class(&mut self, class: HeapPointer) {
        set_class(self.heap, self.at, class);
        self.header = Header::new(self.header.kind, self.header.size, class);
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let start = self.at.offset(DATA_OFFSET);
        let len = self.header.payload_bytes();
        &mut self.heap[start..start + len]
    }
}

/// Byte offset of field `index` of the object at `at`.
#[inline(always)]
pub const fn field_offset(at: HeapPointer, index: u32) -> usize {
    at.offset(DATA_OFFSET + index as usize * REF_SIZE)
}
