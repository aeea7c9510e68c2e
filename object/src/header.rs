use crate::HeapPointer;
use crate::word::{REF_SIZE, WORD_SIZE, read_u32, write_u32};

/// Sentinel written into the first byte of every object header.
///
/// The conservative stack scan relies on it to tell object starts from
/// arbitrary bytes.
pub const MARKER: u8 = 0xF0;

pub const MARKER_OFFSET: usize = 0;
pub const KIND_OFFSET: usize = MARKER_OFFSET + 1;
pub const GC_STATE_OFFSET: usize = KIND_OFFSET + 1;
pub const SIZE_OFFSET: usize = GC_STATE_OFFSET + 1;
pub const CLASS_OFFSET: usize = SIZE_OFFSET + WORD_SIZE;
pub const DATA_OFFSET: usize = CLASS_OFFSET + REF_SIZE;

/// Marker + kind + gc-state + size + class.
pub const HEADER_SIZE: usize = DATA_OFFSET;

/// Storage kind of an object's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectKind {
    /// `size` consecutive reference slots.
    PointerIndexed = 0x01,
    /// `size` raw bytes.
    ByteIndexed = 0x02,
}

impl ObjectKind {
    /// Payload length in bytes for an object of this kind with `size` elements.
    #[inline]
    pub const fn payload_bytes(self, size: u32) -> usize {
        match self {
            ObjectKind::PointerIndexed => size as usize * REF_SIZE,
            ObjectKind::ByteIndexed => size as usize,
        }
    }

    /// Total footprint (header + payload) in bytes.
    #[inline]
    pub const fn object_bytes(self, size: u32) -> usize {
        HEADER_SIZE + self.payload_bytes(size)
    }
}

impl TryFrom<u8> for ObjectKind {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        match byte {
            0x01 => Ok(ObjectKind::PointerIndexed),
            0x02 => Ok(ObjectKind::ByteIndexed),
            other => Err(other),
        }
    }
}

/// Collector bookkeeping byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GcState {
    Normal = 0xAA,
    /// The object has been evacuated; its class slot holds the new address.
    Copied = 0xBB,
}

impl TryFrom<u8> for GcState {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        match byte {
            0xAA => Ok(GcState::Normal),
            0xBB => Ok(GcState::Copied),
            other => Err(other),
        }
    }
}

/// Interpretation of the class slot, selected by the gc-state byte.
///
/// The slot is shared on purpose: once an object is copied its class pointer
/// is no longer needed at the old location, so the slot carries the
/// forwarding address instead. The variant keeps the two meanings apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    Normal { class: HeapPointer },
    Forwarded { to: HeapPointer },
}

/// Decoded object header.
///
/// ```text
/// byte 0:     marker (0xF0)
/// byte 1:     kind (PointerIndexed | ByteIndexed)
/// byte 2:     gc-state (Normal | Copied)
/// bytes 3..7: size, big-endian (fields or bytes)
/// bytes 7..11: class pointer, or forwarding address when Copied
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: ObjectKind,
    pub size: u32,
    pub state: HeaderState,
}

impl Header {
    pub const fn new(kind: ObjectKind, size: u32, class: HeapPointer) -> Self {
        Self {
            kind,
            size,
            state: HeaderState::Normal { class },
        }
    }

    /// Class pointer of a normal object, `None` once forwarded.
    #[inline]
    pub const fn class(&self) -> Option<HeapPointer> {
        match self.state {
            HeaderState::Normal { class } => Some(class),
            HeaderState::Forwarded { .. } => None,
        }
    }

    #[inline]
    pub const fn forwarding(&self) -> Option<HeapPointer> {
        match self.state {
            HeaderState::Forwarded { to } => Some(to),
            HeaderState::Normal { .. } => None,
        }
    }

    #[inline]
    pub const fn payload_bytes(&self) -> usize {
        self.kind.payload_bytes(self.size)
    }

    #[inline]
    pub const fn object_bytes(&self) -> usize {
        self.kind.object_bytes(self.size)
    }

    /// Decode the header stored at `at`.
    ///
    /// Returns `None` if the header would run past the buffer, the marker does
    /// not match, or the kind/gc-state bytes are not valid tags.
    pub fn read(heap: &[u8], at: HeapPointer) -> Option<Self> {
        if at.is_null() || at.offset(HEADER_SIZE) > heap.len() {
            return None;
        }
        let base = at.offset(0);
        if heap[base + MARKER_OFFSET] != MARKER {
            return None;
        }
        let kind = ObjectKind::try_from(heap[base + KIND_OFFSET]).ok()?;
        let gc_state = GcState::try_from(heap[base + GC_STATE_OFFSET]).ok()?;
        let size = read_u32(heap, base + SIZE_OFFSET);
        let slot = HeapPointer::new(read_u32(heap, base + CLASS_OFFSET));
        let state = match gc_state {
            GcState::Normal => HeaderState::Normal { class: slot },
            GcState::Copied => HeaderState::Forwarded { to: slot },
        };
        Some(Self { kind, size, state })
    }

    /// Encode this header at `at`, including the marker.
    pub fn write(&self, heap: &mut [u8], at: HeapPointer) {
        let base = at.offset(0);
        heap[base + MARKER_OFFSET] = MARKER;
        heap[base + KIND_OFFSET] = self.kind as u8;
        let (gc_state, slot) = match self.state {
            HeaderState::Normal { class } => (GcState::Normal, class),
            HeaderState::Forwarded { to } => (GcState::Copied, to),
        };
        heap[base + GC_STATE_OFFSET] = gc_state as u8;
        write_u32(heap, base + SIZE_OFFSET, self.size);
        write_u32(heap, base + CLASS_OFFSET, slot.address());
    }
}

/// Turn the object at `at` into a forwarding stub pointing at `to`.
///
/// Only the gc-state byte and the class slot change; kind and size stay
/// readable so the old extent can still be measured.
pub fn forward(heap: &mut [u8], at: HeapPointer, to: HeapPointer) {
    let base = at.offset(0);
    heap[base + GC_STATE_OFFSET] = GcState::Copied as u8;
    write_u32(heap, base + CLASS_OFFSET, to.address());
}

/// Overwrite only the class slot of a normal object.
pub fn set_class(heap: &mut [u8], at: HeapPointer, class: HeapPointer) {
    write_u32(heap, at.offset(CLASS_OFFSET), class.address());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        assert_eq!(HEADER_SIZE, 11);
        assert_eq!(ObjectKind::PointerIndexed.object_bytes(2), 19);
        assert_eq!(ObjectKind::ByteIndexed.object_bytes(4), 15);
    }

    #[test]
    fn header_round_trip() {
        let mut heap = vec![0u8; 64];
        let at = HeapPointer::new(5);
        let header = Header::new(ObjectKind::ByteIndexed, 4, HeapPointer::new(33));
        header.write(&mut heap, at);

        assert_eq!(heap[5], MARKER);
        assert_eq!(Header::read(&heap, at), Some(header));
        assert_eq!(Header::read(&heap, at).and_then(|h| h.class()), Some(HeapPointer::new(33)));
    }

    #[test]
    fn unmarked_bytes_are_not_a_header() {
        let heap = vec![0u8; 32];
        assert_eq!(Header::read(&heap, HeapPointer::new(0)), None);
        assert_eq!(Header::read(&heap, HeapPointer::NULL), None);
        // header would run past the end
        assert_eq!(Header::read(&heap, HeapPointer::new(30)), None);
    }

    #[test]
    fn forwarding_replaces_class() {
        let mut heap = vec![0u8; 32];
        let at = HeapPointer::new(0);
        Header::new(ObjectKind::PointerIndexed, 1, HeapPointer::NULL).write(&mut heap, at);
        forward(&mut heap, at, HeapPointer::new(16));

        let header = Header::read(&heap, at).unwrap();
        assert_eq!(header.class(), None);
        assert_eq!(header.forwarding(), Some(HeapPointer::new(16)));
        assert_eq!(header.size, 1);
        assert_eq!(header.kind, ObjectKind::PointerIndexed);
    }

    #[test]
    fn invalid_tags_rejected() {
        let mut heap = vec![0u8; 16];
        heap[0] = MARKER;
        heap[1] = 0x07;
        heap[2] = GcState::Normal as u8;
        assert_eq!(Header::read(&heap, HeapPointer::new(0)), None);
    }
}
