//! Big-endian word codec shared by the heap, the stack and the code arena.

/// Size of a machine word (and of a reference) in every arena.
pub const WORD_SIZE: usize = 4;

/// Size of a reference slot. Identical to [`WORD_SIZE`].
pub const REF_SIZE: usize = WORD_SIZE;

#[inline(always)]
pub fn read_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline(always)]
pub fn write_i32(bytes: &mut [u8], at: usize, value: i32) {
    bytes[at..at + WORD_SIZE].copy_from_slice(&value.to_be_bytes());
}

#[inline(always)]
pub fn read_u32(bytes: &[u8], at: usize) -> u32 {
    read_i32(bytes, at) as u32
}

#[inline(always)]
pub fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    write_i32(bytes, at, value as i32);
}

/// Encode an integer payload the way Integer objects store it.
#[inline]
pub fn int_to_bytes(value: i32) -> [u8; WORD_SIZE] {
    value.to_be_bytes()
}

/// Decode the first word of an Integer payload.
///
/// Returns `None` when fewer than [`WORD_SIZE`] bytes are available.
#[inline]
pub fn bytes_to_int(bytes: &[u8]) -> Option<i32> {
    let word: [u8; WORD_SIZE] = bytes.get(..WORD_SIZE)?.try_into().ok()?;
    Some(i32::from_be_bytes(word))
}
