use crate::error::DecodeError;
use crate::instruction::Instruction;
use crate::op::Op;

/// Decodes a bytecode byte slice into [`Instruction`]s.
///
/// Unlike the interpreter, which fetches through the memory manager, the
/// decoder works on a plain slice and is used for listings and tests.
pub struct BytecodeDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BytecodeDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset in the stream.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Decode the next instruction, or `None` at end-of-stream.
    pub fn decode_next(&mut self) -> Option<Result<Instruction, DecodeError>> {
        if self.is_at_end() {
            return None;
        }
        Some(self.decode())
    }

    fn decode(&mut self) -> Result<Instruction, DecodeError> {
        let at = self.pos;
        let byte = self.bytes[at];
        let op = Op::try_from(byte).map_err(|byte| DecodeError::UnknownOpcode { byte, at })?;
        self.pos += 1;
        Instruction::read(op, || self.read_i32().ok_or(DecodeError::Truncated { op, at }))
    }

    #[inline(always)]
    fn read_i32(&mut self) -> Option<i32> {
        let word: [u8; 4] = self.bytes.get(self.pos..self.pos + 4)?.try_into().ok()?;
        self.pos += 4;
        Some(i32::from_be_bytes(word))
    }
}

impl Iterator for BytecodeDecoder<'_> {
    type Item = Result<Instruction, DecodeError>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.decode_next()?;
        if item.is_err() {
            // stop after the first malformed instruction
            self.pos = self.bytes.len();
        }
        Some(item)
    }
}

/// Render `bytes` as one `offset: instruction` line per instruction,
/// numbering offsets from `base`.
pub fn disassemble(bytes: &[u8], base: usize) -> Result<String, DecodeError> {
    let mut out = String::new();
    let mut decoder = BytecodeDecoder::new(bytes);
    while !decoder.is_at_end() {
        let at = decoder.offset();
        let Some(insn) = decoder.decode_next() else {
            break;
        };
        out.push_str(&format!("{:06}: {}\n", base + at, insn?));
    }
    Ok(out)
}
