//! Operand and frame stack.
//!
//! ```text
//!        ... caller operands ...
//!        arg 1                      bp - 8
//!        arg 0 (receiver)           bp - 4
//! bp ->  caller bp (link)           bp
//!        return address             bp + 4
//!        local 0                    bp + 8
//!        local 1                    bp + 12
//!        ... operands ...
//! sp ->  (next free)
//! ```

use object::word::{read_i32, read_u32, write_i32};
use object::{CodePointer, HeapPointer, WORD_SIZE};

use crate::MemoryError;

/// Caller link of the outermost frame.
pub const NO_FRAME: u32 = u32::MAX;

const LINK_OFFSET: usize = 0;
const RETURN_OFFSET: usize = WORD_SIZE;
const LOCALS_OFFSET: usize = 2 * WORD_SIZE;

pub struct Stack {
    bytes: Vec<u8>,
    sp: usize,
    bp: u32,
}

impl Stack {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            sp: 0,
            bp: NO_FRAME,
        }
    }

    #[inline]
    pub fn sp(&self) -> usize {
        self.sp
    }

    #[inline]
    pub fn bp(&self) -> u32 {
        self.bp
    }

    // ── Operands ───────────────────────────────────────────────────

    pub fn push_word(&mut self, word: i32) -> Result<(), MemoryError> {
        if self.sp + WORD_SIZE > self.bytes.len() {
            return Err(MemoryError::StackOverflow);
        }
        write_i32(&mut self.bytes, self.sp, word);
        self.sp += WORD_SIZE;
        Ok(())
    }

    pub fn pop_word(&mut self) -> Result<i32, MemoryError> {
        if self.sp < WORD_SIZE {
            return Err(MemoryError::StackUnderflow);
        }
        self.sp -= WORD_SIZE;
        Ok(read_i32(&self.bytes, self.sp))
    }

    #[inline]
    pub fn push_pointer(&mut self, p: HeapPointer) -> Result<(), MemoryError> {
        self.push_word(p.as_word())
    }

    #[inline]
    pub fn pop_pointer(&mut self) -> Result<HeapPointer, MemoryError> {
        self.pop_word().map(HeapPointer::from_word)
    }

    /// Word `depth` slots below the top, without popping. `0` is the top.
    pub fn peek_word(&self, depth: usize) -> Result<i32, MemoryError> {
        let back = (depth + 1) * WORD_SIZE;
        if back > self.sp {
            return Err(MemoryError::StackUnderflow);
        }
        Ok(read_i32(&self.bytes, self.sp - back))
    }

    // ── Frames ─────────────────────────────────────────────────────

    /// Push the caller link and `return_to`, reserve `num_locals` NULL
    /// slots and make the link slot the new base pointer.
    pub fn new_frame(&mut self, num_locals: u32, return_to: CodePointer) -> Result<(), MemoryError> {
        let needed = LOCALS_OFFSET + num_locals as usize * WORD_SIZE;
        if self.sp + needed > self.bytes.len() {
            return Err(MemoryError::StackOverflow);
        }
        let base = self.sp;
        self.push_word(self.bp as i32)?;
        self.push_word(return_to.as_word())?;
        for _ in 0..num_locals {
            self.push_pointer(HeapPointer::NULL)?;
        }
        self.bp = base as u32;
        Ok(())
    }

    /// Drop the current frame and everything above it.
    ///
    /// Returns the frame's return address, or `None` if the restored caller
    /// link is [`NO_FRAME`].
    pub fn discard_frame(&mut self) -> Result<Option<CodePointer>, MemoryError> {
        if self.bp == NO_FRAME {
            return Err(MemoryError::StackUnderflow);
        }
        let base = self.bp as usize;
        // popped into its own frame words
        if base + LOCALS_OFFSET > self.sp {
            return Err(MemoryError::StackUnderflow);
        }
        let link = read_u32(&self.bytes, base + LINK_OFFSET);
        if link != NO_FRAME && link as usize + LOCALS_OFFSET > base {
            return Err(MemoryError::CorruptFrame(base as u32));
        }
        let return_to = CodePointer::new(read_u32(&self.bytes, base + RETURN_OFFSET));

        self.bytes[base..self.sp].fill(0);
        self.sp = base;
        self.bp = link;

        Ok((link != NO_FRAME).then_some(return_to))
    }

    fn arg_offset(&self, index: u32) -> Result<usize, MemoryError> {
        if self.bp == NO_FRAME {
            return Err(MemoryError::StackUnderflow);
        }
        let at = (self.bp as usize)
            .checked_sub(WORD_SIZE * (1 + index as usize))
            .ok_or(MemoryError::StackUnderflow)?;
        if at + WORD_SIZE > self.bytes.len() {
            return Err(MemoryError::CorruptFrame(self.bp));
        }
        Ok(at)
    }

    fn local_offset(&self, index: u32) -> Result<usize, MemoryError> {
        if self.bp == NO_FRAME {
            return Err(MemoryError::StackUnderflow);
        }
        let at = self.bp as usize + LOCALS_OFFSET + WORD_SIZE * index as usize;
        if at + WORD_SIZE > self.bytes.len() {
            return Err(MemoryError::StackOverflow);
        }
        Ok(at)
    }

    pub fn arg(&self, index: u32) -> Result<HeapPointer, MemoryError> {
        let at = self.arg_offset(index)?;
        Ok(HeapPointer::from_word(read_i32(&self.bytes, at)))
    }

    pub fn set_arg(&mut self, index: u32, value: HeapPointer) -> Result<(), MemoryError> {
        let at = self.arg_offset(index)?;
        write_i32(&mut self.bytes, at, value.as_word());
        Ok(())
    }

    pub fn local(&self, index: u32) -> Result<HeapPointer, MemoryError> {
        let at = self.local_offset(index)?;
        Ok(HeapPointer::from_word(read_i32(&self.bytes, at)))
    }

    pub fn set_local(&mut self, index: u32, value: HeapPointer) -> Result<(), MemoryError> {
        let at = self.local_offset(index)?;
        write_i32(&mut self.bytes, at, value.as_word());
        Ok(())
    }

    /// Offsets of the link and return-address words of every frame on the
    /// base-pointer chain.
    fn frame_control_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::new();
        let mut bp = self.bp;
        // A well-formed chain has at most one frame per two words.
        let mut budget = self.sp / (2 * WORD_SIZE) + 1;
        while bp != NO_FRAME && budget > 0 {
            let base = bp as usize;
            if base + LOCALS_OFFSET > self.sp {
                log::warn!("frame chain points past the stack top at {base}");
                break;
            }
            offsets.push(base + LINK_OFFSET);
            offsets.push(base + RETURN_OFFSET);
            bp = read_u32(&self.bytes, base + LINK_OFFSET);
            budget -= 1;
        }
        offsets
    }

    /// Hand every live stack word that is not frame bookkeeping to
    /// `visitor` as a potential pointer and store back what it leaves.
    pub fn visit_words(&mut self, visitor: &mut dyn FnMut(&mut HeapPointer)) {
        let control = self.frame_control_offsets();
        for at in (0..self.sp).step_by(WORD_SIZE) {
            if control.contains(&at) {
                continue;
            }
            let mut word = HeapPointer::from_word(read_i32(&self.bytes, at));
            let before = word;
            visitor(&mut word);
            if word != before {
                write_i32(&mut self.bytes, at, word.as_word());
            }
        }
    }
}
