//! Scan buffer: an append-only byte accumulator for partial tokens.
//!
//! The parser can be handed a token in arbitrary slices, with boundaries
//! falling anywhere inside it. Bytes that belong to the token in progress are
//! staged here between `feed` calls, so the parser state proper only needs a
//! few scalar fields per continuation state.

use crate::error::{PlistError, Result};

/// Minimum growth step when the buffer must reallocate.
const GROW_STEP: usize = 32;

/// Growable byte accumulator for the token currently being scanned.
///
/// Growth is fallible: a failed reallocation surfaces as
/// [`PlistError::OutOfMemory`] instead of aborting the process.
#[derive(Debug, Default)]
pub struct ScanBuf {
    buf: Vec<u8>,
}

impl ScanBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the accumulated bytes, keeping the allocation for reuse.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Make room for at least `more` additional bytes.
    pub fn reserve(&mut self, more: usize) -> Result<()> {
        let spare = self.buf.capacity() - self.buf.len();
        if spare < more {
            self.buf
                .try_reserve(more.max(GROW_STEP))
                .map_err(|_| PlistError::OutOfMemory)?;
        }
        Ok(())
    }

    /// Append a single byte.
    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.reserve(1)?;
        self.buf.push(byte);
        Ok(())
    }

    /// The accumulated bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The most recently appended byte, if any.
    pub fn last(&self) -> Option<u8> {
        self.buf.last().copied()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
