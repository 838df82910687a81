//! Tape Image Store: the in-memory 18-bit word buffer backing one attached
//! unit, addressed by block and word-in-block.

use crate::geometry::Format;

/// An attached tape's in-memory word buffer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub struct TapeImage {
    words: Vec<u32>,
    /// Highest written index + 1.
    hwmark: u32,
}

impl TapeImage {
    /// Allocate a zeroed buffer sized to `format`'s capacity.
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            words: vec![0; format.capacity_words() as usize],
            hwmark: 0,
        }
    }

    /// Wrap an externally-supplied buffer (e.g. from a codec load), with an
    /// explicit high-water mark.
    #[must_use]
    pub fn from_words(words: Vec<u32>, hwmark: u32) -> Self {
        Self { words, hwmark }
    }

    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    #[must_use]
    pub fn hwmark(&self) -> u32 {
        self.hwmark
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.words.len() as u32
    }

    /// Read the data word at `block * block_words + word_in_block`.
    #[must_use]
    pub fn read(&self, format: Format, block: i64, word_in_block: i64) -> u32 {
        let addr = Self::address(format, block, word_in_block);
        self.words.get(addr as usize).copied().unwrap_or(0)
    }

    /// Write the data word at `block * block_words + word_in_block`, raising
    /// `hwmark` if this address is new highest.
    pub fn write(&mut self, format: Format, block: i64, word_in_block: i64, value: u32) {
        let addr = Self::address(format, block, word_in_block);
        if let Some(slot) = self.words.get_mut(addr as usize) {
            *slot = value;
            if addr + 1 > self.hwmark {
                self.hwmark = addr + 1;
            }
        }
    }

    fn address(format: Format, block: i64, word_in_block: i64) -> u32 {
        (block * i64::from(format.block_words()) + word_in_block).max(0) as u32
    }
}
