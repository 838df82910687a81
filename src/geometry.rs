//! Tape geometry: the fixed constants and per-format dimensions that the
//! Position Model uses to translate a line position into block/word
//! coordinates and back.
//!
//! # Line layout
//!
//! ```text
//! reverse end zone (36000 lines)  block 0 .. block n  forward end zone (36000 lines)
//! ```
//!
//! Each block is `2 * HEADER_TRAILER_LINES` header/trailer lines plus
//! `block_words * word_size` data lines. 16b tapes share the 18b geometry
//! (only the on-disk encoding differs; both are transcoded to 18-bit words
//! before the motion core ever sees them).

/// End zone length in lines, each end of the tape.
pub const END_ZONE_LINES: u32 = 36_000;
/// Header and trailer length in lines, each end of a block.
pub const HEADER_TRAILER_LINES: u32 = 30;
/// Line offset of the block-number word within a header/trailer.
pub const BLOCK_NUMBER_LINE: u32 = 6;
/// Line offset of the checksum word within a header/trailer.
pub const CHECKSUM_LINE: u32 = 24;

/// On-disk tape encoding. 16b and 18b share the same in-memory geometry;
/// only attach/detach transcoding differs between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    /// 18-bit words, 256 per block, 578 blocks.
    Bit18,
    /// 16-bit words zero-extended to 18 bits; same in-memory geometry as 18b.
    Bit16,
    /// 12-bit words packed three-per-two 18-bit words, 86 words per block, 1474 blocks.
    Bit12,
}

impl Format {
    /// Lines occupied by one data word in this format.
    #[must_use]
    pub const fn word_size(self) -> u32 {
        match self {
            Self::Bit18 | Self::Bit16 => 6,
            Self::Bit12 => 4,
        }
    }

    /// Data words per block.
    #[must_use]
    pub const fn block_words(self) -> u32 {
        match self {
            Self::Bit18 | Self::Bit16 => 256,
            Self::Bit12 => 86,
        }
    }

    /// Blocks per tape.
    #[must_use]
    pub const fn tape_blocks(self) -> u32 {
        match self {
            Self::Bit18 | Self::Bit16 => 578,
            Self::Bit12 => 1474,
        }
    }

    /// Total lines occupied by one block including header and trailer.
    #[must_use]
    pub const fn lines_per_block(self) -> u32 {
        2 * HEADER_TRAILER_LINES + self.block_words() * self.word_size()
    }

    /// Line position of the start of the forward end zone.
    #[must_use]
    pub const fn forward_end_zone(self) -> u32 {
        END_ZONE_LINES + self.lines_per_block() * self.tape_blocks()
    }

    /// Capacity of the in-memory word buffer: blocks * words-per-block.
    #[must_use]
    pub const fn capacity_words(self) -> u32 {
        self.tape_blocks() * self.block_words()
    }

    /// Highest valid line position: the far edge of the forward end zone.
    #[must_use]
    pub const fn max_pos(self) -> u32 {
        self.forward_end_zone() + END_ZONE_LINES
    }
}

/// Coordinates of a line position relative to the data region (block numbering
/// starts after the reverse end zone).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coords {
    /// Block index (clamped to the nearest valid block if outside the data region).
    pub block: i64,
    /// Offset in lines from the start of the block (may exceed the block's own
    /// length if `pos` is within an end zone).
    pub offset_in_block: i64,
}

/// True if `pos` is within the reverse end zone (before any data block).
#[must_use]
pub fn in_reverse_end_zone(pos: u32) -> bool {
    pos < END_ZONE_LINES
}

/// True if `pos` is within or past the forward end zone.
#[must_use]
pub fn in_forward_end_zone(pos: u32, format: Format) -> bool {
    pos >= format.forward_end_zone()
}

/// True if `pos` is in either end zone.
#[must_use]
pub fn in_end_zone(pos: u32, format: Format) -> bool {
    in_reverse_end_zone(pos) || in_forward_end_zone(pos, format)
}

/// Decompose a line position into block and offset-within-block coordinates.
/// Only meaningful once `pos` is past the reverse end zone.
#[must_use]
pub fn line_to_coords(pos: u32, format: Format) -> Coords {
    let rel = i64::from(pos) - i64::from(END_ZONE_LINES);
    let lpb = i64::from(format.lines_per_block());
    Coords {
        block: rel.div_euclid(lpb),
        offset_in_block: rel.rem_euclid(lpb),
    }
}

/// Current block number at `pos` (only valid outside the end zones).
#[must_use]
pub fn line_to_block(pos: u32, format: Format) -> i64 {
    line_to_coords(pos, format).block
}

/// Data word index within its block for a position inside the data zone.
/// Caller must ensure `pos` is in the data zone (not header/trailer).
#[must_use]
pub fn line_to_word(pos: u32, format: Format) -> i64 {
    let c = line_to_coords(pos, format);
    (c.offset_in_block - i64::from(HEADER_TRAILER_LINES)) / i64::from(format.word_size())
}

/// First line of the given block number (the start of its header).
#[must_use]
pub fn block_to_line(block: i64, format: Format) -> i64 {
    block * i64::from(format.lines_per_block()) + i64::from(END_ZONE_LINES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit18_geometry_matches_original_constants() {
        assert_eq!(Format::Bit18.word_size(), 6);
        assert_eq!(Format::Bit18.block_words(), 256);
        assert_eq!(Format::Bit18.tape_blocks(), 578);
        assert_eq!(Format::Bit18.lines_per_block(), 30 + 256 * 6 + 30);
    }

    #[test]
    fn bit12_geometry_matches_original_constants() {
        assert_eq!(Format::Bit12.word_size(), 4);
        assert_eq!(Format::Bit12.block_words(), 86);
        assert_eq!(Format::Bit12.tape_blocks(), 1474);
    }

    #[test]
    fn block_and_line_round_trip() {
        let format = Format::Bit18;
        for blk in [0i64, 1, 5, 100, 577] {
            let line = block_to_line(blk, format) as u32;
            assert_eq!(line_to_block(line, format), blk);
        }
    }

    #[test]
    fn end_zone_detection() {
        let format = Format::Bit18;
        assert!(in_reverse_end_zone(0));
        assert!(!in_reverse_end_zone(END_ZONE_LINES));
        assert!(in_forward_end_zone(format.forward_end_zone(), format));
        assert!(!in_forward_end_zone(format.forward_end_zone() - 1, format));
    }

    #[test]
    fn word_index_at_block_start() {
        let format = Format::Bit18;
        let line = block_to_line(3, format) as u32 + HEADER_TRAILER_LINES;
        assert_eq!(line_to_word(line, format), 0);
    }
}
