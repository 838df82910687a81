//! Header/trailer synthesis, checksum, and the obverse-complement transform.
//!
//! Header and trailer words are never stored on tape in this model — they
//! are regenerated on demand from the block's data words, exactly as
//! `dt_gethdr`/`dt_csum`/`dt_comobv` did in the original simulator.

use crate::geometry::{Format, BLOCK_NUMBER_LINE, CHECKSUM_LINE, HEADER_TRAILER_LINES};
use crate::image::TapeImage;

const MASK18: u32 = 0o777_777;

/// Word offset of the block-number slot within a header/trailer (word 1).
const BLKWD: u32 = BLOCK_NUMBER_LINE / 6;
/// Word offset of the checksum slot within a header/trailer (word 4).
const CSMWD: u32 = CHECKSUM_LINE / 6;
/// Header/trailer length in words (5).
const HTWRD: u32 = HEADER_TRAILER_LINES / 6;

/// Invert all 18 bits, then reverse the order of the six 3-bit groups. This
/// is what a DECtape read head sees when a block recorded in one direction
/// is read in the other. Self-inverse.
#[must_use]
pub fn obverse_complement(value: u32) -> u32 {
    let inverted = (!value) & MASK18;
    ((inverted >> 15) & 0o7)
        | ((inverted >> 9) & 0o70)
        | ((inverted >> 3) & 0o700)
        | ((inverted & 0o700) << 3)
        | ((inverted & 0o70) << 9)
        | ((inverted & 0o7) << 15)
}

/// One's-complement sum of a block's data words, complemented — the forward
/// checksum.
#[must_use]
pub fn block_checksum(image: &TapeImage, format: Format, block: i64) -> u32 {
    let mut csum: u32 = MASK18;
    for word in 0..format.block_words() {
        let w = image.read(format, block, i64::from(word));
        csum += w & MASK18;
        if csum > MASK18 {
            csum = (csum + 1) & MASK18;
        }
    }
    csum ^ MASK18
}

/// Synthesize the header/trailer word at word-offset `word` (0-based, within
/// the combined `2*HTWRD + block_words` word span of header + data + trailer)
/// for `block`. Only meaningful for `word` outside `[HTWRD, HTWRD +
/// block_words)`, i.e. actually in the header or trailer.
#[must_use]
pub fn header_word(image: &TapeImage, format: Format, block: i64, word: u32) -> u32 {
    let last_word = 2 * HTWRD + format.block_words() - 1;
    if word == BLKWD {
        return block.max(0) as u32 & MASK18;
    }
    if word == CSMWD {
        return MASK18; // reverse checksum placeholder
    }
    if word == last_word - CSMWD {
        return block_checksum(image, format, block);
    }
    if word == last_word - BLKWD {
        return obverse_complement(block.max(0) as u32 & MASK18);
    }
    0
}

/// `true` if `word` is the first or last header/trailer slot, which is
/// always silent (no DTF, no BEF) in both READ and WRITE.
#[must_use]
pub fn is_silent_edge_word(format: Format, word: u32) -> bool {
    word == 0 || word == 2 * HTWRD + format.block_words() - 1
}

/// The word offset that carries the "end of block" checksum for the given
/// direction: the forward checksum slot when moving forward, the reverse
/// checksum slot when moving reverse.
#[must_use]
pub fn end_checksum_word(format: Format, reverse: bool) -> u32 {
    if reverse {
        CSMWD
    } else {
        2 * HTWRD + format.block_words() - 1 - CSMWD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obverse_complement_is_self_inverse() {
        for value in [0u32, 1, 0o777_777, 0o123_456, 0o654_321, 0o1, 0o700_000] {
            assert_eq!(obverse_complement(obverse_complement(value)), value & MASK18);
        }
    }

    #[test]
    fn checksum_of_zero_block_is_complement_of_ones() {
        let image = TapeImage::new(Format::Bit18);
        let csum = block_checksum(&image, Format::Bit18, 0);
        // Starting accumulator is all-ones, no data added, then complemented.
        assert_eq!(csum, MASK18 ^ MASK18);
    }

    #[test]
    fn checksum_matches_manual_ones_complement_sum() {
        let mut image = TapeImage::new(Format::Bit18);
        image.write(Format::Bit18, 2, 0, 0o1);
        image.write(Format::Bit18, 2, 1, 0o2);
        let csum = block_checksum(&image, Format::Bit18, 2);

        let mut manual: u32 = MASK18;
        for w in 0..Format::Bit18.block_words() {
            let word = image.read(Format::Bit18, 2, i64::from(w));
            manual += word;
            if manual > MASK18 {
                manual = (manual + 1) & MASK18;
            }
        }
        assert_eq!(csum, manual ^ MASK18);
    }

    #[test]
    fn header_word_block_number_and_reverse_complement() {
        let image = TapeImage::new(Format::Bit18);
        let format = Format::Bit18;
        let last_word = 2 * HTWRD + format.block_words() - 1;
        assert_eq!(header_word(&image, format, 42, BLKWD), 42);
        assert_eq!(
            header_word(&image, format, 42, last_word - BLKWD),
            obverse_complement(42)
        );
        assert_eq!(header_word(&image, format, 42, CSMWD), MASK18);
    }

    #[test]
    fn silent_edge_words() {
        let format = Format::Bit18;
        assert!(is_silent_edge_word(format, 0));
        let last = 2 * HTWRD + format.block_words() - 1;
        assert!(is_silent_edge_word(format, last));
        assert!(!is_silent_edge_word(format, 1));
    }
}
