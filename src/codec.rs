//! `PlainCodec`: the one concrete [`crate::attach::TapeCodec`] this crate
//! ships, transcoding over in-memory byte buffers rather than files — the
//! crate has no opinion about paths or file I/O, only about the bit-packing
//! formulas from the attach/detach contract (grounded in `dt_attach` /
//! `dt_detach`).

use crate::attach::{AttachError, TapeCodec};
use crate::geometry::Format;

const MASK18: u32 = 0o777_777;
const MASK16: u32 = 0xFFFF;
const MASK12: u32 = 0xFFF;

/// In-memory transcoder for the three on-disk tape encodings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl TapeCodec for PlainCodec {
    fn decode(&self, format: Format, data: &[u8]) -> Result<(Vec<u32>, u32), AttachError> {
        let words = match format {
            Format::Bit18 => decode_18b(data),
            Format::Bit16 => decode_16b(data),
            Format::Bit12 => decode_12b(data),
        };
        let hwmark = words.len() as u32;
        if hwmark > format.capacity_words() {
            return Err(AttachError::Capacity);
        }
        let mut buf = vec![0u32; format.capacity_words() as usize];
        buf[..words.len()].copy_from_slice(&words);
        Ok((buf, hwmark))
    }

    fn encode(&self, format: Format, words: &[u32], hwmark: u32) -> Vec<u8> {
        let live = &words[..(hwmark as usize).min(words.len())];
        match format {
            Format::Bit18 => encode_18b(live),
            Format::Bit16 => encode_16b(live),
            Format::Bit12 => encode_12b(live),
        }
    }
}

fn decode_18b(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) & MASK18)
        .collect()
}

fn encode_18b(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 4);
    for &w in words {
        out.extend_from_slice(&(w & MASK18).to_le_bytes());
    }
    out
}

fn decode_16b(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(2)
        .map(|c| u32::from(u16::from_le_bytes([c[0], c[1]])) & MASK16)
        .collect()
}

fn encode_16b(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 2);
    for &w in words {
        out.extend_from_slice(&((w & MASK16) as u16).to_le_bytes());
    }
    out
}

/// Three 12-bit raw cells (each stored as a little-endian `u16`) pack into
/// two 18-bit words: `high = (w0 << 6) | (w1 >> 6)`, `low = ((w1 & 0x3F) <<
/// 12) | w2`. A trailing partial triplet is zero-padded.
fn decode_12b(data: &[u8]) -> Vec<u32> {
    let cells: Vec<u32> = data
        .chunks_exact(2)
        .map(|c| u32::from(u16::from_le_bytes([c[0], c[1]])) & MASK12)
        .collect();

    let mut words = Vec::with_capacity(cells.len() * 2 / 3 + 2);
    for triplet in cells.chunks(3) {
        let w0 = triplet[0];
        let w1 = triplet.get(1).copied().unwrap_or(0);
        let w2 = triplet.get(2).copied().unwrap_or(0);
        let high = ((w0 << 6) | (w1 >> 6)) & MASK18;
        let low = (((w1 & 0x3F) << 12) | w2) & MASK18;
        words.push(high);
        words.push(low);
    }
    words
}

fn encode_12b(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 3);
    for pair in words.chunks(2) {
        let high = pair[0];
        let low = pair.get(1).copied().unwrap_or(0);
        let w0 = (high >> 6) & MASK12;
        let w1 = (((high & 0x3F) << 6) | (low >> 12)) & MASK12;
        let w2 = low & MASK12;
        for w in [w0, w1, w2] {
            out.extend_from_slice(&(w as u16).to_le_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit18_round_trips() {
        let codec = PlainCodec;
        let words = vec![0o123_456u32, 0o777_777, 0];
        let bytes = encode_18b(&words);
        let (decoded, hwmark) = codec.decode(Format::Bit18, &bytes).unwrap();
        assert_eq!(hwmark, 3);
        assert_eq!(&decoded[..3], &words[..]);
    }

    #[test]
    fn bit16_zero_extends() {
        let codec = PlainCodec;
        let bytes = 0xABCDu16.to_le_bytes();
        let (decoded, hwmark) = codec.decode(Format::Bit16, &bytes).unwrap();
        assert_eq!(hwmark, 1);
        assert_eq!(decoded[0], 0xABCD);
    }

    #[test]
    fn bit12_packs_three_cells_into_two_words() {
        let cells = [0o1u16, 0o2, 0o3];
        let mut bytes = Vec::new();
        for c in cells {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
        let words = decode_12b(&bytes);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0], (1u32 << 6) | (2 >> 6));
        assert_eq!(words[1], ((2u32 & 0x3F) << 12) | 3);
    }

    #[test]
    fn bit12_round_trips_through_encode_and_decode() {
        let original: Vec<u16> = vec![0o7777, 0o4000, 0o123, 0o1, 0o2222, 0o17];
        let mut bytes = Vec::new();
        for c in &original {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
        let words = decode_12b(&bytes);
        let back = encode_12b(&words);
        assert_eq!(back, bytes);
    }

    #[test]
    fn decode_rejects_oversize_capacity() {
        let codec = PlainCodec;
        let huge = vec![0u8; (Format::Bit18.capacity_words() as usize + 1) * 4];
        assert_eq!(codec.decode(Format::Bit18, &huge), Err(AttachError::Capacity));
    }
}
