//! The Attach/Detach Adapter contract (§6): the collaborator interface the
//! motion core depends on to bring a tape image in and out of the Tape
//! Image Store. The core only ever sees already-decoded 18-bit words; it
//! never touches a file or a path.

use std::fmt;

use crate::geometry::Format;

/// Failure constructing an in-memory tape image from encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    /// The decoded word count exceeds the format's capacity, mirroring the
    /// original simulator's `SCPE_MEM` allocation failure path.
    Capacity,
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity => write!(f, "decoded tape image exceeds format capacity"),
        }
    }
}

impl std::error::Error for AttachError {}

/// The concrete shape of the Attach/Detach collaborator: transcodes between
/// a format's on-disk byte encoding and the in-memory 18-bit word buffer the
/// motion core operates on.
pub trait TapeCodec {
    /// Decode `data` into 18-bit words plus the high-water mark (the index
    /// one past the last word actually present in `data`). Must not exceed
    /// `format.capacity_words()`.
    fn decode(&self, format: Format, data: &[u8]) -> Result<(Vec<u32>, u32), AttachError>;

    /// Re-encode `words[..hwmark]` back into `format`'s on-disk byte layout.
    fn encode(&self, format: Format, words: &[u32], hwmark: u32) -> Vec<u8>;
}
