//! Low-level chunk walking.

use crc32fast::Hasher as Crc32;

use crate::chunk::ChunkType;
use crate::error::{Error, FormatError};

/// The eight byte signature that opens every PNG-family stream.
pub(crate) const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Chunk lengths use 31 bits; anything above is a hostile length claim and
/// is rejected before any payload is touched.
const CHUNK_LENGTH_CEILING: u32 = (1 << 31) - 1;

/// One chunk as it sits in the source buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawChunk<'a> {
    pub type_: ChunkType,
    pub data: &'a [u8],
    /// The CRC stored in the stream, regardless of whether it was verified.
    pub crc: u32,
    /// Offset of `data` within the source buffer.
    pub data_start: usize,
}

/// A lazy, forward-only walk over the chunks of a byte buffer.
///
/// The signature is verified on construction; each `next_chunk` call
/// yields one length-prefixed, CRC-checked record, or `None` once the
/// buffer is cleanly exhausted. Interpretation of chunk contents is left
/// to the caller.
pub(crate) struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    ignore_crc: bool,
}

impl<'a> ChunkReader<'a> {
    pub(crate) fn new(data: &'a [u8], ignore_crc: bool) -> Result<Self, Error> {
        if data.len() < SIGNATURE.len() || data[..SIGNATURE.len()] != SIGNATURE {
            return Err(FormatError::BadSignature.into());
        }
        Ok(ChunkReader {
            data,
            pos: SIGNATURE.len(),
            ignore_crc,
        })
    }

    pub(crate) fn next_chunk(&mut self) -> Result<Option<RawChunk<'a>>, Error> {
        if self.pos == self.data.len() {
            return Ok(None);
        }
        let remaining = &self.data[self.pos..];
        if remaining.len() < 8 {
            return Err(FormatError::Truncated.into());
        }
        let length = u32::from_be_bytes([remaining[0], remaining[1], remaining[2], remaining[3]]);
        if length > CHUNK_LENGTH_CEILING {
            return Err(FormatError::ChunkTooLarge(length).into());
        }
        let type_ = ChunkType([remaining[4], remaining[5], remaining[6], remaining[7]]);

        let data_len = length as usize;
        if remaining.len() < 8 + data_len + 4 {
            return Err(FormatError::Truncated.into());
        }
        let data = &remaining[8..8 + data_len];
        let crc_bytes = &remaining[8 + data_len..8 + data_len + 4];
        let crc_val = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        if !self.ignore_crc {
            let mut hasher = Crc32::new();
            hasher.update(&type_.0);
            hasher.update(data);
            let crc_sum = hasher.finalize();
            if crc_sum != crc_val {
                return Err(FormatError::CrcMismatch {
                    crc_val,
                    crc_sum,
                    chunk: type_,
                }
                .into());
            }
        }

        let data_start = self.pos + 8;
        self.pos += 8 + data_len + 4;
        Ok(Some(RawChunk {
            type_,
            data,
            crc: crc_val,
            data_start,
        }))
    }
}
