//! Ergonomics wrapper around `miniz_oxide` for zlib compressed frame data.

use miniz_oxide::inflate::core::{decompress, inflate_flags, DecompressorOxide};
use miniz_oxide::inflate::TINFLStatus;

use crate::error::FormatError;

/// Incremental zlib inflation of one frame's compressed byte ranges.
///
/// A frame's data may be split over several chunks; each range is fed with
/// [`decompress`](ZlibStream::decompress) and the stream is flushed with
/// [`finish`](ZlibStream::finish). The output buffer is sized by the caller
/// to the exact raw frame length, so any attempt to write past it is a
/// format defect, not a reallocation.
pub(crate) struct ZlibStream {
    /// Current decoding state.
    state: Box<DecompressorOxide>,
    /// The write position in the output buffer.
    out_pos: usize,
    /// Whether the zlib stream has signalled its end.
    done: bool,
}

impl ZlibStream {
    pub(crate) fn new() -> Self {
        ZlibStream {
            state: Box::default(),
            out_pos: 0,
            done: false,
        }
    }

    /// Feed one compressed range, filling `out` from the current position.
    pub(crate) fn decompress(&mut self, data: &[u8], out: &mut [u8]) -> Result<(), FormatError> {
        const FLAGS: u32 = inflate_flags::TINFL_FLAG_PARSE_ZLIB_HEADER
            | inflate_flags::TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF
            | inflate_flags::TINFL_FLAG_HAS_MORE_INPUT;

        let mut in_pos = 0;
        while in_pos < data.len() && !self.done {
            let (status, in_consumed, out_consumed) =
                decompress(&mut self.state, &data[in_pos..], out, self.out_pos, FLAGS);
            in_pos += in_consumed;
            self.out_pos += out_consumed;
            match status {
                TINFLStatus::Done => self.done = true,
                TINFLStatus::NeedsMoreInput => {}
                TINFLStatus::HasMoreOutput => {
                    return Err(FormatError::SizeMismatch {
                        expected: out.len(),
                        actual: self.out_pos + 1,
                    })
                }
                _ => return Err(FormatError::InflateError),
            }
        }
        Ok(())
    }

    /// Flush any output the decompressor kept back and return the total
    /// number of bytes written.
    pub(crate) fn finish(&mut self, out: &mut [u8]) -> Result<usize, FormatError> {
        const FLAGS: u32 = inflate_flags::TINFL_FLAG_PARSE_ZLIB_HEADER
            | inflate_flags::TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF;

        while !self.done {
            let (status, _, out_consumed) =
                decompress(&mut self.state, &[], out, self.out_pos, FLAGS);
            self.out_pos += out_consumed;
            match status {
                TINFLStatus::Done => self.done = true,
                TINFLStatus::HasMoreOutput => {
                    return Err(FormatError::SizeMismatch {
                        expected: out.len(),
                        actual: self.out_pos + 1,
                    })
                }
                _ => return Err(FormatError::InflateError),
            }
        }
        Ok(self.out_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniz_oxide::deflate::compress_to_vec_zlib;

    #[test]
    fn inflates_split_input() {
        let raw: Vec<u8> = (0..200u8).cycle().take(1024).collect();
        let compressed = compress_to_vec_zlib(&raw, 6);
        let (head, tail) = compressed.split_at(compressed.len() / 2);

        let mut out = vec![0; raw.len()];
        let mut stream = ZlibStream::new();
        stream.decompress(head, &mut out).unwrap();
        stream.decompress(tail, &mut out).unwrap();
        assert_eq!(stream.finish(&mut out).unwrap(), raw.len());
        assert_eq!(out, raw);
    }

    #[test]
    fn rejects_excess_output() {
        let raw = vec![42u8; 64];
        let compressed = compress_to_vec_zlib(&raw, 6);
        let mut out = vec![0; 32];
        let mut stream = ZlibStream::new();
        let result = stream
            .decompress(&compressed, &mut out)
            .and_then(|_| stream.finish(&mut out).map(|_| ()));
        assert!(matches!(result, Err(FormatError::SizeMismatch { .. })));
    }

    #[test]
    fn rejects_garbage() {
        let mut out = vec![0; 16];
        let mut stream = ZlibStream::new();
        let result = stream.decompress(&[0x12, 0x34, 0x56, 0x78], &mut out);
        assert!(matches!(result, Err(FormatError::InflateError)));
    }
}
