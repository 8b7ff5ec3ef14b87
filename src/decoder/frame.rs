//! Per-frame pixel reconstruction: inflate, then defilter.

use crate::common::Info;
use crate::decoder::zlib::ZlibStream;
use crate::decoder::RawFrame;
use crate::error::{Error, FormatError};
use crate::filter::{unfilter, FilterType};

/// Decodes one frame's compressed byte ranges into a raw pixel rectangle
/// of `width * height * bytes_per_pixel` bytes, row-major, top to bottom.
pub(crate) fn decode_frame(
    source: &[u8],
    frame: &RawFrame,
    info: &Info,
) -> Result<Vec<u8>, Error> {
    let width = frame.control.width as usize;
    let height = frame.control.height as usize;
    let bpp = info.bytes_per_pixel();
    let row_len = width * bpp;
    // Every raw scanline is prefixed by its filter type byte.
    let raw_len = (row_len + 1) * height;

    let mut raw = vec![0u8; raw_len];
    let mut inflater = ZlibStream::new();
    for range in &frame.data {
        inflater.decompress(&source[range.clone()], &mut raw)?;
    }
    let written = inflater.finish(&mut raw)?;
    if written != raw_len {
        return Err(FormatError::SizeMismatch {
            expected: raw_len,
            actual: written,
        }
        .into());
    }

    let mut pixels = vec![0u8; row_len * height];
    for y in 0..height {
        let row = &raw[y * (row_len + 1)..(y + 1) * (row_len + 1)];
        let filter = FilterType::from_u8(row[0])?;
        let (done, rest) = pixels.split_at_mut(y * row_len);
        let previous = if y == 0 {
            &[][..]
        } else {
            &done[(y - 1) * row_len..]
        };
        let current = &mut rest[..row_len];
        current.copy_from_slice(&row[1..]);
        unfilter(filter, bpp, previous, current);
    }

    Ok(pixels)
}
