//! Error types reported by the decoder and the instance registry.

use std::error;
use std::fmt;
use std::io;

use crate::chunk::ChunkType;

/// A defect in the input stream itself.
///
/// Every variant indicates malformed or unsupported input. None of them are
/// transient: feeding the same bytes again deterministically reproduces the
/// same error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The stream does not begin with the eight byte PNG signature.
    BadSignature,
    /// The stored chunk checksum disagrees with the one computed over
    /// the chunk type and payload.
    CrcMismatch {
        /// Stored CRC32 value
        crc_val: u32,
        /// Calculated CRC32 sum
        crc_sum: u32,
        chunk: ChunkType,
    },
    /// The stream ended before the declared data did.
    Truncated,
    /// A chunk declared a length beyond the format ceiling.
    ChunkTooLarge(u32),
    /// Zero or out-of-range canvas dimensions in the header.
    InvalidDimensions { width: u32, height: u32 },
    /// The color type / bit depth combination is not decodable here.
    UnsupportedColorMode { color_type: u8, bit_depth: u8 },
    /// Adam7 interlaced streams are not decoded.
    UnsupportedInterlace,
    /// Unknown compression method byte in the header.
    UnknownCompressionMethod(u8),
    /// Unknown filter method byte in the header.
    UnknownFilterMethod(u8),
    /// A chunk other than the header came first.
    ChunkBeforeIhdr(ChunkType),
    /// More than one header chunk.
    DuplicateIhdr,
    /// An unrecognized chunk whose type marks it as critical.
    UnknownCritical(ChunkType),
    /// No animation control chunk: a plain, single-image PNG.
    NotAnimated,
    /// The animation control chunk declared zero frames.
    ZeroFrameCount,
    /// The animation control chunk appeared after image data began.
    ActlAfterIdat,
    /// More than one animation control chunk.
    DuplicateActl,
    /// A frame control or frame data sequence number broke the shared
    /// monotonic ordering.
    OutOfOrderFrame { expected: u32, actual: u32 },
    /// A frame rectangle is empty or exceeds the canvas bounds.
    FrameOutOfBounds {
        x_offset: u32,
        y_offset: u32,
        width: u32,
        height: u32,
    },
    /// Unknown dispose operation byte in a frame control chunk.
    InvalidDisposeOp(u8),
    /// Unknown blend operation byte in a frame control chunk.
    InvalidBlendOp(u8),
    /// An image data chunk with no frame control governing it.
    OrphanFrameData,
    /// A frame control chunk was never followed by data for its frame.
    MissingFrameData(u32),
    /// The number of frame control records differs from the declared count.
    FrameCountMismatch { declared: u32, actual: u32 },
    /// The stream carried no header chunk at all.
    MissingIhdr,
    /// The compressed pixel data is not a valid deflate stream.
    InflateError,
    /// A scanline began with an out-of-range filter type byte.
    InvalidFilterType(u8),
    /// The inflated pixel data does not match the frame geometry.
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for FormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use self::FormatError::*;
        match self {
            BadSignature => write!(fmt, "invalid PNG signature"),
            CrcMismatch {
                crc_val,
                crc_sum,
                chunk,
            } => write!(
                fmt,
                "CRC error: expected 0x{:08x} have 0x{:08x} while decoding {} chunk",
                crc_val, crc_sum, chunk
            ),
            Truncated => write!(fmt, "unexpected end of data before image end"),
            ChunkTooLarge(length) => write!(fmt, "chunk length {} exceeds the format limit", length),
            InvalidDimensions { width, height } => {
                write!(fmt, "invalid canvas dimensions ({}x{})", width, height)
            }
            UnsupportedColorMode {
                color_type,
                bit_depth,
            } => write!(
                fmt,
                "unsupported color mode (color type {}, bit depth {})",
                color_type, bit_depth
            ),
            UnsupportedInterlace => write!(fmt, "interlaced images are not supported"),
            UnknownCompressionMethod(n) => write!(fmt, "unknown compression method ({})", n),
            UnknownFilterMethod(n) => write!(fmt, "unknown filter method ({})", n),
            ChunkBeforeIhdr(chunk) => write!(fmt, "{} chunk appeared before IHDR chunk", chunk),
            DuplicateIhdr => write!(fmt, "duplicate IHDR chunk"),
            UnknownCritical(chunk) => write!(fmt, "unknown critical chunk {}", chunk),
            NotAnimated => write!(fmt, "missing acTL chunk: not an animated image"),
            ZeroFrameCount => write!(fmt, "acTL chunk declares zero frames"),
            ActlAfterIdat => write!(fmt, "acTL chunk appeared after first IDAT chunk"),
            DuplicateActl => write!(fmt, "duplicate acTL chunk"),
            OutOfOrderFrame { expected, actual } => write!(
                fmt,
                "sequence is not in order, expected #{} got #{}",
                expected, actual
            ),
            FrameOutOfBounds {
                x_offset,
                y_offset,
                width,
                height,
            } => write!(
                fmt,
                "frame rectangle {}x{}+{}+{} is out of bounds",
                width, height, x_offset, y_offset
            ),
            InvalidDisposeOp(n) => write!(fmt, "invalid dispose operation ({})", n),
            InvalidBlendOp(n) => write!(fmt, "invalid blend operation ({})", n),
            OrphanFrameData => write!(fmt, "image data without a governing fcTL chunk"),
            MissingFrameData(index) => write!(fmt, "no image data for frame #{}", index),
            FrameCountMismatch { declared, actual } => write!(
                fmt,
                "acTL declared {} frames but {} fcTL chunks were found",
                declared, actual
            ),
            MissingIhdr => write!(fmt, "IHDR chunk missing"),
            InflateError => write!(fmt, "compressed data stream corrupted"),
            InvalidFilterType(n) => write!(fmt, "invalid filter type byte ({})", n),
            SizeMismatch { expected, actual } => write!(
                fmt,
                "wrong amount of frame pixel data, expected {} bytes got {}",
                expected, actual
            ),
        }
    }
}

impl error::Error for FormatError {}

/// Any error returned by this crate.
///
/// [`Error::Format`] wraps defects of the input stream; the remaining
/// variants indicate misuse by the caller or an exhausted allocation
/// budget.
#[derive(Debug)]
pub enum Error {
    /// The input stream is malformed or unsupported.
    Format(FormatError),
    /// Reading the byte source failed.
    Io(io::Error),
    /// The handle was never issued or its instance was already destroyed.
    InvalidHandle,
    /// The requested frame index is not within `0..frame_count`.
    InvalidFrameIndex { index: u32, frame_count: u32 },
    /// The destination buffer does not match the canvas size.
    BufferSize { expected: usize, actual: usize },
    /// Decoding would allocate more memory than the configured limit.
    LimitsExceeded,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use self::Error::*;
        match self {
            Format(err) => write!(fmt, "{}", err),
            Io(err) => write!(fmt, "{}", err),
            InvalidHandle => write!(fmt, "no live decoder instance for this handle"),
            InvalidFrameIndex { index, frame_count } => write!(
                fmt,
                "frame index {} out of range for {} frames",
                index, frame_count
            ),
            BufferSize { expected, actual } => write!(
                fmt,
                "destination buffer holds {} bytes but the canvas needs {}",
                actual, expected
            ),
            LimitsExceeded => write!(fmt, "memory limits are exceeded"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Format(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Error {
        Error::Format(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
