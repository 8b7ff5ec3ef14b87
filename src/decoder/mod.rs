//! Parsing of the container structure into static metadata and a frame table.

mod frame;
mod stream;
#[cfg(test)]
pub(crate) mod test_support;
mod zlib;

pub(crate) use self::frame::decode_frame;
pub(crate) use self::stream::{ChunkReader, RawChunk};

use std::ops::Range;

use crate::chunk;
use crate::common::{
    AnimationControl, BitDepth, BlendOp, ColorType, Delay, DisposeOp, FrameControl, Info, Limits,
};
use crate::error::{Error, FormatError};
use crate::traits::ReadBytesExt;

/// Configuration of a [`Decoder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeOptions {
    /// Skip chunk CRC verification. Default is strict checking.
    pub ignore_crc: bool,
    /// Allocation budget for the canvas and frame buffers.
    pub limits: Limits,
}

/// Parses a complete in-memory stream into an [`Animation`].
///
/// The parser walks the chunk sequence exactly once. Frame pixel data is
/// not inflated here; only its byte ranges within the source are recorded,
/// so rendering can stream one frame at a time.
pub struct Decoder<'a> {
    data: &'a [u8],
    options: DecodeOptions,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder over a complete stream with default options.
    pub fn new(data: &'a [u8]) -> Decoder<'a> {
        Decoder::with_options(data, DecodeOptions::default())
    }

    /// Creates a new decoder over a complete stream.
    pub fn with_options(data: &'a [u8], options: DecodeOptions) -> Decoder<'a> {
        Decoder { data, options }
    }

    /// Reads all metadata and the frame table.
    ///
    /// Either every declared frame was located and validated, or an error
    /// is returned and nothing of the stream is usable.
    pub fn read_animation(&self) -> Result<Animation, Error> {
        Parser::new(self.data, &self.options)?.run()
    }
}

/// Whether the stream is an animated image.
///
/// Walks the chunk sequence only far enough to find the animation control
/// chunk, without touching any pixel data. A well-formed single-image
/// stream yields `Ok(false)`; structural defects found before the
/// determination are errors.
pub fn is_apng(data: &[u8]) -> Result<bool, Error> {
    let mut reader = ChunkReader::new(data, false)?;
    let mut first = true;
    while let Some(chunk) = reader.next_chunk()? {
        if first {
            if chunk.type_ != chunk::IHDR {
                return Err(FormatError::ChunkBeforeIhdr(chunk.type_).into());
            }
            first = false;
            continue;
        }
        match chunk.type_ {
            // acTL is required to precede the first IDAT, so whichever
            // of the two comes first decides.
            chunk::acTL => return Ok(true),
            chunk::IDAT | chunk::IEND => return Ok(false),
            _ => {}
        }
    }
    Err(FormatError::Truncated.into())
}

/// One frame of the animation: its control record plus the byte ranges of
/// its compressed pixel data within the source stream.
#[derive(Clone, Debug)]
pub(crate) struct RawFrame {
    pub(crate) control: FrameControl,
    pub(crate) data: Vec<Range<usize>>,
}

/// A fully parsed animation: immutable metadata and the ordered frame table.
#[derive(Clone, Debug)]
pub struct Animation {
    info: Info,
    frames: Vec<RawFrame>,
}

impl Animation {
    /// The static image metadata.
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// The number of animation frames. Always at least one.
    pub fn frame_count(&self) -> u32 {
        self.frames.len() as u32
    }

    /// How often the animation loops. `0` indicates infinite looping.
    pub fn loop_count(&self) -> u32 {
        self.info.animation_control.num_plays
    }

    /// The control record of one frame.
    pub fn frame_control(&self, index: u32) -> Option<&FrameControl> {
        self.frames.get(index as usize).map(|f| &f.control)
    }

    /// Per-frame display durations, in frame order.
    pub fn frame_durations(&self) -> Vec<Delay> {
        self.frames.iter().map(|f| f.control.delay()).collect()
    }

    /// The duration of one loop of the animation in whole milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.frames
            .iter()
            .map(|f| u64::from(f.control.delay().as_millis()))
            .sum()
    }

    /// An estimate of the raw pixel memory decoded over the instance's
    /// lifetime: the sum of each frame rectangle's byte footprint.
    pub fn all_frame_byte_count(&self) -> u64 {
        self.frames
            .iter()
            .map(|f| self.info.frame_byte_len(&f.control))
            .sum()
    }

    pub(crate) fn frames(&self) -> &[RawFrame] {
        &self.frames
    }
}

struct Ihdr {
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    color_type: ColorType,
}

struct Parser<'a> {
    reader: ChunkReader<'a>,
    limits: Limits,
    ihdr: Option<Ihdr>,
    actl: Option<AnimationControl>,
    /// Last sequence number seen on an fcTL or fdAT chunk.
    seq: Option<u32>,
    frames: Vec<RawFrame>,
    /// The frame whose control chunk has been read but whose data chunks
    /// are still being collected.
    current: Option<RawFrame>,
    have_idat: bool,
    have_fdat: bool,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8], options: &DecodeOptions) -> Result<Parser<'a>, Error> {
        Ok(Parser {
            reader: ChunkReader::new(data, options.ignore_crc)?,
            limits: options.limits,
            ihdr: None,
            actl: None,
            seq: None,
            frames: Vec::new(),
            current: None,
            have_idat: false,
            have_fdat: false,
        })
    }

    fn run(mut self) -> Result<Animation, Error> {
        loop {
            let chunk = match self.reader.next_chunk()? {
                Some(chunk) => chunk,
                // The end marker terminates parsing; running out of bytes
                // before it means the stream was cut short.
                None if self.ihdr.is_none() => return Err(FormatError::MissingIhdr.into()),
                None => return Err(FormatError::Truncated.into()),
            };
            if self.ihdr.is_none() && chunk.type_ != chunk::IHDR {
                return Err(FormatError::ChunkBeforeIhdr(chunk.type_).into());
            }
            match chunk.type_ {
                chunk::IHDR => self.parse_ihdr(chunk.data)?,
                chunk::acTL => self.parse_actl(chunk.data)?,
                chunk::fcTL => self.parse_fctl(chunk.data)?,
                chunk::IDAT => self.handle_idat(&chunk)?,
                chunk::fdAT => self.handle_fdat(&chunk)?,
                chunk::IEND => break,
                type_ if chunk::is_critical(type_) => {
                    return Err(FormatError::UnknownCritical(type_).into())
                }
                _ => {}
            }
        }
        self.finish()
    }

    fn parse_ihdr(&mut self, mut buf: &[u8]) -> Result<(), Error> {
        if self.ihdr.is_some() {
            return Err(FormatError::DuplicateIhdr.into());
        }
        let width = buf.read_be()?;
        let height = buf.read_be()?;
        // Dimensions are 31 bit values and must be nonzero.
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(FormatError::InvalidDimensions { width, height }.into());
        }
        let bit_depth: u8 = buf.read_be()?;
        let color_type: u8 = buf.read_be()?;
        let unsupported = FormatError::UnsupportedColorMode {
            color_type,
            bit_depth,
        };
        let bit_depth = BitDepth::from_u8(bit_depth).ok_or(unsupported.clone())?;
        let color_type = ColorType::from_u8(color_type).ok_or(unsupported.clone())?;
        // Compositing works on 8 bit samples; palette lookups are not done.
        if bit_depth != BitDepth::Eight || color_type == ColorType::Indexed {
            return Err(unsupported.into());
        }
        match buf.read_be()? {
            0u8 => (),
            n => return Err(FormatError::UnknownCompressionMethod(n).into()),
        }
        match buf.read_be()? {
            0u8 => (),
            n => return Err(FormatError::UnknownFilterMethod(n).into()),
        }
        match buf.read_be()? {
            0u8 => (),
            _ => return Err(FormatError::UnsupportedInterlace.into()),
        }
        self.ihdr = Some(Ihdr {
            width,
            height,
            bit_depth,
            color_type,
        });
        Ok(())
    }

    fn parse_actl(&mut self, mut buf: &[u8]) -> Result<(), Error> {
        if self.have_idat {
            return Err(FormatError::ActlAfterIdat.into());
        }
        if self.actl.is_some() {
            return Err(FormatError::DuplicateActl.into());
        }
        let actl = AnimationControl {
            num_frames: buf.read_be()?,
            num_plays: buf.read_be()?,
        };
        if actl.num_frames == 0 {
            return Err(FormatError::ZeroFrameCount.into());
        }
        self.actl = Some(actl);
        Ok(())
    }

    fn parse_fctl(&mut self, mut buf: &[u8]) -> Result<(), Error> {
        let sequence_number = self.next_sequence(buf.read_be()?)?;
        let mut fc = FrameControl {
            sequence_number,
            width: buf.read_be()?,
            height: buf.read_be()?,
            x_offset: buf.read_be()?,
            y_offset: buf.read_be()?,
            delay_num: buf.read_be()?,
            delay_den: buf.read_be()?,
            dispose_op: {
                let n = buf.read_be()?;
                match DisposeOp::from_u8(n) {
                    Some(dispose_op) => dispose_op,
                    None => return Err(FormatError::InvalidDisposeOp(n).into()),
                }
            },
            blend_op: {
                let n = buf.read_be()?;
                match BlendOp::from_u8(n) {
                    Some(blend_op) => blend_op,
                    None => return Err(FormatError::InvalidBlendOp(n).into()),
                }
            },
        };
        let ihdr = self.ihdr.as_ref().ok_or(FormatError::MissingIhdr)?;
        fc.check_bounds(ihdr.width, ihdr.height)?;

        self.take_finished_frame()?;
        // The first frame has no prior canvas state to restore.
        if self.frames.is_empty() && fc.dispose_op == DisposeOp::Previous {
            fc.dispose_op = DisposeOp::None;
        }
        self.current = Some(RawFrame {
            control: fc,
            data: Vec::new(),
        });
        Ok(())
    }

    fn handle_idat(&mut self, chunk: &RawChunk) -> Result<(), Error> {
        self.have_idat = true;
        if self.have_fdat {
            return Err(FormatError::OrphanFrameData.into());
        }
        match &mut self.current {
            // An fcTL preceding the default image data makes it frame 0.
            Some(frame) if self.frames.is_empty() => {
                frame
                    .data
                    .push(chunk.data_start..chunk.data_start + chunk.data.len());
            }
            Some(_) => return Err(FormatError::OrphanFrameData.into()),
            // A default image without an fcTL is not part of the animation.
            None => {}
        }
        Ok(())
    }

    fn handle_fdat(&mut self, chunk: &RawChunk) -> Result<(), Error> {
        self.have_fdat = true;
        let mut buf = chunk.data;
        let sequence_number: u32 = buf.read_be()?;
        // fdAT is only valid after the default image data, governed by an fcTL.
        if !self.have_idat || self.seq.is_none() || self.current.is_none() {
            return Err(FormatError::OrphanFrameData.into());
        }
        self.next_sequence(sequence_number)?;
        let frame = self.current.as_mut().ok_or(FormatError::OrphanFrameData)?;
        frame
            .data
            .push(chunk.data_start + 4..chunk.data_start + chunk.data.len());
        Ok(())
    }

    /// Enforces the shared monotonic numbering of fcTL and fdAT chunks.
    fn next_sequence(&mut self, actual: u32) -> Result<u32, FormatError> {
        let expected = match self.seq {
            Some(seq) => seq.checked_add(1).ok_or(FormatError::OutOfOrderFrame {
                expected: u32::MAX,
                actual,
            })?,
            None => 0,
        };
        if actual != expected {
            return Err(FormatError::OutOfOrderFrame { expected, actual });
        }
        self.seq = Some(actual);
        Ok(actual)
    }

    /// Moves the frame under construction into the table, requiring that
    /// at least one data chunk was seen for it.
    fn take_finished_frame(&mut self) -> Result<(), FormatError> {
        if let Some(frame) = self.current.take() {
            if frame.data.is_empty() {
                return Err(FormatError::MissingFrameData(self.frames.len() as u32));
            }
            self.frames.push(frame);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Animation, Error> {
        let ihdr = self.ihdr.take().ok_or(FormatError::MissingIhdr)?;
        let actl = self.actl.take().ok_or(FormatError::NotAnimated)?;
        self.take_finished_frame()?;
        if self.frames.len() as u32 != actl.num_frames {
            return Err(FormatError::FrameCountMismatch {
                declared: actl.num_frames,
                actual: self.frames.len() as u32,
            }
            .into());
        }

        let info = Info {
            width: ihdr.width,
            height: ihdr.height,
            bit_depth: ihdr.bit_depth,
            color_type: ihdr.color_type,
            animation_control: actl,
        };

        // Canvas plus a possible snapshot of it, plus the filtered and
        // defiltered buffers of the largest frame. Best-effort accounting,
        // checked before any of those allocations happen.
        let canvas = u64::from(info.width) * u64::from(info.height) * 4;
        let frame_peak = self
            .frames
            .iter()
            .map(|f| 2 * info.frame_byte_len(&f.control) + u64::from(f.control.height))
            .max()
            .unwrap_or(0);
        if canvas * 2 + frame_peak > self.limits.bytes as u64 {
            return Err(Error::LimitsExceeded);
        }

        Ok(Animation {
            info,
            frames: self.frames,
        })
    }
}
