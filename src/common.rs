//! Types shared across the parsing, decoding and compositing layers.

use std::fmt;
use std::time::Duration;

use num_rational::Ratio;

use crate::error::FormatError;

/// Describes how a pixel is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorType {
    /// 1 grayscale sample.
    Grayscale = 0,
    /// 1 red sample, 1 green sample, 1 blue sample.
    Rgb = 2,
    /// 1 sample for the palette index.
    Indexed = 3,
    /// 1 grayscale sample, then 1 alpha sample.
    GrayscaleAlpha = 4,
    /// 1 red sample, 1 green sample, 1 blue sample, and finally, 1 alpha sample.
    Rgba = 6,
}

impl ColorType {
    /// Returns the number of samples used per pixel encoded in this way.
    pub fn samples(self) -> usize {
        use self::ColorType::*;
        match self {
            Grayscale | Indexed => 1,
            GrayscaleAlpha => 2,
            Rgb => 3,
            Rgba => 4,
        }
    }

    /// u8 -> Self. Temporary solution until Rust provides a canonical one.
    pub fn from_u8(n: u8) -> Option<ColorType> {
        match n {
            0 => Some(ColorType::Grayscale),
            2 => Some(ColorType::Rgb),
            3 => Some(ColorType::Indexed),
            4 => Some(ColorType::GrayscaleAlpha),
            6 => Some(ColorType::Rgba),
            _ => None,
        }
    }
}

/// Bit depth of the image.
/// Specifies the number of bits per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
}

impl BitDepth {
    /// u8 -> Self. Temporary solution until Rust provides a canonical one.
    pub fn from_u8(n: u8) -> Option<BitDepth> {
        match n {
            1 => Some(BitDepth::One),
            2 => Some(BitDepth::Two),
            4 => Some(BitDepth::Four),
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }
}

/// How to reset the canvas region of a frame before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposeOp {
    /// Leave the canvas unchanged.
    None = 0,
    /// Clear the frame's region to fully transparent.
    Background = 1,
    /// Restore the frame's region to its content before the frame was drawn.
    Previous = 2,
}

impl DisposeOp {
    /// u8 -> Self. Temporary solution until Rust provides a canonical one.
    pub fn from_u8(n: u8) -> Option<DisposeOp> {
        match n {
            0 => Some(DisposeOp::None),
            1 => Some(DisposeOp::Background),
            2 => Some(DisposeOp::Previous),
            _ => None,
        }
    }
}

impl fmt::Display for DisposeOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            DisposeOp::None => "DISPOSE_OP_NONE",
            DisposeOp::Background => "DISPOSE_OP_BACKGROUND",
            DisposeOp::Previous => "DISPOSE_OP_PREVIOUS",
        };
        write!(f, "{}", name)
    }
}

/// How a frame's pixels combine with the canvas content when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlendOp {
    /// Pixels overwrite the value at their position, alpha included.
    Source = 0,
    /// The new pixels are composited over the current state based on alpha.
    Over = 1,
}

impl BlendOp {
    /// u8 -> Self. Temporary solution until Rust provides a canonical one.
    pub fn from_u8(n: u8) -> Option<BlendOp> {
        match n {
            0 => Some(BlendOp::Source),
            1 => Some(BlendOp::Over),
            _ => None,
        }
    }
}

impl fmt::Display for BlendOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            BlendOp::Source => "BLEND_OP_SOURCE",
            BlendOp::Over => "BLEND_OP_OVER",
        };
        write!(f, "{}", name)
    }
}

/// Frame control information
#[derive(Clone, Copy, Debug)]
pub struct FrameControl {
    /// Sequence number of the animation chunk, starting from 0
    pub sequence_number: u32,
    /// Width of the frame rectangle
    pub width: u32,
    /// Height of the frame rectangle
    pub height: u32,
    /// X position at which to render the frame
    pub x_offset: u32,
    /// Y position at which to render the frame
    pub y_offset: u32,
    /// Frame delay fraction numerator
    pub delay_num: u16,
    /// Frame delay fraction denominator
    pub delay_den: u16,
    /// Type of frame area disposal to be done after rendering this frame
    pub dispose_op: DisposeOp,
    /// Type of frame area rendering for this frame
    pub blend_op: BlendOp,
}

impl FrameControl {
    /// The frame delay as a rational count of milliseconds.
    pub fn delay(&self) -> Delay {
        Delay::from_frame_delay(self.delay_num, self.delay_den)
    }

    /// Checks the frame rectangle against the canvas dimensions.
    pub(crate) fn check_bounds(&self, canvas_width: u32, canvas_height: u32) -> Result<(), FormatError> {
        // Validate mathematically: self.width + self.x_offset <= canvas_width
        let in_x_bounds = Some(self.width) <= canvas_width.checked_sub(self.x_offset);
        // Validate mathematically: self.height + self.y_offset <= canvas_height
        let in_y_bounds = Some(self.height) <= canvas_height.checked_sub(self.y_offset);

        if self.width == 0 || self.height == 0 || !in_x_bounds || !in_y_bounds {
            return Err(FormatError::FrameOutOfBounds {
                x_offset: self.x_offset,
                y_offset: self.y_offset,
                width: self.width,
                height: self.height,
            });
        }

        Ok(())
    }
}

/// Animation control information
#[derive(Clone, Copy, Debug)]
pub struct AnimationControl {
    /// Number of frames
    pub num_frames: u32,
    /// Number of times to loop the animation. 0 indicates infinite looping.
    pub num_plays: u32,
}

/// The display duration of one frame.
///
/// Stored as a ratio of milliseconds so that delays such as 1/30 s survive
/// without rounding until the caller asks for an integral value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
pub struct Delay {
    ratio: Ratio<u32>,
}

impl Delay {
    /// Create a delay from a ratio of milliseconds.
    pub fn from_num_denom_ms(numerator: u32, denominator: u32) -> Self {
        Delay {
            ratio: Ratio::new_raw(numerator, denominator),
        }
    }

    /// Create a delay from a frame control fraction of seconds.
    ///
    /// A zero denominator is read as 100, as the format prescribes.
    pub fn from_frame_delay(numerator: u16, denominator: u16) -> Self {
        let denominator = match denominator {
            0 => 100,
            d => u32::from(d),
        };
        Delay {
            ratio: Ratio::new_raw(u32::from(numerator) * 1_000, denominator),
        }
    }

    /// The numerator and denominator of the delay in milliseconds.
    pub fn num_denom_ms(self) -> (u32, u32) {
        (*self.ratio.numer(), *self.ratio.denom())
    }

    /// The delay in whole milliseconds, truncating any fractional part.
    pub fn as_millis(self) -> u32 {
        self.ratio.to_integer()
    }
}

impl From<Delay> for Duration {
    fn from(delay: Delay) -> Self {
        let ratio = delay.ratio;
        let ms = ratio.to_integer();
        let rest = ratio.numer() % ratio.denom();
        let nanos = (u64::from(rest) * 1_000_000) / u64::from(*ratio.denom());
        Duration::from_millis(ms.into()) + Duration::from_nanos(nanos)
    }
}

/// Static metadata of a parsed animation: canvas geometry, pixel encoding
/// and the animation control record. Immutable after parsing.
#[derive(Clone, Debug)]
pub struct Info {
    pub width: u32,
    pub height: u32,
    pub bit_depth: BitDepth,
    pub color_type: ColorType,
    pub animation_control: AnimationControl,
}

impl Info {
    /// Bytes per pixel of the encoded frame data.
    pub(crate) fn bytes_per_pixel(&self) -> usize {
        // Only 8 bit samples survive header validation.
        self.color_type.samples()
    }

    /// Size in bytes of the RGBA canvas.
    pub(crate) fn canvas_byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Raw decoded size of one frame rectangle, without filter bytes.
    pub(crate) fn frame_byte_len(&self, fc: &FrameControl) -> u64 {
        u64::from(fc.width) * u64::from(fc.height) * self.bytes_per_pixel() as u64
    }
}

/// Limits on the resources the decoder is allowed to use.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    /// Maximum number of bytes the decoder is allowed to allocate, default is 64 MiB.
    pub bytes: usize,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            bytes: 1024 * 1024 * 64,
        }
    }
}
