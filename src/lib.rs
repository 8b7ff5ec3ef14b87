//! Decoding and frame compositing for animated PNG (APNG) images.
//!
//! The crate parses the chunked container structure plus the animation
//! control extension, inflates and defilters per-frame pixel data, and
//! composites successive frames according to their dispose and blend
//! operations, so that the visible canvas for any frame index can be
//! produced — including under backward seeks.
//!
//! The usual entry point is the [`Registry`], which owns decoded instances
//! behind opaque handles and is safe to share between threads:
//!
//! ```no_run
//! use apng::Registry;
//!
//! # fn run() -> Result<(), apng::Error> {
//! let bytes = std::fs::read("ball.apng")?;
//! let registry = Registry::new();
//! let image = registry.decode(bytes)?;
//!
//! let mut canvas = vec![0u8; image.width as usize * image.height as usize * 4];
//! for index in 0..image.frame_count {
//!     registry.render_into(image.handle, index, &mut canvas)?;
//!     // hand `canvas` (RGBA, row-major) to the consumer
//! }
//! registry.destroy(image.handle)?;
//! # Ok(())
//! # }
//! ```
//!
//! Callers that do not need the handle indirection can drive the layers
//! directly: [`Decoder`] parses a stream into an [`Animation`], and a
//! [`Compositor`] renders frames from it.

pub mod chunk;
mod common;
mod composite;
mod decoder;
mod error;
mod filter;
mod registry;
mod traits;

pub use crate::common::{
    AnimationControl, BitDepth, BlendOp, ColorType, Delay, DisposeOp, FrameControl, Info, Limits,
};
pub use crate::composite::Compositor;
pub use crate::decoder::{is_apng, Animation, DecodeOptions, Decoder};
pub use crate::error::{Error, FormatError};
pub use crate::registry::{DecodeResult, Handle, Registry};
