//! Construction of synthetic animations for unit tests.

use std::ops::Range;

use miniz_oxide::deflate::compress_to_vec_zlib;

use super::{Animation, RawFrame};
use crate::common::{
    AnimationControl, BitDepth, BlendOp, ColorType, DisposeOp, FrameControl, Info,
};

/// A solid-color frame rectangle with explicit dispose and blend operations.
pub(crate) struct TestFrame {
    x_offset: u32,
    y_offset: u32,
    width: u32,
    height: u32,
    color: [u8; 4],
    dispose_op: DisposeOp,
    blend_op: BlendOp,
}

impl TestFrame {
    pub(crate) fn rect(x_offset: u32, y_offset: u32, width: u32, height: u32, color: [u8; 4]) -> Self {
        TestFrame {
            x_offset,
            y_offset,
            width,
            height,
            color,
            dispose_op: DisposeOp::None,
            blend_op: BlendOp::Source,
        }
    }

    pub(crate) fn dispose(mut self, op: DisposeOp) -> Self {
        self.dispose_op = op;
        self
    }

    pub(crate) fn blend(mut self, op: BlendOp) -> Self {
        self.blend_op = op;
        self
    }
}

/// Builds an [`Animation`] over a synthetic source buffer holding each
/// frame's compressed RGBA scanlines, bypassing the container layer.
pub(crate) fn animation(width: u32, height: u32, frames: &[TestFrame]) -> (Animation, Vec<u8>) {
    let mut source = Vec::new();
    let mut raw_frames = Vec::new();
    for (index, tf) in frames.iter().enumerate() {
        let range = frame_source(&mut source, tf.width, tf.height, tf.color);
        raw_frames.push(RawFrame {
            control: FrameControl {
                sequence_number: index as u32,
                width: tf.width,
                height: tf.height,
                x_offset: tf.x_offset,
                y_offset: tf.y_offset,
                delay_num: 1,
                delay_den: 10,
                dispose_op: tf.dispose_op,
                blend_op: tf.blend_op,
            },
            data: vec![range],
        });
    }
    let info = Info {
        width,
        height,
        bit_depth: BitDepth::Eight,
        color_type: ColorType::Rgba,
        animation_control: AnimationControl {
            num_frames: frames.len() as u32,
            num_plays: 0,
        },
    };
    (
        Animation {
            info,
            frames: raw_frames,
        },
        source,
    )
}

/// Appends one frame's zlib stream of unfiltered solid-color scanlines and
/// returns its byte range within `source`.
pub(crate) fn frame_source(
    source: &mut Vec<u8>,
    width: u32,
    height: u32,
    color: [u8; 4],
) -> Range<usize> {
    let mut scanlines = Vec::new();
    for _ in 0..height {
        scanlines.push(0u8);
        for _ in 0..width {
            scanlines.extend_from_slice(&color);
        }
    }
    let compressed = compress_to_vec_zlib(&scanlines, 6);
    let start = source.len();
    source.extend_from_slice(&compressed);
    start..source.len()
}
