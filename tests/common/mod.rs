//! Synthetic APNG construction shared by the integration tests.
#![allow(dead_code)]

use crc32fast::Hasher as Crc32;
use miniz_oxide::deflate::compress_to_vec_zlib;

pub const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const CLEAR: [u8; 4] = [0, 0, 0, 0];

/// Appends one chunk with a correct CRC.
pub fn write_chunk(out: &mut Vec<u8>, type_: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(type_);
    out.extend_from_slice(data);
    let mut hasher = Crc32::new();
    hasher.update(type_);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}

pub fn ihdr_payload(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[bit_depth, color_type, 0, 0, 0]);
    data
}

pub fn actl_payload(num_frames: u32, num_plays: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(8);
    data.extend_from_slice(&num_frames.to_be_bytes());
    data.extend_from_slice(&num_plays.to_be_bytes());
    data
}

/// One frame of a synthetic animation.
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    pub delay_den: u16,
    pub dispose_op: u8,
    pub blend_op: u8,
    /// Raw pixels, `width * height * bpp` bytes, no filter bytes.
    pub pixels: Vec<u8>,
}

impl FrameSpec {
    /// A solid RGBA rectangle.
    pub fn solid(x_offset: u32, y_offset: u32, width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity((width * height) as usize * 4);
        for _ in 0..width * height {
            pixels.extend_from_slice(&color);
        }
        FrameSpec {
            width,
            height,
            x_offset,
            y_offset,
            delay_num: 1,
            delay_den: 10,
            dispose_op: 0,
            blend_op: 0,
            pixels,
        }
    }

    /// A rectangle with explicit raw pixels of any bpp.
    pub fn with_pixels(
        x_offset: u32,
        y_offset: u32,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Self {
        FrameSpec {
            width,
            height,
            x_offset,
            y_offset,
            delay_num: 1,
            delay_den: 10,
            dispose_op: 0,
            blend_op: 0,
            pixels,
        }
    }

    pub fn dispose(mut self, op: u8) -> Self {
        self.dispose_op = op;
        self
    }

    pub fn blend(mut self, op: u8) -> Self {
        self.blend_op = op;
        self
    }

    pub fn delay(mut self, num: u16, den: u16) -> Self {
        self.delay_num = num;
        self.delay_den = den;
        self
    }
}

pub fn fctl_payload(sequence_number: u32, frame: &FrameSpec) -> Vec<u8> {
    let mut data = Vec::with_capacity(26);
    data.extend_from_slice(&sequence_number.to_be_bytes());
    data.extend_from_slice(&frame.width.to_be_bytes());
    data.extend_from_slice(&frame.height.to_be_bytes());
    data.extend_from_slice(&frame.x_offset.to_be_bytes());
    data.extend_from_slice(&frame.y_offset.to_be_bytes());
    data.extend_from_slice(&frame.delay_num.to_be_bytes());
    data.extend_from_slice(&frame.delay_den.to_be_bytes());
    data.push(frame.dispose_op);
    data.push(frame.blend_op);
    data
}

/// Filter-prefixed scanlines, zlib compressed.
pub fn compress_scanlines(pixels: &[u8], width: usize, bpp: usize) -> Vec<u8> {
    let mut scanlines = Vec::new();
    for row in pixels.chunks(width * bpp) {
        scanlines.push(0);
        scanlines.extend_from_slice(row);
    }
    compress_to_vec_zlib(&scanlines, 6)
}

pub fn fdat_payload(sequence_number: u32, compressed: &[u8]) -> Vec<u8> {
    let mut data = sequence_number.to_be_bytes().to_vec();
    data.extend_from_slice(compressed);
    data
}

/// Assembles a complete RGBA APNG whose first frame is carried by the
/// default image data.
pub fn build_apng(width: u32, height: u32, frames: &[FrameSpec]) -> Vec<u8> {
    build_apng_color(width, height, 6, 4, frames)
}

/// Like [`build_apng`] with an explicit color type.
pub fn build_apng_color(
    width: u32,
    height: u32,
    color_type: u8,
    bpp: usize,
    frames: &[FrameSpec],
) -> Vec<u8> {
    let mut out = SIGNATURE.to_vec();
    write_chunk(&mut out, b"IHDR", &ihdr_payload(width, height, 8, color_type));
    write_chunk(&mut out, b"acTL", &actl_payload(frames.len() as u32, 0));
    let mut seq = 0u32;
    for (index, frame) in frames.iter().enumerate() {
        write_chunk(&mut out, b"fcTL", &fctl_payload(seq, frame));
        seq += 1;
        let compressed = compress_scanlines(&frame.pixels, frame.width as usize, bpp);
        if index == 0 {
            write_chunk(&mut out, b"IDAT", &compressed);
        } else {
            write_chunk(&mut out, b"fdAT", &fdat_payload(seq, &compressed));
            seq += 1;
        }
    }
    write_chunk(&mut out, b"IEND", &[]);
    out
}

/// An APNG whose default image carries no fcTL: it is a standalone image
/// and every animation frame travels in fdAT chunks.
pub fn build_apng_with_default_image(width: u32, height: u32, frames: &[FrameSpec]) -> Vec<u8> {
    let mut out = SIGNATURE.to_vec();
    write_chunk(&mut out, b"IHDR", &ihdr_payload(width, height, 8, 6));
    write_chunk(&mut out, b"acTL", &actl_payload(frames.len() as u32, 0));
    let default_pixels = vec![0u8; (width * height) as usize * 4];
    write_chunk(
        &mut out,
        b"IDAT",
        &compress_scanlines(&default_pixels, width as usize, 4),
    );
    let mut seq = 0u32;
    for frame in frames {
        write_chunk(&mut out, b"fcTL", &fctl_payload(seq, frame));
        seq += 1;
        let compressed = compress_scanlines(&frame.pixels, frame.width as usize, 4);
        write_chunk(&mut out, b"fdAT", &fdat_payload(seq, &compressed));
        seq += 1;
    }
    write_chunk(&mut out, b"IEND", &[]);
    out
}

/// A well-formed single-image PNG without any animation chunks.
pub fn build_plain_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = SIGNATURE.to_vec();
    write_chunk(&mut out, b"IHDR", &ihdr_payload(width, height, 8, 6));
    let pixels = vec![128u8; (width * height) as usize * 4];
    write_chunk(
        &mut out,
        b"IDAT",
        &compress_scanlines(&pixels, width as usize, 4),
    );
    write_chunk(&mut out, b"IEND", &[]);
    out
}

/// Reads the RGBA value at `(x, y)` out of a rendered canvas.
pub fn rgba_at(canvas: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let index = (y as usize * width as usize + x as usize) * 4;
    [
        canvas[index],
        canvas[index + 1],
        canvas[index + 2],
        canvas[index + 3],
    ]
}
