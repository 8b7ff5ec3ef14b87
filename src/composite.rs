//! Incremental frame compositing onto the shared canvas.

use crate::common::{BlendOp, ColorType, DisposeOp, FrameControl, Info};
use crate::decoder::{decode_frame, Animation};
use crate::error::Error;

/// Owns the full-canvas RGBA buffer and brings it to the state of any
/// requested frame index.
///
/// The canvas holds straight (non-premultiplied) alpha throughout. Frames
/// are applied with a three-phase transition: dispose the region of the
/// frame shown so far, snapshot the incoming frame's region when it will
/// dispose to `Previous`, then decode and draw the incoming frame with its
/// blend operation.
///
/// Requesting the frame already shown is free; requesting a later frame
/// advances one frame at a time; requesting an earlier frame clears the
/// canvas and replays from the start. Looping is the caller's concern:
/// the target index is never wrapped.
pub struct Compositor {
    width: u32,
    height: u32,
    canvas: Vec<u8>,
    /// Index of the frame the canvas currently shows, if any.
    rendered: Option<u32>,
    /// Content of the shown frame's rectangle from before it was drawn,
    /// kept only while that frame disposes to `Previous`.
    snapshot: Option<Snapshot>,
}

struct Snapshot {
    x_offset: u32,
    y_offset: u32,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Compositor {
    /// A fully transparent canvas for the given metadata.
    pub fn new(info: &Info) -> Compositor {
        Compositor {
            width: info.width,
            height: info.height,
            canvas: vec![0; info.canvas_byte_len()],
            rendered: None,
            snapshot: None,
        }
    }

    /// The frame index the canvas currently shows.
    pub fn rendered_through(&self) -> Option<u32> {
        self.rendered
    }

    /// Brings the canvas to `target` and returns a read-only view of it.
    ///
    /// Fails fast on an out-of-range index without touching the canvas.
    pub fn render<'a>(
        &'a mut self,
        animation: &Animation,
        source: &[u8],
        target: u32,
    ) -> Result<&'a [u8], Error> {
        let frame_count = animation.frame_count();
        if target >= frame_count {
            return Err(Error::InvalidFrameIndex {
                index: target,
                frame_count,
            });
        }
        match self.rendered {
            Some(shown) if shown == target => {}
            Some(shown) if shown < target => {
                for index in shown + 1..=target {
                    self.advance(animation, source, index)?;
                }
            }
            // Backward seek or first use: replay from the beginning.
            _ => {
                self.reset();
                for index in 0..=target {
                    self.advance(animation, source, index)?;
                }
            }
        }
        Ok(&self.canvas)
    }

    fn reset(&mut self) {
        self.canvas.fill(0);
        self.rendered = None;
        self.snapshot = None;
    }

    /// Applies the transition from frame `index - 1` to frame `index`.
    fn advance(&mut self, animation: &Animation, source: &[u8], index: u32) -> Result<(), Error> {
        // Decode up front: a defect in the frame data must not leave the
        // canvas half-disposed.
        let frame = &animation.frames()[index as usize];
        let control = frame.control;
        let pixels = decode_frame(source, frame, animation.info())?;

        // Phase 1: dispose of the frame shown so far. Disposal is deferred
        // until the next frame is needed, so the disposed frame itself was
        // visible until now.
        if index > 0 {
            let shown = &animation.frames()[index as usize - 1].control;
            match shown.dispose_op {
                DisposeOp::None => {}
                DisposeOp::Background => {
                    self.clear_region(shown);
                }
                DisposeOp::Previous => {
                    if let Some(snapshot) = self.snapshot.take() {
                        self.restore(&snapshot);
                    }
                }
            }
        }
        self.snapshot = None;

        // Phase 2: remember what the incoming frame is about to overwrite,
        // if its own disposal will need it back.
        if control.dispose_op == DisposeOp::Previous {
            self.snapshot = Some(self.capture(&control));
        }

        // Phase 3: draw.
        self.draw(&control, &pixels, animation.info().color_type);
        self.rendered = Some(index);
        Ok(())
    }

    fn clear_region(&mut self, fc: &FrameControl) {
        for y in 0..fc.height {
            let start = self.pixel_index(fc.x_offset, fc.y_offset + y);
            self.canvas[start..start + fc.width as usize * 4].fill(0);
        }
    }

    fn capture(&self, fc: &FrameControl) -> Snapshot {
        let mut pixels = Vec::with_capacity(fc.width as usize * fc.height as usize * 4);
        for y in 0..fc.height {
            let start = self.pixel_index(fc.x_offset, fc.y_offset + y);
            pixels.extend_from_slice(&self.canvas[start..start + fc.width as usize * 4]);
        }
        Snapshot {
            x_offset: fc.x_offset,
            y_offset: fc.y_offset,
            width: fc.width,
            height: fc.height,
            pixels,
        }
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        let row_len = snapshot.width as usize * 4;
        for y in 0..snapshot.height {
            let start = self.pixel_index(snapshot.x_offset, snapshot.y_offset + y);
            self.canvas[start..start + row_len]
                .copy_from_slice(&snapshot.pixels[y as usize * row_len..][..row_len]);
        }
    }

    fn draw(&mut self, fc: &FrameControl, pixels: &[u8], color_type: ColorType) {
        let bpp = color_type.samples();
        for y in 0..fc.height {
            let row = &pixels[y as usize * fc.width as usize * bpp..];
            for x in 0..fc.width {
                let src = expand_to_rgba(color_type, &row[x as usize * bpp..][..bpp]);
                let index = self.pixel_index(fc.x_offset + x, fc.y_offset + y);
                let dst = &mut self.canvas[index..index + 4];
                match fc.blend_op {
                    BlendOp::Source => dst.copy_from_slice(&src),
                    BlendOp::Over => blend_over(dst, src),
                }
            }
        }
    }

    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

fn expand_to_rgba(color_type: ColorType, px: &[u8]) -> [u8; 4] {
    match color_type {
        ColorType::Grayscale => [px[0], px[0], px[0], 255],
        ColorType::GrayscaleAlpha => [px[0], px[0], px[0], px[1]],
        ColorType::Rgb => [px[0], px[1], px[2], 255],
        ColorType::Rgba => [px[0], px[1], px[2], px[3]],
        // Rejected during header parsing.
        ColorType::Indexed => [0, 0, 0, 0],
    }
}

/// Source-over compositing of straight-alpha pixels.
fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    if src[3] == 0 {
        return;
    }
    if src[3] == 255 {
        dst.copy_from_slice(&src);
        return;
    }

    let fg_a = f32::from(src[3]) / 255.0;
    let bg_a = f32::from(dst[3]) / 255.0;
    let alpha_final = bg_a + fg_a - bg_a * fg_a;
    if alpha_final == 0.0 {
        return;
    }

    for channel in 0..3 {
        let fg = f32::from(src[channel]) / 255.0;
        let bg = f32::from(dst[channel]) / 255.0;
        // Premultiplied intermediates, unmultiplied by the resulting alpha.
        let out = (fg * fg_a + bg * bg_a * (1.0 - fg_a)) / alpha_final;
        dst[channel] = (255.0 * out) as u8;
    }
    dst[3] = (255.0 * alpha_final) as u8;
}
