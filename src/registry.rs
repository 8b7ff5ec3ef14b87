//! The process-wide table of live decoder instances.
//!
//! Every decoded animation is owned by a [`Registry`] entry and addressed
//! through an opaque [`Handle`]. Handles are allocated from a monotonic
//! counter and never reused, so a destroyed instance's handle can only
//! ever fail with [`Error::InvalidHandle`] afterwards.

use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::common::Delay;
use crate::composite::Compositor;
use crate::decoder::{Animation, DecodeOptions, Decoder};
use crate::error::Error;

/// An opaque reference to a live decoder instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

/// The metadata returned when an instance is created.
#[derive(Debug, Clone)]
pub struct DecodeResult {
    pub handle: Handle,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    /// Number of animation loops, `0` for infinite.
    pub loop_count: u32,
    /// Display duration per frame, in frame order.
    pub frame_durations: Vec<Delay>,
    /// Estimated raw pixel bytes decoded over the instance's lifetime.
    pub all_frame_byte_count: u64,
}

struct Instance {
    animation: Animation,
    source: Arc<[u8]>,
    compositor: Compositor,
}

/// Maps handles to decoder instances.
///
/// The table itself is safe for concurrent create/lookup/destroy. Each
/// instance carries its own lock, so rendering one animation never blocks
/// work on another; render calls against a single handle serialize on that
/// instance's lock.
pub struct Registry {
    images: Mutex<HashMap<u64, Arc<Mutex<Instance>>>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            images: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Decodes a complete stream and registers a new instance.
    ///
    /// On success the returned record is fully populated; on any error no
    /// instance is registered at all.
    pub fn decode(&self, source: impl Into<Arc<[u8]>>) -> Result<DecodeResult, Error> {
        self.decode_with_options(source, DecodeOptions::default())
    }

    /// Like [`decode`](Registry::decode), with explicit options.
    pub fn decode_with_options(
        &self,
        source: impl Into<Arc<[u8]>>,
        options: DecodeOptions,
    ) -> Result<DecodeResult, Error> {
        let source: Arc<[u8]> = source.into();
        debug!("decode start: {} bytes", source.len());
        let animation = Decoder::with_options(&source, options).read_animation()?;
        let compositor = Compositor::new(animation.info());
        let result = self.register(Instance {
            animation,
            source,
            compositor,
        });
        debug!(
            "decode end: {}x{}, {} frames, {} live instances",
            result.width,
            result.height,
            result.frame_count,
            self.len()
        );
        Ok(result)
    }

    /// Drains a readable byte source, then decodes it.
    pub fn decode_reader<R: Read>(&self, mut reader: R) -> Result<DecodeResult, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.decode(bytes)
    }

    /// Composites the given frame and copies the canvas into `dest`.
    ///
    /// `dest` must hold exactly `width * height * 4` bytes. An out-of-range
    /// index fails before the canvas is touched.
    pub fn render_into(
        &self,
        handle: Handle,
        frame_index: u32,
        dest: &mut [u8],
    ) -> Result<(), Error> {
        let instance = self.get(handle)?;
        let mut guard = instance.lock().unwrap_or_else(PoisonError::into_inner);
        let Instance {
            animation,
            source,
            compositor,
        } = &mut *guard;
        let expected = animation.info().canvas_byte_len();
        if dest.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: dest.len(),
            });
        }
        let canvas = compositor.render(animation, source, frame_index)?;
        dest.copy_from_slice(canvas);
        Ok(())
    }

    /// Registers an independent copy of an instance under a new handle.
    ///
    /// The copy gets a fresh canvas and decode position; only the immutable
    /// source bytes are shared. Driving both instances concurrently to
    /// different frames is sound.
    pub fn duplicate(&self, handle: Handle) -> Result<DecodeResult, Error> {
        let instance = self.get(handle)?;
        let guard = instance.lock().unwrap_or_else(PoisonError::into_inner);
        let animation = guard.animation.clone();
        let source = Arc::clone(&guard.source);
        drop(guard);
        let compositor = Compositor::new(animation.info());
        let result = self.register(Instance {
            animation,
            source,
            compositor,
        });
        debug!(
            "duplicate: {:?} -> {:?}, {} live instances",
            handle,
            result.handle,
            self.len()
        );
        Ok(result)
    }

    /// Removes an instance and releases its buffers.
    ///
    /// A second call with the same handle fails with
    /// [`Error::InvalidHandle`].
    pub fn destroy(&self, handle: Handle) -> Result<(), Error> {
        let removed = self
            .images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);
        match removed {
            Some(_) => {
                debug!("destroy: {:?}, {} live instances", handle, self.len());
                Ok(())
            }
            None => Err(Error::InvalidHandle),
        }
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register(&self, instance: Instance) -> DecodeResult {
        let animation = &instance.animation;
        let result = DecodeResult {
            handle: Handle(self.next_id.fetch_add(1, Ordering::Relaxed)),
            width: animation.width(),
            height: animation.height(),
            frame_count: animation.frame_count(),
            loop_count: animation.loop_count(),
            frame_durations: animation.frame_durations(),
            all_frame_byte_count: animation.all_frame_byte_count(),
        };
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(result.handle.0, Arc::new(Mutex::new(instance)));
        result
    }

    fn get(&self, handle: Handle) -> Result<Arc<Mutex<Instance>>, Error> {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle.0)
            .cloned()
            .ok_or(Error::InvalidHandle)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_handles_are_rejected() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.destroy(Handle(7)),
            Err(Error::InvalidHandle)
        ));
        let mut dest = [0u8; 4];
        assert!(matches!(
            registry.render_into(Handle(7), 0, &mut dest),
            Err(Error::InvalidHandle)
        ));
        assert!(matches!(
            registry.duplicate(Handle(7)),
            Err(Error::InvalidHandle)
        ));
    }
}
