//! Surface rendering seam: turns a live UI surface into a raster image.

mod adb;

pub use adb::AdbScreencapRenderer;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use glimpse_types::{
    frame::{Point, RasterImage},
    GlimpseError, Result,
};
use tracing::debug;

/// Produces one raster image of the instrumented surface per call.
///
/// Implementations own the hop onto whatever context is authoritative for
/// UI state; callers only await the result.
#[async_trait]
pub trait SurfaceRenderer: Send + Sync {
    async fn capture(&self) -> Result<RasterImage>;
}

/// Deterministic renderer used for demos and tests: a fixed gradient with a
/// block whose position advances on each capture.
pub struct SyntheticRenderer {
    width: u32,
    height: u32,
    origin: Point,
    attached: AtomicBool,
    frames: AtomicU64,
}

impl SyntheticRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            origin: Point::default(),
            attached: AtomicBool::new(true),
            frames: AtomicU64::new(0),
        }
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Detaching makes every subsequent capture fail with a capture error.
    pub fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::SeqCst);
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    fn paint(&self, sequence: u64) -> RasterImage {
        let (w, h) = (self.width, self.height);
        let block = (w / 8).max(1);
        let block_x = if w > block {
            (sequence * u64::from(block) % u64::from(w - block)) as u32
        } else {
            0
        };
        let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
        for y in 0..h {
            for x in 0..w {
                if x >= block_x && x < block_x + block && y < block {
                    data.extend_from_slice(&[220, 40, 40, 255]);
                } else {
                    let r = (x * 255 / w.max(1)) as u8;
                    let g = (y * 255 / h.max(1)) as u8;
                    data.extend_from_slice(&[r, g, 160, 255]);
                }
            }
        }
        RasterImage::from_rgba(w, h, data).with_origin(self.origin)
    }
}

#[async_trait]
impl SurfaceRenderer for SyntheticRenderer {
    async fn capture(&self) -> Result<RasterImage> {
        if !self.attached.load(Ordering::SeqCst) {
            return Err(capture_error("synthetic surface is not attached"));
        }
        let sequence = self.frames.fetch_add(1, Ordering::SeqCst);
        debug!("Rendering synthetic frame {sequence}");
        Ok(self.paint(sequence))
    }
}

/// Generate an error aligned with capture semantics.
pub fn capture_error(message: impl Into<String>) -> GlimpseError {
    GlimpseError::Capture(message.into())
}
