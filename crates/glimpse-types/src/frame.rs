use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Window-space coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rendered surface as produced by the external renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Window-space position of the root surface; mask bounds are translated by it.
    pub origin: Point,
    /// Raw RGBA pixel buffer, row-major.
    pub data: Vec<u8>,
}

impl RasterImage {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            origin: Point::default(),
            data,
        }
    }

    /// Image filled with a single RGBA colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self::from_rgba(width, height, data)
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// True when the pixel buffer length matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() as u64 == self.area() * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// One compressed capture, immutable once appended to a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub payload: Vec<u8>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl CapturedFrame {
    pub fn new(payload: Vec<u8>, timestamp_ms: i64) -> Self {
        Self {
            payload,
            timestamp_ms,
        }
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_image_is_well_formed() {
        let image = RasterImage::filled(3, 2, [1, 2, 3, 255]);
        assert!(image.is_well_formed());
        assert_eq!(image.area(), 6);
        assert_eq!(image.pixel(2, 1), Some([1, 2, 3, 255]));
        assert_eq!(image.pixel(3, 0), None);
    }

    #[test]
    fn truncated_buffer_is_not_well_formed() {
        let image = RasterImage::from_rgba(2, 2, vec![0; 12]);
        assert!(!image.is_well_formed());
    }
}
