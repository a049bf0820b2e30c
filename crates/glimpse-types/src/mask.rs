use serde::{Deserialize, Serialize};

use crate::frame::Point;

/// Axis-aligned rectangle in window space. Width and height may be zero or
/// negative for collapsed elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Shift into the coordinate space whose origin is `origin`.
    pub fn relative_to(&self, origin: Point) -> Rect {
        Rect::new(
            self.x.saturating_sub(origin.x),
            self.y.saturating_sub(origin.y),
            self.width,
            self.height,
        )
    }

    /// Intersection with `[0, width) x [0, height)`, or `None` when nothing remains.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        let left = i64::from(self.x).max(0);
        let top = i64::from(self.y).max(0);
        let right = (i64::from(self.x) + i64::from(self.width)).min(i64::from(width));
        let bottom = (i64::from(self.y) + i64::from(self.height)).min(i64::from(height));
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(
            left as i32,
            top as i32,
            (right - left) as i32,
            (bottom - top) as i32,
        ))
    }
}

/// A UI element whose on-screen content must be obscured.
///
/// Implementations are owned by the host UI layer; both methods are read on
/// every capture, so they must reflect the element's live state.
pub trait MaskTarget: Send + Sync {
    /// Stable label used in diagnostics.
    fn label(&self) -> String;
    /// Bounding box in window coordinates.
    fn bounds(&self) -> Rect;
    fn is_visible(&self) -> bool;
}
