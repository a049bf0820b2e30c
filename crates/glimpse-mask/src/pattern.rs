use image::{Rgba, RgbaImage};
use once_cell::sync::Lazy;

/// Edge of the square reference cell the pattern is tiled from.
pub const PATTERN_SIZE: u32 = 80;
pub const STRIPE_WIDTH: u32 = 20;
pub const STRIPE_GAP: u32 = STRIPE_WIDTH / 4;

const STRIPE_STEP: i64 = (STRIPE_WIDTH + STRIPE_GAP) as i64;
const LINE_THICKNESS: i64 = 2;
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const STRIPE: Rgba<u8> = Rgba([0x44, 0x44, 0x44, 255]);

static CELL: Lazy<RgbaImage> = Lazy::new(|| {
    RgbaImage::from_fn(PATTERN_SIZE, PATTERN_SIZE, |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let falling = (x - y).rem_euclid(STRIPE_STEP) < LINE_THICKNESS;
        let rising = (x + y).rem_euclid(STRIPE_STEP) < LINE_THICKNESS;
        if falling || rising {
            STRIPE
        } else {
            BACKGROUND
        }
    })
});

/// The cross-hatch reference cell. Never depends on captured content.
pub fn pattern_cell() -> &'static RgbaImage {
    &CELL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_has_both_stripe_families() {
        let cell = pattern_cell();
        assert_eq!(cell.dimensions(), (PATTERN_SIZE, PATTERN_SIZE));
        // (x - y) = 0 and (x + y) = 50 both land on stripes.
        assert_eq!(*cell.get_pixel(10, 10), STRIPE);
        assert_eq!(*cell.get_pixel(30, 20), STRIPE);
        assert_eq!(*cell.get_pixel(12, 0), BACKGROUND);
    }

    #[test]
    fn cell_mixes_stripe_and_background() {
        let cell = pattern_cell();
        let stripes = cell.pixels().filter(|px| **px == STRIPE).count();
        let total = (PATTERN_SIZE * PATTERN_SIZE) as usize;
        assert!(stripes > total / 20);
        assert!(stripes < total / 2);
    }
}
