use glimpse_types::frame::RasterImage;
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::{pattern::pattern_cell, registry::MaskSnapshot, PATTERN_SIZE};

/// Paints the cross-hatch pattern over every visible region of a snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskingRenderer;

impl MaskingRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Bounds and visibility are read from each region now, not from when the
    /// snapshot was taken.
    pub fn render(&self, raw: RasterImage, masks: &MaskSnapshot) -> RasterImage {
        if masks.is_empty() {
            return raw;
        }
        if !raw.is_well_formed() {
            warn!(
                "Raster buffer does not match {}x{}; leaving frame unmasked",
                raw.width, raw.height
            );
            return raw;
        }
        let RasterImage {
            width,
            height,
            origin,
            data,
        } = raw;
        let Some(mut canvas) = RgbaImage::from_raw(width, height, data) else {
            return RasterImage::from_rgba(width, height, Vec::new()).with_origin(origin);
        };

        let cell = pattern_cell();
        let mut painted = 0usize;
        for region in masks.regions() {
            let target = region.target();
            if !target.is_visible() {
                continue;
            }
            let local = target.bounds().relative_to(origin);
            let Some(rect) = local.clip_to(width, height) else {
                continue;
            };
            // Tiles start at the region's own top-left, even when it is clipped.
            let (tile_x, tile_y) = (local.x, local.y);
            for y in rect.y..rect.y + rect.height {
                let cy = (i64::from(y) - i64::from(tile_y)).rem_euclid(i64::from(PATTERN_SIZE));
                for x in rect.x..rect.x + rect.width {
                    let cx =
                        (i64::from(x) - i64::from(tile_x)).rem_euclid(i64::from(PATTERN_SIZE));
                    let px: Rgba<u8> = *cell.get_pixel(cx as u32, cy as u32);
                    canvas.put_pixel(x as u32, y as u32, px);
                }
            }
            painted += 1;
        }
        debug!("Masked {painted} of {} regions", masks.len());

        RasterImage {
            width,
            height,
            origin,
            data: canvas.into_raw(),
        }
    }
}
