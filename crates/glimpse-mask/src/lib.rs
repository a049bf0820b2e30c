//! Redaction masks: the registry of sensitive elements and the renderer that
//! paints over them.

mod pattern;
mod registry;
mod renderer;

pub use pattern::{pattern_cell, PATTERN_SIZE, STRIPE_GAP, STRIPE_WIDTH};
pub use registry::{ElementHandle, MaskRegion, MaskRegistry, MaskSnapshot};
pub use renderer::MaskingRenderer;
