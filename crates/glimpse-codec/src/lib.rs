//! Frame compression: lossy JPEG per frame, gzip per frame and per batch.

use std::io::{Read, Write};

use flate2::{
    read::{GzDecoder, MultiGzDecoder},
    write::GzEncoder,
    Compression,
};
use glimpse_types::{frame::RasterImage, GlimpseError, Result};
use image::{codecs::jpeg::JpegEncoder, ColorType, DynamicImage, RgbaImage};
use tracing::debug;

pub const DEFAULT_QUALITY: u8 = 50;

/// Output of [`FrameCompressor::encode_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Lossy encoding of the redacted frame, before gzip.
    pub jpeg: Vec<u8>,
    /// Gzipped `jpeg`; this is what gets buffered and shipped.
    pub payload: Vec<u8>,
}

/// Deterministic encoder: identical inputs and settings give identical bytes.
#[derive(Debug, Clone, Copy)]
pub struct FrameCompressor {
    quality: u8,
}

impl Default for FrameCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl FrameCompressor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn encode_frame(&self, image: &RasterImage) -> Result<EncodedFrame> {
        if image.area() == 0 {
            return Err(encoding_error(format!(
                "cannot encode a zero-area frame ({}x{})",
                image.width, image.height
            )));
        }
        if !image.is_well_formed() {
            return Err(encoding_error(format!(
                "pixel buffer holds {} bytes, expected {} for {}x{}",
                image.data.len(),
                image.area() * 4,
                image.width,
                image.height
            )));
        }
        let rgba = RgbaImage::from_raw(image.width, image.height, image.data.clone())
            .ok_or_else(|| encoding_error("pixel buffer rejected by image backend"))?;
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode(rgb.as_raw(), image.width, image.height, ColorType::Rgb8)
            .map_err(|err| encoding_error(format!("jpeg encoding failed: {err}")))?;
        let payload = gzip(&jpeg)?;
        debug!(
            "Encoded {}x{} frame: {} jpeg bytes, {} gzip bytes",
            image.width,
            image.height,
            jpeg.len(),
            payload.len()
        );
        Ok(EncodedFrame { jpeg, payload })
    }

    /// Concatenates already-compressed payloads in order and gzips the result.
    pub fn encode_batch<B: AsRef<[u8]>>(&self, frames: &[B]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for frame in frames {
            encoder
                .write_all(frame.as_ref())
                .map_err(|err| encoding_error(format!("failed to append frame: {err}")))?;
        }
        encoder
            .finish()
            .map_err(|err| encoding_error(format!("failed to finalize archive: {err}")))
    }
}

pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|err| encoding_error(format!("gzip write failed: {err}")))?;
    encoder
        .finish()
        .map_err(|err| encoding_error(format!("gzip finish failed: {err}")))
}

/// Strips the outer envelope of an archive, yielding the concatenated payloads.
pub fn decode_batch(archive: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(archive)
        .read_to_end(&mut out)
        .map_err(|err| encoding_error(format!("corrupt archive: {err}")))?;
    Ok(out)
}

/// Unwraps concatenated per-frame payloads back into their JPEG bytes.
pub fn decode_payloads(payloads: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    MultiGzDecoder::new(payloads)
        .read_to_end(&mut out)
        .map_err(|err| encoding_error(format!("corrupt frame payload: {err}")))?;
    Ok(out)
}

pub fn encoding_error(message: impl Into<String>) -> GlimpseError {
    GlimpseError::Encoding(message.into())
}
