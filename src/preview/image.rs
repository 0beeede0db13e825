//! Thumbnail transcoding

use crate::preview::{ImageTranscoder, PreviewError};
use ::image::codecs::jpeg::JpegEncoder;
use ::image::imageops::FilterType;
use ::image::{DynamicImage, GenericImageView};

/// Largest thumbnail blob the network accepts
pub const MAX_THUMBNAIL_BYTES: usize = 1_000_000;

/// Qualities tried in order until the encoded image fits the byte limit
const QUALITY_STEPS: [u8; 5] = [85, 75, 60, 45, 30];

/// Downsizes images and re-encodes them as baseline RGB JPEG
#[derive(Debug, Clone, Copy)]
pub struct JpegTranscoder {
    max_bytes: usize,
}

impl Default for JpegTranscoder {
    fn default() -> Self {
        Self {
            max_bytes: MAX_THUMBNAIL_BYTES,
        }
    }
}

impl JpegTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom byte limit
    pub fn with_limit(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl ImageTranscoder for JpegTranscoder {
    fn resize_to_jpeg(&self, bytes: &[u8], max_width: u32) -> Result<Vec<u8>, PreviewError> {
        let img = ::image::load_from_memory(bytes)?;
        let img = downsize(img, max_width);

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

        let mut last_size = 0;
        for quality in QUALITY_STEPS {
            let mut buf = Vec::new();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;

            if buf.len() <= self.max_bytes {
                tracing::debug!(
                    "Encoded {}x{} thumbnail at quality {} ({} bytes)",
                    rgb.width(),
                    rgb.height(),
                    quality,
                    buf.len()
                );
                return Ok(buf);
            }
            last_size = buf.len();
        }

        Err(PreviewError::TooLarge {
            size: last_size,
            limit: self.max_bytes,
        })
    }
}

/// Shrinks to `max_width` keeping the aspect ratio; never upscales
fn downsize(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width || max_width == 0 {
        return img;
    }

    let new_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
    img.resize_exact(max_width, new_height, FilterType::Triangle)
}
