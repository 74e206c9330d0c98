//! Size-budgeted re-encoding.
//!
//! [`ImageCompressor`] downscales the image so its longest edge fits
//! `max_dimension`, encodes it in the target format, and while the output is
//! over `max_size_bytes` it first lowers JPEG quality in steps of 10 (down to
//! 10) and then shrinks the image by 20% per step. If the budget is never
//! met, the smallest encoding produced is returned.

use super::calculations::fit_longest_edge;
use super::params::{CompressionSettings, Quality, RasterOptions};
use super::rust_backend::encode_rgba;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use thiserror::Error;

const MIN_QUALITY: u32 = 10;
const QUALITY_STEP: u32 = 10;
const SHRINK_FACTOR: f32 = 0.8;
const MAX_ATTEMPTS: usize = 32;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("cannot decode input: {0}")]
    Decode(String),
    #[error("cannot encode output: {0}")]
    Encode(String),
    #[error("invalid compression settings: {0}")]
    InvalidSettings(String),
}

/// Compression collaborator: image bytes in, smaller image bytes out.
pub trait Compressor: Sync {
    fn compress(
        &self,
        bytes: &[u8],
        settings: &CompressionSettings,
    ) -> Result<Vec<u8>, CompressionError>;
}

/// Production compressor on top of the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCompressor;

impl ImageCompressor {
    pub fn new() -> Self {
        Self
    }
}

fn encode_at(
    img: &RgbaImage,
    settings: &CompressionSettings,
    quality: u32,
) -> Result<Vec<u8>, CompressionError> {
    let options = RasterOptions::new(settings.target_format, Quality::new(quality));
    encode_rgba(img, &options).map_err(|e| CompressionError::Encode(e.to_string()))
}

impl Compressor for ImageCompressor {
    fn compress(
        &self,
        bytes: &[u8],
        settings: &CompressionSettings,
    ) -> Result<Vec<u8>, CompressionError> {
        if settings.max_size_bytes == 0 {
            return Err(CompressionError::InvalidSettings(
                "max_size_bytes must be positive".into(),
            ));
        }
        if settings.max_dimension == 0 {
            return Err(CompressionError::InvalidSettings(
                "max_dimension must be positive".into(),
            ));
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CompressionError::Decode(e.to_string()))?
            .to_rgba8();
        let (w, h) = fit_longest_edge(decoded.dimensions(), settings.max_dimension);
        let mut current = if (w, h) == decoded.dimensions() {
            decoded
        } else {
            imageops::resize(&decoded, w, h, FilterType::Lanczos3)
        };

        let mut quality = settings.quality.value();
        let mut best = encode_at(&current, settings, quality)?;
        for _ in 0..MAX_ATTEMPTS {
            if best.len() as u64 <= settings.max_size_bytes {
                break;
            }
            if settings.target_format.is_lossy() && quality > MIN_QUALITY {
                quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
            } else {
                let (cw, ch) = current.dimensions();
                if cw <= 1 && ch <= 1 {
                    break;
                }
                let nw = ((cw as f32 * SHRINK_FACTOR) as u32).max(1);
                let nh = ((ch as f32 * SHRINK_FACTOR) as u32).max(1);
                current = imageops::resize(&current, nw, nh, FilterType::Lanczos3);
            }
            let attempt = encode_at(&current, settings, quality)?;
            tracing::debug!(
                bytes = attempt.len(),
                quality,
                width = current.width(),
                height = current.height(),
                "compression attempt"
            );
            if attempt.len() < best.len() {
                best = attempt;
            }
        }

        if best.len() as u64 > settings.max_size_bytes {
            tracing::warn!(
                bytes = best.len(),
                budget = settings.max_size_bytes,
                "size budget not reached, returning smallest encoding"
            );
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::RasterFormat;
    use crate::test_helpers::{decode_rgba, noisy_png, solid_png};

    fn settings(
        max_size_bytes: u64,
        max_dimension: u32,
        format: RasterFormat,
    ) -> CompressionSettings {
        CompressionSettings {
            max_size_bytes,
            max_dimension,
            quality: Quality::new(90),
            target_format: format,
        }
    }

    #[test]
    fn downscales_to_max_dimension() {
        let input = solid_png(400, 100, [10, 20, 30, 255]);
        let out = ImageCompressor::new()
            .compress(&input, &settings(10 * 1024 * 1024, 200, RasterFormat::Png))
            .unwrap();
        assert_eq!(decode_rgba(&out).dimensions(), (200, 50));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let input = solid_png(20, 10, [10, 20, 30, 255]);
        let out = ImageCompressor::new()
            .compress(&input, &settings(10 * 1024 * 1024, 1920, RasterFormat::Jpeg))
            .unwrap();
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
        assert_eq!(decode_rgba(&out).dimensions(), (20, 10));
    }

    #[test]
    fn meets_tight_budget() {
        let input = noisy_png(200, 200);
        let budget = 3000;
        let out = ImageCompressor::new()
            .compress(&input, &settings(budget, 1920, RasterFormat::Jpeg))
            .unwrap();
        assert!(out.len() as u64 <= budget, "got {} bytes", out.len());
    }

    #[test]
    fn lossless_formats_shrink_dimensions_instead() {
        let input = noisy_png(120, 120);
        let out = ImageCompressor::new()
            .compress(&input, &settings(8000, 1920, RasterFormat::Png))
            .unwrap();
        assert!(out.len() <= 8000);
        assert!(decode_rgba(&out).width() < 120);
    }

    #[test]
    fn undecodable_input_is_decode_error() {
        let err = ImageCompressor::new()
            .compress(b"nope", &CompressionSettings::default())
            .unwrap_err();
        assert!(matches!(err, CompressionError::Decode(_)));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let input = solid_png(2, 2, [0, 0, 0, 255]);
        let err = ImageCompressor::new()
            .compress(&input, &settings(0, 10, RasterFormat::Jpeg))
            .unwrap_err();
        assert!(matches!(err, CompressionError::InvalidSettings(_)));
    }
}
