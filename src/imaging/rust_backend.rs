//! Pure Rust drawing surface.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image::load_from_memory` / `ImageReader` |
//! | Per-pixel filters | [`calculations`](super::calculations), mapped with `rayon` |
//! | Blur | `image::imageops::blur` (Gaussian) |
//! | Sharpen | `image::imageops::unsharpen` |
//! | Rotate / flip / crop / resize | `image::imageops` (Lanczos3 for resize) |
//! | Encode | `PngEncoder`, `JpegEncoder` (quality), `WebPEncoder` (lossless) |
//!
//! Images are held as RGBA8 behind `Arc`s so applying an operation can read
//! the source without holding the handle table lock.

use super::backend::{BackendError, Dimensions, DrawingSurface, SurfaceHandle};
use super::calculations::{self, clamp_crop, rotated_bounds};
use super::data_uri;
use super::params::{FlipAxis, RasterFormat, RasterOptions, Transform};
use super::pipeline::{FilterOp, SurfaceOp};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Pure Rust surface using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Default)]
pub struct RustBackend {
    images: Mutex<HashMap<u64, Arc<RgbaImage>>>,
    next: AtomicU64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles not yet disposed.
    pub fn live_handles(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<u64, Arc<RgbaImage>>> {
        // A panic while holding the lock cannot leave the map half-updated,
        // so a poisoned lock is still usable.
        self.images.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, img: RgbaImage) -> SurfaceHandle {
        let id = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        self.table().insert(id, Arc::new(img));
        SurfaceHandle(id)
    }

    fn get(&self, handle: SurfaceHandle) -> Result<Arc<RgbaImage>, BackendError> {
        self.table()
            .get(&handle.0)
            .cloned()
            .ok_or(BackendError::UnknownHandle(handle.0))
    }
}

/// Decode an image from a data URI or a path on disk.
fn decode(uri: &str) -> Result<RgbaImage, BackendError> {
    let img = if data_uri::is_data_uri(uri) {
        let (_, bytes) = data_uri::decode(uri).map_err(|e| BackendError::Load(e.to_string()))?;
        image::load_from_memory(&bytes).map_err(|e| BackendError::Load(e.to_string()))?
    } else {
        let path = Path::new(uri);
        ImageReader::open(path)
            .map_err(|e| BackendError::Load(format!("{}: {e}", path.display())))?
            .with_guessed_format()?
            .decode()
            .map_err(|e| BackendError::Load(format!("{}: {e}", path.display())))?
    };
    Ok(img.to_rgba8())
}

/// Map an RGB function over every pixel in parallel. Alpha is preserved.
///
/// The closure receives the pixel index (row-major) so position-dependent
/// ops stay deterministic under parallel evaluation.
fn map_pixels(img: &RgbaImage, f: impl Fn(usize, [u8; 3]) -> [u8; 3] + Sync) -> RgbaImage {
    let mut out = img.clone();
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(4).enumerate().for_each(|(i, px)| {
        let rgb = f(i, [px[0], px[1], px[2]]);
        px[..3].copy_from_slice(&rgb);
    });
    out
}

fn apply_filter(img: &RgbaImage, op: &FilterOp) -> RgbaImage {
    match *op {
        FilterOp::Brightness(offset) => {
            map_pixels(img, |_, rgb| rgb.map(|c| calculations::brightness(c, offset)))
        }
        FilterOp::Contrast(factor) => {
            map_pixels(img, |_, rgb| rgb.map(|c| calculations::contrast(c, factor)))
        }
        FilterOp::Saturation(factor) => {
            map_pixels(img, |_, rgb| calculations::saturation(rgb, factor))
        }
        FilterOp::Sepia(amount) => map_pixels(img, |_, rgb| calculations::sepia(rgb, amount)),
        FilterOp::Blur(sigma) if sigma > 0.0 => imageops::blur(img, sigma),
        FilterOp::Sharpen(sigma) if sigma > 0.0 => imageops::unsharpen(img, sigma, 0),
        FilterOp::Blur(_) | FilterOp::Sharpen(_) => img.clone(),
        FilterOp::Noise(amount) => {
            map_pixels(img, |i, rgb| calculations::noise(rgb, amount, i as u64))
        }
        FilterOp::Vignette(strength) => {
            let (w, h) = img.dimensions();
            map_pixels(img, |i, rgb| {
                let x = (i % w as usize) as u32;
                let y = (i / w as usize) as u32;
                let factor = calculations::vignette_factor(x, y, w, h, strength);
                rgb.map(|c| calculations::clamp_channel(f32::from(c) * factor))
            })
        }
        FilterOp::Tint(offset) => map_pixels(img, |_, rgb| calculations::tint(rgb, offset)),
        FilterOp::ShadowTint(amount) => {
            map_pixels(img, |_, rgb| calculations::shadow_tint(rgb, amount))
        }
        FilterOp::Vibrance(intensity) => {
            map_pixels(img, |_, rgb| calculations::vibrance(rgb, intensity))
        }
        FilterOp::PresetVintage(_) | FilterOp::PresetDramatic(_) | FilterOp::PresetVibrant(_) => {
            op.expand()
                .iter()
                .fold(img.clone(), |acc, primitive| apply_filter(&acc, primitive))
        }
    }
}

fn apply_transform(img: &RgbaImage, transform: &Transform) -> Result<RgbaImage, BackendError> {
    let out = match *transform {
        Transform::Rotate { quarter_turns } => match quarter_turns.rem_euclid(4) {
            1 => imageops::rotate90(img),
            2 => imageops::rotate180(img),
            3 => imageops::rotate270(img),
            _ => img.clone(),
        },
        Transform::CustomRotate { degrees } => {
            let normalized = degrees.rem_euclid(360.0);
            if normalized % 90.0 == 0.0 {
                return apply_transform(
                    img,
                    &Transform::Rotate {
                        quarter_turns: (normalized / 90.0) as i32,
                    },
                );
            }
            rotate_arbitrary(img, normalized)
        }
        Transform::Flip {
            axis: FlipAxis::Horizontal,
        } => imageops::flip_horizontal(img),
        Transform::Flip {
            axis: FlipAxis::Vertical,
        } => imageops::flip_vertical(img),
        Transform::Crop { rect } => {
            let (w, h) = img.dimensions();
            let rect = clamp_crop(rect, w, h).ok_or_else(|| {
                BackendError::InvalidOperation(format!(
                    "crop {}x{}+{}+{} is outside a {w}x{h} image",
                    rect.width, rect.height, rect.x, rect.y
                ))
            })?;
            imageops::crop_imm(img, rect.x, rect.y, rect.width, rect.height).to_image()
        }
        Transform::Resize { width, height } => {
            if width == 0 || height == 0 {
                return Err(BackendError::InvalidOperation(format!(
                    "cannot resize to {width}x{height}"
                )));
            }
            imageops::resize(img, width, height, FilterType::Lanczos3)
        }
    };
    Ok(out)
}

/// Rotate clockwise by `degrees` onto a canvas that fits the result.
/// Uncovered corners are transparent; sampling is nearest-neighbour.
fn rotate_arbitrary(img: &RgbaImage, degrees: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let (out_w, out_h) = rotated_bounds(w, h, degrees);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let (ox, oy) = (out_w as f32 / 2.0, out_h as f32 / 2.0);
    RgbaImage::from_fn(out_w, out_h, |x, y| {
        let dx = x as f32 + 0.5 - ox;
        let dy = y as f32 + 0.5 - oy;
        // Inverse rotation back into source space.
        let sx = dx * cos + dy * sin + cx;
        let sy = -dx * sin + dy * cos + cy;
        if sx >= 0.0 && sy >= 0.0 && (sx as u32) < w && (sy as u32) < h {
            *img.get_pixel(sx as u32, sy as u32)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Encode an RGBA buffer. Shared with the compressor.
pub(crate) fn encode_rgba(
    img: &RgbaImage,
    options: &RasterOptions,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match options.format {
        RasterFormat::Png => DynamicImage::ImageRgba8(img.clone())
            .write_with_encoder(image::codecs::png::PngEncoder::new(&mut buf)),
        RasterFormat::Jpeg => {
            // JPEG has no alpha channel.
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut buf,
                options.quality.value() as u8,
            );
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img.clone()).to_rgb8())
                .write_with_encoder(encoder)
        }
        RasterFormat::Webp => DynamicImage::ImageRgba8(img.clone())
            .write_with_encoder(image::codecs::webp::WebPEncoder::new_lossless(&mut buf)),
    };
    result.map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(buf)
}

impl DrawingSurface for RustBackend {
    fn load_image(&self, uri: &str) -> Result<SurfaceHandle, BackendError> {
        let img = decode(uri)?;
        let handle = self.insert(img);
        tracing::debug!(handle = handle.0, "loaded image onto surface");
        Ok(handle)
    }

    fn apply_operation(
        &self,
        handle: SurfaceHandle,
        op: &SurfaceOp,
    ) -> Result<SurfaceHandle, BackendError> {
        let source = self.get(handle)?;
        let out = match op {
            SurfaceOp::Filter(filter) => apply_filter(&source, filter),
            SurfaceOp::Transform(transform) => apply_transform(&source, transform)?,
        };
        Ok(self.insert(out))
    }

    fn rasterize(
        &self,
        handle: SurfaceHandle,
        options: &RasterOptions,
    ) -> Result<Vec<u8>, BackendError> {
        let source = self.get(handle)?;
        encode_rgba(&source, options)
    }

    fn dimensions(&self, handle: SurfaceHandle) -> Result<Dimensions, BackendError> {
        let source = self.get(handle)?;
        Ok(Dimensions {
            width: source.width(),
            height: source.height(),
        })
    }

    fn dispose(&self, handle: SurfaceHandle) {
        self.table().remove(&handle.0);
    }
}
