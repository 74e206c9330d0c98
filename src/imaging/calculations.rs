//! Pure calculation functions: per-pixel channel math and dimension math.
//!
//! All functions here are pure and testable without any I/O or images. The
//! backend maps them over pixel buffers; every function that produces a
//! channel value goes through [`clamp_channel`], so no operation can wrap
//! around 0 or 255.

use super::params::CropRect;

/// Rec. 601 luma weights.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// Round and clamp a channel value into `0..=255`.
#[inline]
pub fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Shift a channel by `offset * 255` (`offset` in `-1.0..=1.0`).
#[inline]
pub fn brightness(channel: u8, offset: f32) -> u8 {
    clamp_channel(f32::from(channel) + offset * 255.0)
}

/// Scale a channel's distance from mid-gray (128) by `factor`.
#[inline]
pub fn contrast(channel: u8, factor: f32) -> u8 {
    clamp_channel((f32::from(channel) - 128.0) * factor + 128.0)
}

/// Scale each channel's distance from the pixel's luma by `factor`.
/// `0.0` is grayscale, `1.0` is unchanged.
pub fn saturation(rgb: [u8; 3], factor: f32) -> [u8; 3] {
    let luma = luma(rgb);
    rgb.map(|c| clamp_channel(luma + (f32::from(c) - luma) * factor))
}

/// Blend a pixel towards its sepia tone by `amount` (`0.0..=1.0`).
pub fn sepia(rgb: [u8; 3], amount: f32) -> [u8; 3] {
    let [r, g, b] = rgb.map(f32::from);
    let toned = [
        r * 0.393 + g * 0.769 + b * 0.189,
        r * 0.349 + g * 0.686 + b * 0.168,
        r * 0.272 + g * 0.534 + b * 0.131,
    ];
    let amount = amount.clamp(0.0, 1.0);
    [
        clamp_channel(r * (1.0 - amount) + toned[0] * amount),
        clamp_channel(g * (1.0 - amount) + toned[1] * amount),
        clamp_channel(b * (1.0 - amount) + toned[2] * amount),
    ]
}

/// Add the same pseudo-random offset in `±amount/2` to all three channels.
///
/// The offset depends only on `index` (the pixel's position in the buffer),
/// so the result is deterministic and independent of evaluation order.
pub fn noise(rgb: [u8; 3], amount: f32, index: u64) -> [u8; 3] {
    let offset = (0.5 - unit_noise(index)) * amount;
    rgb.map(|c| clamp_channel(f32::from(c) + offset))
}

/// Add a fixed per-channel offset.
pub fn tint(rgb: [u8; 3], offset: [f32; 3]) -> [u8; 3] {
    [
        clamp_channel(f32::from(rgb[0]) + offset[0]),
        clamp_channel(f32::from(rgb[1]) + offset[1]),
        clamp_channel(f32::from(rgb[2]) + offset[2]),
    ]
}

/// Raise the blue channel of dark pixels (mean below 128) by `amount`.
pub fn shadow_tint(rgb: [u8; 3], amount: f32) -> [u8; 3] {
    let mean = (f32::from(rgb[0]) + f32::from(rgb[1]) + f32::from(rgb[2])) / 3.0;
    if mean < 128.0 {
        [rgb[0], rgb[1], clamp_channel(f32::from(rgb[2]) + amount)]
    } else {
        rgb
    }
}

/// Push the dominant channel(s) further by `(max - min) * intensity`.
pub fn vibrance(rgb: [u8; 3], intensity: f32) -> [u8; 3] {
    let max = rgb.iter().copied().max().unwrap_or(0);
    let min = rgb.iter().copied().min().unwrap_or(0);
    let delta = f32::from(max - min) * intensity;
    rgb.map(|c| {
        if c == max {
            clamp_channel(f32::from(c) + delta)
        } else {
            c
        }
    })
}

/// Multiplier applied to a pixel by a radial vignette.
///
/// Distance is measured from the pixel center to the image center and
/// normalised by the half-diagonal; the factor falls off quadratically and
/// reaches `1.0 - strength` in the corners.
pub fn vignette_factor(x: u32, y: u32, width: u32, height: u32, strength: f32) -> f32 {
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let half_diag = (cx * cx + cy * cy).sqrt();
    if half_diag == 0.0 {
        return 1.0;
    }
    let dx = x as f32 + 0.5 - cx;
    let dy = y as f32 + 0.5 - cy;
    let d = ((dx * dx + dy * dy).sqrt() / half_diag).min(1.0);
    (1.0 - strength.clamp(0.0, 1.0) * d * d).max(0.0)
}

#[inline]
fn luma(rgb: [u8; 3]) -> f32 {
    LUMA[0] * f32::from(rgb[0]) + LUMA[1] * f32::from(rgb[1]) + LUMA[2] * f32::from(rgb[2])
}

/// SplitMix64 mapped to `0.0..1.0`.
fn unit_noise(index: u64) -> f32 {
    let mut z = index.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 40) as f32 / (1u64 << 24) as f32
}

/// Scale `source` down to fit inside the optional bounds, keeping its
/// aspect ratio. Never upscales; each dimension is at least 1.
pub fn fit_within(source: (u32, u32), max_width: Option<u32>, max_height: Option<u32>) -> (u32, u32) {
    let (w, h) = source;
    if w == 0 || h == 0 {
        return source;
    }
    let sx = max_width.map_or(1.0, |m| m as f64 / w as f64);
    let sy = max_height.map_or(1.0, |m| m as f64 / h as f64);
    let scale = sx.min(sy).min(1.0);
    if scale >= 1.0 {
        return source;
    }
    (
        ((w as f64 * scale).round() as u32).max(1),
        ((h as f64 * scale).round() as u32).max(1),
    )
}

/// Scale `source` so its longer edge is at most `max_edge`.
pub fn fit_longest_edge(source: (u32, u32), max_edge: u32) -> (u32, u32) {
    fit_within(source, Some(max_edge), Some(max_edge))
}

/// Bounding box of a `width × height` image rotated by `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let rad = degrees.to_radians();
    let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
    let w = width as f32 * cos + height as f32 * sin;
    let h = width as f32 * sin + height as f32 * cos;
    // Shave float noise so 90° of 4×2 is 2×4, not 3×5.
    (
        ((w - 1e-3).ceil() as u32).max(1),
        ((h - 1e-3).ceil() as u32).max(1),
    )
}

/// Intersect a crop rectangle with the image bounds.
///
/// Returns `None` when the intersection is empty.
pub fn clamp_crop(rect: CropRect, width: u32, height: u32) -> Option<CropRect> {
    if rect.x >= width || rect.y >= height {
        return None;
    }
    let w = rect.width.min(width - rect.x);
    let h = rect.height.min(height - rect.y);
    (w > 0 && h > 0).then_some(CropRect {
        x: rect.x,
        y: rect.y,
        width: w,
        height: h,
    })
}
