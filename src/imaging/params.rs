//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the editing flows (which decide what to render) and the
//! [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`FilterParams`]: The per-image filter knobs. Clamped whenever set or deserialized.
//! - [`RasterOptions`]: Output format + quality for rasterizing a surface.
//! - [`CompressionSettings`] / [`ExportSettings`]: Inputs of the compression and export flows.
//! - [`Transform`]: Geometric edits (rotate, flip, crop, resize).

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(value: Quality) -> Self {
        value.0
    }
}

/// One named numeric control of [`FilterParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKnob {
    Brightness,
    Contrast,
    Saturation,
    Sepia,
    Blur,
    Sharpen,
    Noise,
    Vignette,
    Vintage,
    Dramatic,
    Vibrant,
}

impl FilterKnob {
    pub const ALL: [FilterKnob; 11] = [
        FilterKnob::Brightness,
        FilterKnob::Contrast,
        FilterKnob::Saturation,
        FilterKnob::Sepia,
        FilterKnob::Blur,
        FilterKnob::Sharpen,
        FilterKnob::Noise,
        FilterKnob::Vignette,
        FilterKnob::Vintage,
        FilterKnob::Dramatic,
        FilterKnob::Vibrant,
    ];

    /// Upper bound of the knob; every knob starts at 0.
    pub fn max(self) -> u8 {
        match self {
            FilterKnob::Brightness | FilterKnob::Contrast | FilterKnob::Saturation => 200,
            _ => 100,
        }
    }

    /// Value at which the knob is a no-op.
    pub fn neutral(self) -> u8 {
        match self {
            FilterKnob::Brightness | FilterKnob::Contrast | FilterKnob::Saturation => 100,
            _ => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterKnob::Brightness => "brightness",
            FilterKnob::Contrast => "contrast",
            FilterKnob::Saturation => "saturation",
            FilterKnob::Sepia => "sepia",
            FilterKnob::Blur => "blur",
            FilterKnob::Sharpen => "sharpen",
            FilterKnob::Noise => "noise",
            FilterKnob::Vignette => "vignette",
            FilterKnob::Vintage => "vintage",
            FilterKnob::Dramatic => "dramatic",
            FilterKnob::Vibrant => "vibrant",
        }
    }

    fn clamp(self, value: i64) -> u8 {
        value.clamp(0, i64::from(self.max())) as u8
    }
}

/// Filter knobs of one image.
///
/// Brightness, contrast and saturation range over 0–200 with 100 as neutral;
/// every other knob ranges over 0–100 with 0 as neutral. Values are clamped
/// by [`set`](Self::set), [`with`](Self::with) and on deserialization, so a
/// `FilterParams` is always in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFilterParams")]
pub struct FilterParams {
    brightness: u8,
    contrast: u8,
    saturation: u8,
    sepia: u8,
    blur: u8,
    sharpen: u8,
    noise: u8,
    vignette: u8,
    vintage: u8,
    dramatic: u8,
    vibrant: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    preset: Option<String>,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            brightness: 100,
            contrast: 100,
            saturation: 100,
            sepia: 0,
            blur: 0,
            sharpen: 0,
            noise: 0,
            vignette: 0,
            vintage: 0,
            dramatic: 0,
            vibrant: 0,
            preset: None,
        }
    }
}

impl FilterParams {
    /// All knobs neutral, no preset label.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn get(&self, knob: FilterKnob) -> u8 {
        match knob {
            FilterKnob::Brightness => self.brightness,
            FilterKnob::Contrast => self.contrast,
            FilterKnob::Saturation => self.saturation,
            FilterKnob::Sepia => self.sepia,
            FilterKnob::Blur => self.blur,
            FilterKnob::Sharpen => self.sharpen,
            FilterKnob::Noise => self.noise,
            FilterKnob::Vignette => self.vignette,
            FilterKnob::Vintage => self.vintage,
            FilterKnob::Dramatic => self.dramatic,
            FilterKnob::Vibrant => self.vibrant,
        }
    }

    /// Set a knob, clamping into its range. Returns the stored value.
    pub fn set(&mut self, knob: FilterKnob, value: i64) -> u8 {
        let value = knob.clamp(value);
        let slot = match knob {
            FilterKnob::Brightness => &mut self.brightness,
            FilterKnob::Contrast => &mut self.contrast,
            FilterKnob::Saturation => &mut self.saturation,
            FilterKnob::Sepia => &mut self.sepia,
            FilterKnob::Blur => &mut self.blur,
            FilterKnob::Sharpen => &mut self.sharpen,
            FilterKnob::Noise => &mut self.noise,
            FilterKnob::Vignette => &mut self.vignette,
            FilterKnob::Vintage => &mut self.vintage,
            FilterKnob::Dramatic => &mut self.dramatic,
            FilterKnob::Vibrant => &mut self.vibrant,
        };
        *slot = value;
        value
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, knob: FilterKnob, value: i64) -> Self {
        self.set(knob, value);
        self
    }

    pub fn preset(&self) -> Option<&str> {
        self.preset.as_deref()
    }

    pub fn with_preset(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.preset = (!label.is_empty()).then_some(label);
        self
    }

    /// True when every knob sits at its neutral value.
    pub fn is_neutral(&self) -> bool {
        FilterKnob::ALL.iter().all(|k| self.get(*k) == k.neutral())
    }

    /// Knobs that differ from neutral, in [`FilterKnob::ALL`] order.
    pub fn adjusted(&self) -> impl Iterator<Item = (FilterKnob, u8)> + '_ {
        FilterKnob::ALL
            .into_iter()
            .map(|k| (k, self.get(k)))
            .filter(|(k, v)| *v != k.neutral())
    }
}

/// Unvalidated wire form of [`FilterParams`]; missing knobs default to neutral.
#[derive(Deserialize)]
#[serde(default)]
struct RawFilterParams {
    brightness: i64,
    contrast: i64,
    saturation: i64,
    sepia: i64,
    blur: i64,
    sharpen: i64,
    noise: i64,
    vignette: i64,
    vintage: i64,
    dramatic: i64,
    vibrant: i64,
    preset: Option<String>,
}

impl Default for RawFilterParams {
    fn default() -> Self {
        Self {
            brightness: 100,
            contrast: 100,
            saturation: 100,
            sepia: 0,
            blur: 0,
            sharpen: 0,
            noise: 0,
            vignette: 0,
            vintage: 0,
            dramatic: 0,
            vibrant: 0,
            preset: None,
        }
    }
}

impl From<RawFilterParams> for FilterParams {
    fn from(raw: RawFilterParams) -> Self {
        let params = FilterParams::neutral()
            .with(FilterKnob::Brightness, raw.brightness)
            .with(FilterKnob::Contrast, raw.contrast)
            .with(FilterKnob::Saturation, raw.saturation)
            .with(FilterKnob::Sepia, raw.sepia)
            .with(FilterKnob::Blur, raw.blur)
            .with(FilterKnob::Sharpen, raw.sharpen)
            .with(FilterKnob::Noise, raw.noise)
            .with(FilterKnob::Vignette, raw.vignette)
            .with(FilterKnob::Vintage, raw.vintage)
            .with(FilterKnob::Dramatic, raw.dramatic)
            .with(FilterKnob::Vibrant, raw.vibrant);
        match raw.preset {
            Some(label) => params.with_preset(label),
            None => params,
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg,
    /// Lossless WebP; quality is ignored.
    Webp,
}

impl RasterFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Webp => "image/webp",
        }
    }

    /// Lowercase format name, as used in config files.
    pub fn name(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpeg",
            RasterFormat::Webp => "webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Webp => "webp",
        }
    }

    /// Whether [`Quality`] has any effect on the encoded bytes.
    pub fn is_lossy(self) -> bool {
        matches!(self, RasterFormat::Jpeg)
    }
}

/// How to rasterize a surface into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RasterOptions {
    pub format: RasterFormat,
    pub quality: Quality,
}

impl RasterOptions {
    pub fn new(format: RasterFormat, quality: Quality) -> Self {
        Self { format, quality }
    }

    pub fn png() -> Self {
        Self::new(RasterFormat::Png, Quality::default())
    }
}

/// Input of the compression collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    /// Size budget of the output in bytes.
    pub max_size_bytes: u64,
    /// Longest edge of the output in pixels; larger images are downscaled.
    pub max_dimension: u32,
    pub quality: Quality,
    pub target_format: RasterFormat,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_size_bytes: 1024 * 1024,
            max_dimension: 1920,
            quality: Quality::new(80),
            target_format: RasterFormat::Jpeg,
        }
    }
}

/// Input of the export flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub format: RasterFormat,
    pub quality: Quality,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Scale uniformly to fit the bounds; otherwise bounds are ignored.
    pub preserve_aspect_ratio: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: RasterFormat::Png,
            quality: Quality::new(92),
            max_width: None,
            max_height: None,
            preserve_aspect_ratio: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Crop rectangle in pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Geometric edit of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Transform {
    /// Rotate clockwise by a number of quarter turns (negative = counterclockwise).
    Rotate { quarter_turns: i32 },
    /// Rotate clockwise by an arbitrary angle in degrees; the canvas grows to fit.
    CustomRotate { degrees: f32 },
    Flip { axis: FlipAxis },
    Crop { rect: CropRect },
    Resize { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn quality_deserializes_clamped() {
        let q: Quality = serde_json::from_str("400").unwrap();
        assert_eq!(q.value(), 100);
    }

    #[test]
    fn default_params_are_neutral() {
        let params = FilterParams::default();
        assert!(params.is_neutral());
        assert_eq!(params.get(FilterKnob::Brightness), 100);
        assert_eq!(params.get(FilterKnob::Noise), 0);
        assert_eq!(params.adjusted().count(), 0);
    }

    #[test]
    fn set_clamps_into_knob_range() {
        let mut params = FilterParams::default();
        assert_eq!(params.set(FilterKnob::Brightness, 250), 200);
        assert_eq!(params.set(FilterKnob::Contrast, -5), 0);
        assert_eq!(params.set(FilterKnob::Sepia, 150), 100);
        assert_eq!(params.get(FilterKnob::Sepia), 100);
    }

    #[test]
    fn adjusted_lists_only_non_neutral_knobs() {
        let params = FilterParams::neutral()
            .with(FilterKnob::Contrast, 120)
            .with(FilterKnob::Blur, 5);
        let adjusted: Vec<_> = params.adjusted().collect();
        assert_eq!(
            adjusted,
            vec![(FilterKnob::Contrast, 120), (FilterKnob::Blur, 5)]
        );
        assert!(!params.is_neutral());
    }

    #[test]
    fn deserialize_clamps_and_defaults_missing_knobs() {
        let params: FilterParams =
            serde_json::from_str(r#"{"brightness": 999, "noise": -3, "preset": "mine"}"#).unwrap();
        assert_eq!(params.get(FilterKnob::Brightness), 200);
        assert_eq!(params.get(FilterKnob::Noise), 0);
        assert_eq!(params.get(FilterKnob::Contrast), 100);
        assert_eq!(params.preset(), Some("mine"));
    }

    #[test]
    fn empty_preset_label_is_none() {
        let params = FilterParams::neutral().with_preset("");
        assert_eq!(params.preset(), None);
    }

    #[test]
    fn transform_serializes_tagged() {
        let json = serde_json::to_value(Transform::Flip {
            axis: FlipAxis::Horizontal,
        })
        .unwrap();
        assert_eq!(json["op"], "flip");
        assert_eq!(json["axis"], "horizontal");
    }

    #[test]
    fn only_jpeg_is_lossy() {
        assert!(RasterFormat::Jpeg.is_lossy());
        assert!(!RasterFormat::Png.is_lossy());
        assert!(!RasterFormat::Webp.is_lossy());
    }
}
