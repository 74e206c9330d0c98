//! Studio configuration.
//!
//! Handles loading, validating, and merging `photodesk.toml`. Stock defaults
//! are serialized to a TOML value and the user file is merged on top, so a
//! user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [search]
//! threshold = 0.7            # Minimum fuzzy-match similarity (0.0-1.0)
//!
//! [compression]
//! max_size_bytes = 1048576   # Size budget of compressed output
//! max_dimension = 1920       # Longest edge of compressed output
//! quality = 80               # Starting JPEG quality (1-100)
//! format = "jpeg"            # png | jpeg | webp
//!
//! [export]
//! format = "png"
//! quality = 92
//! preserve_aspect_ratio = true
//! # max_width = 2048
//! # max_height = 2048
//!
//! [stream]
//! steps = 10                 # Frames in the quality ladder (1-91)
//! chunk_size = 65536         # Bytes per progressive chunk
//!
//! [preview]
//! format = "png"             # Encoding of edited previews
//! quality = 90
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{CompressionSettings, ExportSettings, Quality, RasterFormat, RasterOptions};
use crate::progressive::{MAX_STEPS, StreamSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE: &str = "photodesk.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Studio configuration loaded from `photodesk.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    /// Gallery search settings.
    pub search: SearchConfig,
    /// Defaults of the compression flow and batch compress.
    pub compression: CompressionConfig,
    /// Defaults of the export flow.
    pub export: ExportConfig,
    /// Progressive streaming settings.
    pub stream: StreamConfig,
    /// How edited previews are encoded.
    pub preview: PreviewConfig,
}

impl StudioConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.search.threshold) {
            return Err(ConfigError::Validation(
                "search.threshold must be 0.0-1.0".into(),
            ));
        }
        for (key, quality) in [
            ("compression.quality", self.compression.quality),
            ("export.quality", self.export.quality),
            ("preview.quality", self.preview.quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.compression.max_size_bytes == 0 {
            return Err(ConfigError::Validation(
                "compression.max_size_bytes must be positive".into(),
            ));
        }
        if self.compression.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "compression.max_dimension must be positive".into(),
            ));
        }
        if self.export.max_width == Some(0) || self.export.max_height == Some(0) {
            return Err(ConfigError::Validation(
                "export.max_width and export.max_height must be positive".into(),
            ));
        }
        if self.stream.steps == 0 || self.stream.steps > MAX_STEPS {
            return Err(ConfigError::Validation(format!(
                "stream.steps must be 1-{MAX_STEPS}"
            )));
        }
        if self.stream.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "stream.chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn compression_settings(&self) -> CompressionSettings {
        CompressionSettings {
            max_size_bytes: self.compression.max_size_bytes,
            max_dimension: self.compression.max_dimension,
            quality: Quality::new(self.compression.quality),
            target_format: self.compression.format,
        }
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            format: self.export.format,
            quality: Quality::new(self.export.quality),
            max_width: self.export.max_width,
            max_height: self.export.max_height,
            preserve_aspect_ratio: self.export.preserve_aspect_ratio,
        }
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            steps: self.stream.steps,
            chunk_size: self.stream.chunk_size,
        }
    }

    pub fn preview_options(&self) -> RasterOptions {
        RasterOptions::new(self.preview.format, Quality::new(self.preview.quality))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Minimum similarity (0.0-1.0) for a record to match the query.
    pub threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { threshold: 0.7 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    pub max_size_bytes: u64,
    pub max_dimension: u32,
    pub quality: u32,
    pub format: RasterFormat,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 1024 * 1024,
            max_dimension: 1920,
            quality: 80,
            format: RasterFormat::Jpeg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub format: RasterFormat,
    pub quality: u32,
    pub preserve_aspect_ratio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: RasterFormat::Png,
            quality: 92,
            preserve_aspect_ratio: true,
            max_width: None,
            max_height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub steps: u32,
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        let stock = StreamSettings::default();
        Self {
            steps: stock.steps,
            chunk_size: stock.chunk_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub format: RasterFormat,
    pub quality: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            format: RasterFormat::Png,
            quality: 90,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StudioConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `photodesk.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<StudioConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StudioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `photodesk.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<StudioConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(dir = %dir.display(), "loaded configuration");
    Ok(config)
}

/// Returns a fully-commented stock `photodesk.toml` with all keys.
pub fn stock_config_toml() -> &'static str {
    r##"# photodesk configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Gallery search
# ---------------------------------------------------------------------------
[search]
# Minimum similarity (0.0-1.0) between the query and a file name or tag.
# 1.0 only keeps exact substring matches; lower values tolerate typos.
threshold = 0.7

# ---------------------------------------------------------------------------
# Compression
# ---------------------------------------------------------------------------
[compression]
# Output size budget in bytes. Quality is lowered, then the image is
# shrunk, until the output fits.
max_size_bytes = 1048576
# Longest edge of the output in pixels. Larger images are downscaled.
max_dimension = 1920
# Starting JPEG quality (1-100).
quality = 80
# Output format: png, jpeg or webp.
format = "jpeg"

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
format = "png"
quality = 92
# Scale down uniformly to fit max_width x max_height. When false the
# bounds are ignored.
preserve_aspect_ratio = true
# max_width = 2048
# max_height = 2048

# ---------------------------------------------------------------------------
# Progressive streaming
# ---------------------------------------------------------------------------
[stream]
# Frames in the quality ladder, evenly spaced from quality 10 to 100.
steps = 10
# Bytes delivered per progressive step.
chunk_size = 65536

# ---------------------------------------------------------------------------
# Previews
# ---------------------------------------------------------------------------
[preview]
# Encoding of previews produced by edits: png, jpeg or webp.
format = "png"
quality = 90
"##
}
