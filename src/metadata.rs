//! Image metadata extraction.
//!
//! Metadata comes from two places:
//!
//! - **The container**: pixel dimensions, read by `image` without decoding
//!   the pixels. The format label is the subtype of the file's MIME type.
//! - **Embedded EXIF**: camera (make, model, focal length, aperture, ISO,
//!   exposure time), capture time (`DateTimeOriginal`) and GPS position,
//!   read with `kamadak-exif`. Images without EXIF simply have no camera or
//!   location; that is not an error.
//!
//! ## Failure
//!
//! Extraction is best effort. [`MetadataExtractor::extract`] fails only when
//! the dimensions cannot be read; malformed EXIF is logged and skipped, so
//! the container metadata survives. Callers that must not fail use
//! [`extract_or_minimal`], which degrades to zeroed dimensions with no
//! camera or location.
//!
//! ## Created time
//!
//! `created` is the EXIF capture time when present, otherwise the file's
//! last-modified time.

use crate::types::SourceFile;
use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("cannot read image dimensions: {0}")]
    Dimensions(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// MIME subtype, e.g. `jpeg`.
    pub format: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    /// Millimetres.
    pub focal_length: Option<f64>,
    /// F-number.
    pub aperture: Option<f64>,
    pub iso: Option<u32>,
    /// Seconds.
    pub exposure_time: Option<f64>,
}

impl CameraInfo {
    fn is_empty(&self) -> bool {
        *self == CameraInfo::default()
    }
}

/// Decimal degrees, positive north and east.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Metadata extraction collaborator.
pub trait MetadataExtractor: Sync {
    fn extract(&self, file: &SourceFile) -> Result<ImageMetadata, ExtractionError>;
}

/// Metadata that needs no parsing: zeroed dimensions, format, size and the
/// file's last-modified time.
pub fn minimal(file: &SourceFile) -> ImageMetadata {
    ImageMetadata {
        width: 0,
        height: 0,
        format: file.format_label().to_string(),
        size: file.size(),
        created: Some(file.last_modified),
        camera: None,
        location: None,
    }
}

/// Run `extractor`, degrading to [`minimal`] metadata on failure.
pub fn extract_or_minimal(
    extractor: &(impl MetadataExtractor + ?Sized),
    file: &SourceFile,
) -> ImageMetadata {
    extractor.extract(file).unwrap_or_else(|e| {
        tracing::warn!(file = %file.name, error = %e, "metadata extraction failed");
        minimal(file)
    })
}

/// One-line human summary: `1920×1080px • 2.40MB • JPEG • Canon EOS R5 • 50mm • f/1.8 • ISO 100`.
pub fn format_summary(metadata: &ImageMetadata) -> String {
    let mut parts = vec![
        format!("{}×{}px", metadata.width, metadata.height),
        format!("{:.2}MB", metadata.size as f64 / 1024.0 / 1024.0),
        metadata.format.to_uppercase(),
    ];
    if let Some(camera) = &metadata.camera {
        if let (Some(make), Some(model)) = (&camera.make, &camera.model) {
            parts.push(format!("{make} {model}"));
        }
        if let Some(focal) = camera.focal_length {
            parts.push(format!("{focal}mm"));
        }
        if let Some(aperture) = camera.aperture {
            parts.push(format!("f/{aperture}"));
        }
        if let Some(iso) = camera.iso {
            parts.push(format!("ISO {iso}"));
        }
    }
    parts.join(" • ")
}

/// Production extractor: `image` for dimensions, `kamadak-exif` for the rest.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifExtractor;

impl ExifExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, file: &SourceFile) -> Result<ImageMetadata, ExtractionError> {
        let (width, height) = image::ImageReader::new(Cursor::new(&file.bytes[..]))
            .with_guessed_format()
            .map_err(|e| ExtractionError::Dimensions(e.to_string()))?
            .into_dimensions()
            .map_err(|e| ExtractionError::Dimensions(e.to_string()))?;

        let mut metadata = ImageMetadata {
            width,
            height,
            ..minimal(file)
        };

        let exif = match Reader::new().read_from_container(&mut Cursor::new(&file.bytes[..])) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(metadata),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "ignoring malformed EXIF");
                return Ok(metadata);
            }
        };

        if let Some(taken) = exif
            .get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .and_then(|f| ascii(&f.value))
            .and_then(|s| parse_exif_datetime(&s))
        {
            metadata.created = Some(taken);
        }

        let camera = CameraInfo {
            make: exif.get_field(Tag::Make, In::PRIMARY).and_then(|f| ascii(&f.value)),
            model: exif.get_field(Tag::Model, In::PRIMARY).and_then(|f| ascii(&f.value)),
            focal_length: exif
                .get_field(Tag::FocalLength, In::PRIMARY)
                .and_then(|f| rational(&f.value, 0)),
            aperture: exif
                .get_field(Tag::FNumber, In::PRIMARY)
                .and_then(|f| rational(&f.value, 0)),
            iso: exif
                .get_field(Tag::PhotographicSensitivity, In::PRIMARY)
                .and_then(|f| f.value.get_uint(0)),
            exposure_time: exif
                .get_field(Tag::ExposureTime, In::PRIMARY)
                .and_then(|f| rational(&f.value, 0)),
        };
        metadata.camera = (!camera.is_empty()).then_some(camera);

        let coordinate = |value: Tag, reference: Tag, negative: &str| {
            let degrees = dms(&exif.get_field(value, In::PRIMARY)?.value)?;
            let sign = match exif.get_field(reference, In::PRIMARY).and_then(|f| ascii(&f.value)) {
                Some(r) if r.eq_ignore_ascii_case(negative) => -1.0,
                _ => 1.0,
            };
            Some(degrees * sign)
        };
        metadata.location = match (
            coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
            coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
        ) {
            (Some(latitude), Some(longitude)) => Some(GeoLocation {
                latitude,
                longitude,
            }),
            _ => None,
        };

        tracing::debug!(
            file = %file.name,
            width,
            height,
            camera = metadata.camera.is_some(),
            location = metadata.location.is_some(),
            "extracted metadata"
        );
        Ok(metadata)
    }
}

/// First ASCII string of an EXIF value, trimmed. Empty strings are `None`.
fn ascii(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(strings) => strings
            .first()
            .map(|s| String::from_utf8_lossy(s).trim_matches(['\0', ' ']).to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn rational(value: &Value, index: usize) -> Option<f64> {
    match value {
        Value::Rational(rationals) => rationals
            .get(index)
            .filter(|r| r.denom != 0)
            .map(|r| r.to_f64()),
        _ => None,
    }
}

/// Degrees/minutes/seconds triple to decimal degrees.
fn dms(value: &Value) -> Option<f64> {
    let d = rational(value, 0)?;
    let m = rational(value, 1).unwrap_or(0.0);
    let s = rational(value, 2).unwrap_or(0.0);
    Some(d + m / 60.0 + s / 3600.0)
}

/// EXIF timestamps look like `2024:05:17 14:03:22` and carry no zone; they
/// are taken as UTC.
fn parse_exif_datetime(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
