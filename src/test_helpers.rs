//! Shared test utilities for the photodesk test suite.
//!
//! Provides in-memory image fixtures (solid and noisy PNGs, JPEGs carrying
//! EXIF), mock collaborators for the store and batch flows, and lookup
//! helpers that panic with a readable message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut store = ImageStore::new();
//! let id = add_png(&mut store, "beach.png", 4, 4);
//! assert_eq!(names(&store.filtered_and_sorted_images()), vec!["beach.png"]);
//! ```

use chrono::{DateTime, TimeZone, Utc};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Mutex;

use crate::imaging::{CompressionError, CompressionSettings, Compressor};
use crate::metadata::{ExtractionError, ImageMetadata, MetadataExtractor, minimal};
use crate::store::{ImageRecord, ImageStore, Upload};
use crate::types::{ImageId, SourceFile};

// =========================================================================
// Image fixtures
// =========================================================================

/// PNG bytes of a `width`×`height` image filled with `rgba`.
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode_png(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

/// [`solid_png`] as a `data:` URI.
pub fn solid_png_uri(width: u32, height: u32, rgba: [u8; 4]) -> String {
    crate::imaging::data_uri::encode("image/png", &solid_png(width, height, rgba))
}

/// PNG bytes of deterministic pseudo-random opaque pixels. Noise does not
/// compress, which makes size budgets easy to exercise.
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_F491;
    let img = RgbaImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        };
        Rgba([next(), next(), next(), 255])
    });
    encode_png(img)
}

/// [`noisy_png`] as a `data:` URI.
pub fn noisy_png_uri(width: u32, height: u32) -> String {
    crate::imaging::data_uri::encode("image/png", &noisy_png(width, height))
}

/// Decode any supported encoding into RGBA pixels.
pub fn decode_rgba(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes)
        .expect("fixture bytes should decode")
        .to_rgba8()
}

fn encode_png(img: RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("PNG encoding should succeed");
    buf.into_inner()
}

/// JPEG bytes of a gray `width`×`height` image with `fields` embedded as an
/// EXIF APP1 segment right after the SOI marker.
pub fn jpeg_with_exif(width: u32, height: u32, fields: &[exif::Field]) -> Vec<u8> {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer
        .write(&mut tiff, false)
        .expect("EXIF serialization should succeed");
    jpeg_with_exif_payload(width, height, &tiff.into_inner())
}

/// JPEG bytes of a gray `width`×`height` image whose EXIF APP1 segment
/// carries `tiff` verbatim, well-formed or not.
pub fn jpeg_with_exif_payload(width: u32, height: u32, tiff: &[u8]) -> Vec<u8> {
    let mut jpeg = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([128, 128, 128]),
    ))
    .write_to(&mut jpeg, ImageFormat::Jpeg)
    .expect("JPEG encoding should succeed");
    let jpeg = jpeg.into_inner();

    let segment_len = u16::try_from(2 + 6 + tiff.len()).expect("EXIF segment too large");
    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Fixed timestamp used by fixtures: 2024-01-01T00:00:00Z.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// A source file stamped with [`fixed_time`], MIME sniffed from content.
pub fn source_file(name: &str, bytes: Vec<u8>) -> SourceFile {
    SourceFile::from_bytes(name, bytes, fixed_time())
}

// =========================================================================
// Mock collaborators
// =========================================================================

/// Extractor that returns [`minimal`] metadata with fixed dimensions, or
/// always fails.
pub struct MockExtractor {
    pub dimensions: Option<(u32, u32)>,
}

impl MockExtractor {
    pub fn ok(width: u32, height: u32) -> Self {
        Self {
            dimensions: Some((width, height)),
        }
    }

    pub fn failing() -> Self {
        Self { dimensions: None }
    }
}

impl MetadataExtractor for MockExtractor {
    fn extract(&self, file: &SourceFile) -> Result<ImageMetadata, ExtractionError> {
        let (width, height) = self
            .dimensions
            .ok_or_else(|| ExtractionError::Dimensions("mock failure".into()))?;
        Ok(ImageMetadata {
            width,
            height,
            ..minimal(file)
        })
    }
}

/// Compressor that returns the first `keep` bytes of its input and fails on
/// inputs registered with [`fail_on`](Self::fail_on). Records every call.
/// Uses Mutex (not RefCell) so it is Sync.
pub struct MockCompressor {
    pub keep: usize,
    pub failing_inputs: Vec<Vec<u8>>,
    pub calls: Mutex<Vec<usize>>,
}

impl MockCompressor {
    pub fn new(keep: usize) -> Self {
        Self {
            keep,
            failing_inputs: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(mut self, input: Vec<u8>) -> Self {
        self.failing_inputs.push(input);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Compressor for MockCompressor {
    fn compress(
        &self,
        input: &[u8],
        _settings: &CompressionSettings,
    ) -> Result<Vec<u8>, CompressionError> {
        self.calls.lock().unwrap().push(input.len());
        if self.failing_inputs.iter().any(|f| f == input) {
            return Err(CompressionError::Decode("mock failure".into()));
        }
        Ok(input[..self.keep.min(input.len())].to_vec())
    }
}

// =========================================================================
// Store fixtures
// =========================================================================

/// Add a solid PNG under `name` and return its id.
pub fn add_png(store: &mut ImageStore, name: &str, width: u32, height: u32) -> ImageId {
    let file = source_file(name, solid_png(width, height, [60, 60, 60, 255]));
    store
        .add_image(&MockExtractor::ok(width, height), Upload::new(file))
        .id
}

/// Add an upload with the given last-modified time and byte payload.
pub fn add_file(
    store: &mut ImageStore,
    name: &str,
    bytes: Vec<u8>,
    modified: DateTime<Utc>,
) -> ImageId {
    let file = SourceFile::from_bytes(name, bytes, modified);
    store
        .add_image(&MockExtractor::ok(1, 1), Upload::new(file))
        .id
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find an image by file name. Panics if not found.
pub fn find_image<'a>(store: &'a ImageStore, name: &str) -> &'a ImageRecord {
    store
        .images()
        .iter()
        .find(|r| r.file.name == name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = store.images().iter().map(|r| r.file.name.as_str()).collect();
            panic!("image '{name}' not found. Available: {names:?}")
        })
}

/// File names of a view, in view order.
pub fn names(records: &[&ImageRecord]) -> Vec<String> {
    records.iter().map(|r| r.file.name.clone()).collect()
}

/// History kinds of an image, in append order.
pub fn history_kinds(record: &ImageRecord) -> Vec<&'static str> {
    record
        .history
        .entries()
        .iter()
        .map(|e| e.kind.as_str())
        .collect()
}
