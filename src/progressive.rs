//! Progressive streaming.
//!
//! Two views of "loading an image a piece at a time":
//!
//! - [`ProgressiveStream`] splits encoded bytes into fixed-size chunks and
//!   steps through growing prefixes of them, the way a slow connection
//!   would deliver the file.
//! - [`quality_ladder`] renders the same image as JPEG at evenly spaced
//!   qualities from 10 to 100, one frame per step.

use crate::imaging::{BackendError, DrawingSurface, Quality, RasterFormat, RasterOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Settings of a streaming run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Number of quality frames.
    pub steps: u32,
    /// Chunk size in bytes.
    pub chunk_size: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            steps: 10,
            chunk_size: 64 * 1024,
        }
    }
}

/// Stepper over growing prefixes of a byte buffer.
#[derive(Debug, Clone)]
pub struct ProgressiveStream {
    bytes: Arc<[u8]>,
    chunk_size: usize,
    step: usize,
}

impl ProgressiveStream {
    /// Start at the first chunk. A zero chunk size is treated as one byte.
    pub fn new(bytes: impl Into<Arc<[u8]>>, chunk_size: usize) -> Self {
        Self {
            bytes: bytes.into(),
            chunk_size: chunk_size.max(1),
            step: 0,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.bytes.len().div_ceil(self.chunk_size)
    }

    /// Index of the last loaded chunk.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Load one more chunk. Returns false at the end.
    pub fn step_forward(&mut self) -> bool {
        if self.step + 1 < self.chunk_count() {
            self.step += 1;
            true
        } else {
            false
        }
    }

    /// Drop the last chunk. Returns false at the first chunk.
    pub fn step_back(&mut self) -> bool {
        if self.step > 0 {
            self.step -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Bytes loaded so far.
    pub fn current(&self) -> &[u8] {
        let end = ((self.step + 1) * self.chunk_size).min(self.bytes.len());
        &self.bytes[..end]
    }

    /// Fraction of the chunks loaded, `0.0..=1.0`. An empty buffer is
    /// complete.
    pub fn progress(&self) -> f64 {
        match self.chunk_count() {
            0 => 1.0,
            n => (self.step + 1) as f64 / n as f64,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current().len() == self.bytes.len()
    }
}

/// Most frames a ladder can hold: one per distinct quality in `10..=100`.
pub const MAX_STEPS: u32 = 91;

/// Qualities of a `steps`-frame ladder, evenly spaced from 10 to 100.
/// `steps` is capped at [`MAX_STEPS`].
pub fn quality_levels(steps: u32) -> Vec<u32> {
    match steps.min(MAX_STEPS) {
        0 => Vec::new(),
        1 => vec![100],
        n => (0..n).map(|i| 10 + 90 * i / (n - 1)).collect(),
    }
}

/// One rendered frame of a ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub quality: Quality,
    pub bytes: Vec<u8>,
}

/// Render the image at `uri` as JPEG once per quality level.
pub fn quality_ladder(
    surface: &(impl DrawingSurface + ?Sized),
    uri: &str,
    steps: u32,
) -> Result<Vec<StreamFrame>, BackendError> {
    let handle = surface.load_image(uri)?;
    let frames = quality_levels(steps)
        .into_iter()
        .map(|q| {
            let quality = Quality::new(q);
            let bytes = surface.rasterize(handle, &RasterOptions::new(RasterFormat::Jpeg, quality))?;
            tracing::debug!(quality = q, bytes = bytes.len(), "stream frame");
            Ok(StreamFrame { quality, bytes })
        })
        .collect();
    surface.dispose(handle);
    frames
}
