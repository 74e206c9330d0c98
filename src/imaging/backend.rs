//! Drawing surface trait and shared types.
//!
//! The [`DrawingSurface`] trait is the seam between the editing flows and the
//! pixel work. A surface holds decoded images behind opaque
//! [`SurfaceHandle`]s and supports four primitives: load, apply an
//! operation, rasterize, dispose. Applying an operation never mutates the
//! source handle; it returns a new one, so a failed pipeline leaves nothing
//! half-applied.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust on top of the
//! `image` crate.

use super::params::RasterOptions;
use super::pipeline::SurfaceOp;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    /// The source could not be read or decoded.
    #[error("failed to load image: {0}")]
    Load(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown surface handle {0}")]
    UnknownHandle(u64),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("encoding failed: {0}")]
    Encode(String),
}

/// Opaque reference to an image held by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for drawing surfaces.
///
/// Handles stay valid until [`dispose`](Self::dispose)d. Callers own the
/// handles they receive and must dispose them, including on error paths.
pub trait DrawingSurface: Sync {
    /// Decode an image from a `data:` URI or a filesystem path.
    fn load_image(&self, uri: &str) -> Result<SurfaceHandle, BackendError>;

    /// Apply one operation, returning a handle to the result.
    fn apply_operation(
        &self,
        handle: SurfaceHandle,
        op: &SurfaceOp,
    ) -> Result<SurfaceHandle, BackendError>;

    /// Encode the image behind `handle`.
    fn rasterize(
        &self,
        handle: SurfaceHandle,
        options: &RasterOptions,
    ) -> Result<Vec<u8>, BackendError>;

    fn dimensions(&self, handle: SurfaceHandle) -> Result<Dimensions, BackendError>;

    /// Release the image behind `handle`. Unknown handles are ignored.
    fn dispose(&self, handle: SurfaceHandle);
}
