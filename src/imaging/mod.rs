//! Image processing: filter pipeline, transforms, export, compression.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` / `ImageReader` |
//! | **Per-pixel filters** | [`calculations`] mapped with `rayon` |
//! | **Blur / sharpen** | `imageops::blur` / `imageops::unsharpen` |
//! | **Transforms** | `imageops` rotate, flip, crop, Lanczos3 resize |
//! | **Preview handles** | base64 `data:` URIs |
//! | **Compression** | re-encode with stepped quality and size budget |
//!
//! The module is split into:
//! - **Parameters**: Data structures describing image operations
//! - **Pipeline**: [`FilterParams`] compiled to an ordered `Vec<FilterOp>`
//! - **Calculations**: Pure per-pixel and dimension math (unit testable)
//! - **Backend**: [`DrawingSurface`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining pipeline + surface
//! - **Compression**: [`Compressor`] trait + [`ImageCompressor`]

pub mod backend;
pub mod calculations;
pub mod compression;
pub mod data_uri;
pub mod operations;
mod params;
pub mod pipeline;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, DrawingSurface, SurfaceHandle};
pub use compression::{CompressionError, Compressor, ImageCompressor};
pub use operations::{RasterizedImage, apply, apply_transform, export, render};
pub use params::{
    CompressionSettings, CropRect, ExportSettings, FilterKnob, FilterParams, FlipAxis, Quality,
    RasterFormat, RasterOptions, Transform,
};
pub use pipeline::{FilterOp, SurfaceOp};
pub use rust_backend::RustBackend;
