//! High-level image operations.
//!
//! These functions combine the pipeline and calculations with surface
//! execution. They load a base image, apply an ordered list of
//! [`SurfaceOp`]s and rasterize the result. Every handle they obtain is
//! disposed before they return, on success and on error alike.

use super::backend::{BackendError, DrawingSurface, SurfaceHandle};
use super::calculations::fit_within;
use super::data_uri;
use super::params::{ExportSettings, FilterParams, RasterFormat, RasterOptions, Transform};
use super::pipeline::SurfaceOp;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoded output of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedImage {
    pub bytes: Vec<u8>,
    pub format: RasterFormat,
    pub width: u32,
    pub height: u32,
}

impl RasterizedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// The image as a `data:` URI, suitable as a preview handle.
    pub fn to_data_uri(&self) -> String {
        data_uri::encode(self.mime_type(), &self.bytes)
    }
}

/// Apply the filter pipeline of `params` to the image at `base_uri`.
///
/// Neutral parameters produce an empty pipeline; the base image is then only
/// re-encoded.
pub fn apply(
    surface: &(impl DrawingSurface + ?Sized),
    base_uri: &str,
    params: &FilterParams,
    options: &RasterOptions,
) -> Result<RasterizedImage> {
    let ops: Vec<SurfaceOp> = params.pipeline().into_iter().map(SurfaceOp::from).collect();
    tracing::debug!(ops = ops.len(), "applying filter pipeline");
    render(surface, base_uri, &ops, options)
}

/// Apply one geometric transform to the image at `base_uri`.
pub fn apply_transform(
    surface: &(impl DrawingSurface + ?Sized),
    base_uri: &str,
    transform: &Transform,
    options: &RasterOptions,
) -> Result<RasterizedImage> {
    render(surface, base_uri, &[SurfaceOp::Transform(*transform)], options)
}

/// Rasterize the image at `uri` for export.
///
/// With `preserve_aspect_ratio` the image is scaled down uniformly to fit
/// `max_width` × `max_height`; without it the bounds are ignored.
pub fn export(
    surface: &(impl DrawingSurface + ?Sized),
    uri: &str,
    settings: &ExportSettings,
) -> Result<RasterizedImage> {
    let options = RasterOptions::new(settings.format, settings.quality);
    let base = surface.load_image(uri)?;
    let result = (|| {
        let dims = surface.dimensions(base)?;
        let source = (dims.width, dims.height);
        let target = if settings.preserve_aspect_ratio {
            fit_within(source, settings.max_width, settings.max_height)
        } else {
            source
        };
        if target == source {
            return finish(surface, base, &options);
        }
        tracing::debug!(from = ?source, to = ?target, "scaling for export");
        let scaled = surface.apply_operation(
            base,
            &Transform::Resize {
                width: target.0,
                height: target.1,
            }
            .into(),
        )?;
        let out = finish(surface, scaled, &options);
        surface.dispose(scaled);
        out
    })();
    surface.dispose(base);
    result
}

/// Load `uri`, apply `ops` in order and rasterize.
pub fn render(
    surface: &(impl DrawingSurface + ?Sized),
    uri: &str,
    ops: &[SurfaceOp],
    options: &RasterOptions,
) -> Result<RasterizedImage> {
    let mut current = surface.load_image(uri)?;
    for op in ops {
        tracing::debug!(?op, "surface operation");
        let next = surface.apply_operation(current, op);
        surface.dispose(current);
        current = next?;
    }
    let out = finish(surface, current, options);
    surface.dispose(current);
    out
}

fn finish(
    surface: &(impl DrawingSurface + ?Sized),
    handle: SurfaceHandle,
    options: &RasterOptions,
) -> Result<RasterizedImage> {
    let dims = surface.dimensions(handle)?;
    let bytes = surface.rasterize(handle, options)?;
    Ok(RasterizedImage {
        bytes,
        format: options.format,
        width: dims.width,
        height: dims.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockSurface, RecordedOp};
    use crate::imaging::params::{FilterKnob, Quality};
    use crate::imaging::pipeline::FilterOp;
    use crate::imaging::rust_backend::RustBackend;
    use crate::test_helpers::{decode_rgba, solid_png_uri};

    // =========================================================================
    // Pipeline execution (mock surface)
    // =========================================================================

    #[test]
    fn neutral_params_only_load_and_rasterize() {
        let surface = MockSurface::new();
        let out = apply(
            &surface,
            "data:base",
            &FilterParams::neutral(),
            &RasterOptions::png(),
        )
        .unwrap();
        assert_eq!(out.format, RasterFormat::Png);

        let ops = surface.get_operations();
        assert!(!ops.iter().any(|op| matches!(op, RecordedOp::Apply { .. })));
        assert_eq!(surface.live_handles(), 0);
    }

    #[test]
    fn ops_are_applied_in_pipeline_order() {
        let surface = MockSurface::new();
        let params = FilterParams::neutral()
            .with(FilterKnob::Contrast, 150)
            .with(FilterKnob::Brightness, 150);
        apply(&surface, "data:base", &params, &RasterOptions::png()).unwrap();

        let applied: Vec<SurfaceOp> = surface
            .get_operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Apply { op, .. } => Some(op),
                _ => None,
            })
            .collect();
        assert_eq!(
            applied,
            vec![
                FilterOp::Brightness(0.5).into(),
                FilterOp::Contrast(1.5).into()
            ]
        );
    }

    #[test]
    fn every_handle_is_disposed_after_success() {
        let surface = MockSurface::new();
        let params = FilterParams::neutral()
            .with(FilterKnob::Sepia, 40)
            .with(FilterKnob::Blur, 10)
            .with(FilterKnob::Vintage, 70);
        apply(&surface, "data:base", &params, &RasterOptions::png()).unwrap();
        assert_eq!(surface.live_handles(), 0);
    }

    #[test]
    fn load_failure_is_load_error_and_leaks_nothing() {
        let surface = MockSurface::fail_on("data:broken");
        let err = apply(
            &surface,
            "data:broken",
            &FilterParams::neutral().with(FilterKnob::Sepia, 10),
            &RasterOptions::png(),
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::Load(_)));
        assert_eq!(surface.live_handles(), 0);
    }

    #[test]
    fn export_without_bounds_does_not_resize() {
        let surface = MockSurface::new();
        let out = export(&surface, "data:base", &ExportSettings::default()).unwrap();
        assert_eq!((out.width, out.height), (8, 8));
        assert!(
            !surface
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Apply { .. }))
        );
    }

    #[test]
    fn export_scales_to_bounds_and_uses_quality() {
        let surface = MockSurface::new();
        let settings = ExportSettings {
            format: RasterFormat::Jpeg,
            quality: Quality::new(55),
            max_width: Some(4),
            max_height: None,
            preserve_aspect_ratio: true,
        };
        export(&surface, "data:base", &settings).unwrap();
        let ops = surface.get_operations();
        assert!(ops.contains(&RecordedOp::Apply {
            handle: 1,
            op: Transform::Resize {
                width: 4,
                height: 4
            }
            .into(),
        }));
        assert!(ops.iter().any(|op| matches!(
            op,
            RecordedOp::Rasterize {
                format: RasterFormat::Jpeg,
                quality: 55,
                ..
            }
        )));
        assert_eq!(surface.live_handles(), 0);
    }

    #[test]
    fn export_ignores_bounds_without_aspect_preservation() {
        let surface = MockSurface::new();
        let settings = ExportSettings {
            max_width: Some(2),
            max_height: Some(2),
            preserve_aspect_ratio: false,
            ..ExportSettings::default()
        };
        let out = export(&surface, "data:base", &settings).unwrap();
        assert_eq!((out.width, out.height), (8, 8));
    }

    // =========================================================================
    // Pixel results (real backend)
    // =========================================================================

    #[test]
    fn neutral_params_are_pixel_identical() {
        let backend = RustBackend::new();
        let uri = solid_png_uri(3, 2, [12, 200, 99, 255]);
        let out = apply(&backend, &uri, &FilterParams::neutral(), &RasterOptions::png()).unwrap();
        let img = decode_rgba(&out.bytes);
        assert!(img.pixels().all(|p| p.0 == [12, 200, 99, 255]));
    }

    #[test]
    fn brightness_runs_before_contrast() {
        let backend = RustBackend::new();
        let uri = solid_png_uri(1, 1, [60, 60, 60, 255]);
        let params = FilterParams::neutral()
            .with(FilterKnob::Contrast, 150)
            .with(FilterKnob::Brightness, 150);
        let out = apply(&backend, &uri, &params, &RasterOptions::png()).unwrap();
        assert_eq!(decode_rgba(&out.bytes).get_pixel(0, 0).0, [218, 218, 218, 255]);
        assert_eq!(backend.live_handles(), 0);
    }

    #[test]
    fn transform_output_reports_new_dimensions() {
        let backend = RustBackend::new();
        let uri = solid_png_uri(6, 3, [0, 0, 0, 255]);
        let out = apply_transform(
            &backend,
            &uri,
            &Transform::Rotate { quarter_turns: 1 },
            &RasterOptions::png(),
        )
        .unwrap();
        assert_eq!((out.width, out.height), (3, 6));
        assert!(out.to_data_uri().starts_with("data:image/png;base64,"));
    }
}
