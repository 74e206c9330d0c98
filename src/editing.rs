//! Single-image editing flows.
//!
//! Each flow ties the store to one collaborator: it reads the record, runs
//! the drawing surface or the compressor, then writes the result back and
//! appends exactly one history entry. Nothing is written until the
//! collaborator has succeeded, so on error the record is exactly as it was.
//!
//! | Flow | Entry kind | Effect on the record |
//! |------|------------|----------------------|
//! | [`apply_filters`] | `filter` | new preview and filter knobs |
//! | [`apply_preset`] | `preset` | new preview, knobs labelled with the preset |
//! | [`transform`] | `rotate` `customRotate` `flip` `crop` `edit` | new preview and dimensions |
//! | [`compress_image`] | `compress` | current preview re-encoded as the new file and preview |
//! | [`export_image`] | none | none |
//! | [`record_annotation`] | `annotation` `shape` `text` `save` | none |
//! | [`undo`] / [`redo`] / [`clear_history`] | `undo` `redo` `clear` | none |
//!
//! Filters and transforms render from the current preview, so repeated
//! edits compound. Undo and redo are command-log entries only; they never
//! restore pixels.

use crate::history::{ActionKind, EditAction, NewAction, params_from};
use crate::imaging::{
    self, BackendError, CompressionError, CompressionSettings, Compressor, DrawingSurface,
    ExportSettings, FilterParams, FlipAxis, Transform, data_uri,
};
use crate::store::{ImageStore, ImageUpdate};
use crate::types::{ImageId, SourceFile};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("image {0} not found")]
    NotFound(ImageId),
    #[error("unknown filter preset '{0}'")]
    UnknownPreset(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
}

/// A computed edit waiting to be written back.
#[derive(Debug)]
pub(crate) struct Change {
    pub update: ImageUpdate,
    pub action: NewAction,
}

/// An annotation made on the editing canvas. Only the log records it; the
/// pixels are owned by the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "camelCase")]
pub enum Annotation {
    Freehand { color: String, brush_size: u32 },
    Shape { shape: ShapeKind, color: String },
    Text { text: String },
    /// The canvas state was saved.
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Circle,
}

/// Output of [`export_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    /// `<stem>_edited.<format>`.
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

// =============================================================================
// Pixel flows
// =============================================================================

/// Render `params` over the current preview and store them as the image's
/// filters.
pub fn apply_filters(
    store: &mut ImageStore,
    surface: &(impl DrawingSurface + ?Sized),
    id: &ImageId,
    params: FilterParams,
) -> Result<EditAction, EditError> {
    let change = filter_change(store, surface, id, &params)?;
    commit(store, id, change)
}

/// Apply a registered preset.
pub fn apply_preset(
    store: &mut ImageStore,
    surface: &(impl DrawingSurface + ?Sized),
    id: &ImageId,
    preset_id: &str,
) -> Result<EditAction, EditError> {
    let preset = store
        .filter_preset(preset_id)
        .ok_or_else(|| EditError::UnknownPreset(preset_id.to_string()))?;
    let (name, params) = (preset.name.clone(), preset.labelled_filters());
    let mut change = filter_change(store, surface, id, &params)?;
    change.action = NewAction::new(ActionKind::Preset, format!("Applied {name} preset"))
        .with_param("preset", preset_id)
        .with_params(change.action.params);
    commit(store, id, change)
}

/// Apply a geometric transform to the current preview.
pub fn transform(
    store: &mut ImageStore,
    surface: &(impl DrawingSurface + ?Sized),
    id: &ImageId,
    transform: Transform,
) -> Result<EditAction, EditError> {
    let record = store
        .image(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;
    let options = store.config().preview_options();
    let out = imaging::apply_transform(surface, &record.preview, &transform, &options)?;

    let mut update = ImageUpdate::new().preview(out.to_data_uri());
    if let Some(mut metadata) = record.metadata.clone() {
        metadata.width = out.width;
        metadata.height = out.height;
        update = update.metadata(Some(metadata));
    }
    let (kind, description) = describe_transform(&transform);
    let action = NewAction::new(kind, description).with_params(params_from(&transform));
    commit(store, id, Change { update, action })
}

fn describe_transform(transform: &Transform) -> (ActionKind, String) {
    match *transform {
        Transform::Rotate { quarter_turns } => {
            let direction = if quarter_turns < 0 {
                "counterclockwise"
            } else {
                "clockwise"
            };
            (ActionKind::Rotate, format!("Rotated image {direction}"))
        }
        Transform::CustomRotate { degrees } => (
            ActionKind::CustomRotate,
            format!("Custom rotation by {degrees}°"),
        ),
        Transform::Flip { axis } => {
            let axis = match axis {
                FlipAxis::Horizontal => "horizontal",
                FlipAxis::Vertical => "vertical",
            };
            (ActionKind::Flip, format!("Flipped image {axis}"))
        }
        Transform::Crop { .. } => (ActionKind::Crop, "Cropped image".to_string()),
        Transform::Resize { width, height } => (
            ActionKind::Edit,
            format!("Resized image to {width}×{height}"),
        ),
    }
}

/// Replace the image's file with a compressed version.
///
/// The file keeps its name; bytes, size and MIME type follow the
/// compressor's output. The entry records both sizes.
pub fn compress_image(
    store: &mut ImageStore,
    compressor: &(impl Compressor + ?Sized),
    id: &ImageId,
    settings: &CompressionSettings,
) -> Result<EditAction, EditError> {
    let change = compress_change(store, compressor, id, settings)?;
    commit(store, id, change)
}

/// Rasterize the current preview for download. The record is not touched.
pub fn export_image(
    store: &ImageStore,
    surface: &(impl DrawingSurface + ?Sized),
    id: &ImageId,
    settings: &ExportSettings,
) -> Result<ExportedImage, EditError> {
    let record = store
        .image(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;
    let out = imaging::export(surface, &record.preview, settings)?;
    tracing::debug!(%id, bytes = out.bytes.len(), "exported image");
    Ok(ExportedImage {
        file_name: format!("{}_edited.{}", record.file.stem(), settings.format.name()),
        mime_type: out.mime_type().to_string(),
        width: out.width,
        height: out.height,
        bytes: out.bytes,
    })
}

// =============================================================================
// Log-only flows
// =============================================================================

pub fn record_annotation(
    store: &mut ImageStore,
    id: &ImageId,
    annotation: &Annotation,
) -> Result<EditAction, EditError> {
    let (kind, description) = match annotation {
        Annotation::Freehand { .. } => (
            ActionKind::Annotation,
            "Modified freehand annotation".to_string(),
        ),
        Annotation::Shape { shape, .. } => {
            let shape = match shape {
                ShapeKind::Rect => "rectangle",
                ShapeKind::Circle => "circle",
            };
            (ActionKind::Shape, format!("Added {shape} shape"))
        }
        Annotation::Text { .. } => (ActionKind::Text, "Added text".to_string()),
        Annotation::Save => (ActionKind::Save, "Saved canvas state".to_string()),
    };
    let action = NewAction::new(kind, description).with_params(params_from(annotation));
    append(store, id, action)
}

/// Log an undo of the most recent action still in force.
pub fn undo(store: &mut ImageStore, id: &ImageId) -> Result<EditAction, EditError> {
    let record = store
        .image(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;
    let target = record
        .history
        .undo_target()
        .ok_or(EditError::NothingToUndo)?;
    let action = NewAction::new(ActionKind::Undo, "Undo action")
        .referencing(target.id.clone())
        .with_param("target", target.description.clone());
    append(store, id, action)
}

/// Log a redo of the most recently undone action.
pub fn redo(store: &mut ImageStore, id: &ImageId) -> Result<EditAction, EditError> {
    let record = store
        .image(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;
    let target = record
        .history
        .redo_target()
        .ok_or(EditError::NothingToRedo)?;
    let action = NewAction::new(ActionKind::Redo, "Redo action")
        .referencing(target.id.clone())
        .with_param("target", target.description.clone());
    append(store, id, action)
}

/// Log a clear. Earlier entries drop out of the visible history.
pub fn clear_history(store: &mut ImageStore, id: &ImageId) -> Result<EditAction, EditError> {
    append(store, id, NewAction::new(ActionKind::Clear, "Cleared history"))
}

// =============================================================================
// Shared with batch
// =============================================================================

pub(crate) fn filter_change(
    store: &ImageStore,
    surface: &(impl DrawingSurface + ?Sized),
    id: &ImageId,
    params: &FilterParams,
) -> Result<Change, EditError> {
    let record = store
        .image(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;
    let options = store.config().preview_options();
    let out = imaging::apply(surface, &record.preview, params, &options)?;
    Ok(Change {
        update: ImageUpdate::new()
            .preview(out.to_data_uri())
            .filters(params.clone()),
        action: NewAction::new(ActionKind::Filter, "Applied filters")
            .with_params(params_from(params)),
    })
}

pub(crate) fn compress_change(
    store: &ImageStore,
    compressor: &(impl Compressor + ?Sized),
    id: &ImageId,
    settings: &CompressionSettings,
) -> Result<Change, EditError> {
    let record = store
        .image(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;
    let original_size = record.file.size();
    // The preview carries every edit so far; the stored file is the upload.
    let (_, current) = data_uri::decode(&record.preview)
        .map_err(|e| CompressionError::Decode(e.to_string()))?;
    let bytes = compressor.compress(&current, settings)?;
    let mime_type = settings.target_format.mime_type();
    let file = SourceFile::new(
        record.file.name.clone(),
        mime_type,
        bytes,
        record.file.last_modified,
    );
    tracing::debug!(
        %id,
        original_size,
        compressed_size = file.size(),
        "compressed image"
    );

    let mut update = ImageUpdate::new().preview(data_uri::encode(mime_type, &file.bytes));
    if let Some(mut metadata) = record.metadata.clone() {
        metadata.size = file.size();
        metadata.format = file.format_label().to_string();
        if let Some((width, height)) = read_dimensions(&file.bytes) {
            metadata.width = width;
            metadata.height = height;
        }
        update = update.metadata(Some(metadata));
    }
    let action = NewAction::new(ActionKind::Compress, "Compressed image")
        .with_param("originalSize", original_size)
        .with_param("compressedSize", file.size())
        .with_params(params_from(settings));
    Ok(Change {
        update: update.file(file),
        action,
    })
}

fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

pub(crate) fn commit(
    store: &mut ImageStore,
    id: &ImageId,
    change: Change,
) -> Result<EditAction, EditError> {
    if !store.update_image(id, change.update) {
        return Err(EditError::NotFound(id.clone()));
    }
    append(store, id, change.action)
}

fn append(store: &mut ImageStore, id: &ImageId, action: NewAction) -> Result<EditAction, EditError> {
    store
        .add_edit_action(id, action)
        .cloned()
        .ok_or_else(|| EditError::NotFound(id.clone()))
}
