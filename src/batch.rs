//! Batch operations: one action run over a selection of images.
//!
//! Images are processed one at a time, in selection order. Every image that
//! exists gets exactly one history entry, flagged as a batch entry and
//! described as `Batch <kind> operation`:
//!
//! - on success the entry carries the action's parameters and the image is
//!   updated;
//! - on failure the entry is marked `failed`, carries the error text, and the
//!   image is left as it was. The batch moves on to the next image.
//!
//! Ids that name no image are reported as [`BatchOutcome::NotFound`] and get
//! no entry. Repeated ids are processed once.
//!
//! | Action | Collaborator | Effect |
//! |--------|--------------|--------|
//! | `edit` | drawing surface | render filters over the preview, store them |
//! | `compress` | compressor | re-encode the current preview as the new file |
//! | `stream` | drawing surface | render the quality ladder, log frame sizes |
//!
//! After the run the store keeps a [`BatchRecord`] in its batch log.

use crate::editing::{self, Change, EditError};
use crate::history::{ActionKind, NewAction};
use crate::imaging::{CompressionSettings, Compressor, DrawingSurface, FilterParams};
use crate::progressive::{StreamSettings, quality_ladder};
use crate::store::{ImageStore, ImageUpdate};
use crate::types::ImageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a batch does to each image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "settings", rename_all = "lowercase")]
pub enum BatchAction {
    Edit(FilterParams),
    Compress(CompressionSettings),
    Stream(StreamSettings),
}

impl BatchAction {
    /// The `type` name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            BatchAction::Edit(_) => "edit",
            BatchAction::Compress(_) => "compress",
            BatchAction::Stream(_) => "stream",
        }
    }

    fn kind(&self) -> ActionKind {
        match self {
            BatchAction::Edit(_) => ActionKind::Edit,
            BatchAction::Compress(_) => ActionKind::Compress,
            BatchAction::Stream(_) => ActionKind::Stream,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOperation {
    pub action: BatchAction,
    /// Target images in selection order.
    pub image_ids: Vec<ImageId>,
}

impl BatchOperation {
    pub fn new(action: BatchAction, image_ids: impl IntoIterator<Item = ImageId>) -> Self {
        Self {
            action,
            image_ids: image_ids.into_iter().collect(),
        }
    }
}

/// The collaborators a batch may call.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub surface: &'a dyn DrawingSurface,
    pub compressor: &'a dyn Compressor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "camelCase")]
pub enum BatchOutcome {
    Succeeded,
    Failed(String),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub image_id: ImageId,
    pub outcome: BatchOutcome,
}

/// Per-image outcomes, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> Vec<&ImageId> {
        self.matching(|o| matches!(o, BatchOutcome::Succeeded))
    }

    pub fn failed(&self) -> Vec<&ImageId> {
        self.matching(|o| matches!(o, BatchOutcome::Failed(_)))
    }

    pub fn not_found(&self) -> Vec<&ImageId> {
        self.matching(|o| matches!(o, BatchOutcome::NotFound))
    }

    fn matching(&self, predicate: impl Fn(&BatchOutcome) -> bool) -> Vec<&ImageId> {
        self.items
            .iter()
            .filter(|item| predicate(&item.outcome))
            .map(|item| &item.image_id)
            .collect()
    }
}

/// A finished batch, as kept in the store's batch log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub operation: BatchOperation,
    pub report: BatchReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Run `operation` over its images.
pub fn run_batch(
    store: &mut ImageStore,
    collaborators: Collaborators<'_>,
    operation: BatchOperation,
) -> BatchReport {
    let started_at = Utc::now();
    let kind = operation.action.kind();
    let description = format!("Batch {} operation", operation.action.name());
    let mut seen = HashSet::new();
    let mut report = BatchReport::default();

    for id in &operation.image_ids {
        if !seen.insert(id) {
            continue;
        }
        if store.image(id).is_none() {
            tracing::warn!(%id, "batch target not found");
            report.items.push(BatchItem {
                image_id: id.clone(),
                outcome: BatchOutcome::NotFound,
            });
            continue;
        }

        let entry = NewAction::new(kind, description.clone()).batch();
        let outcome = match prepare(store, collaborators, id, &operation.action) {
            Ok(change) => {
                store.update_image(id, change.update);
                store.add_edit_action(id, entry.with_params(change.action.params));
                BatchOutcome::Succeeded
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "batch item failed");
                store.add_edit_action(id, entry.failed().with_param("error", e.to_string()));
                BatchOutcome::Failed(e.to_string())
            }
        };
        report.items.push(BatchItem {
            image_id: id.clone(),
            outcome,
        });
    }

    tracing::info!(
        action = operation.action.name(),
        succeeded = report.succeeded().len(),
        failed = report.failed().len(),
        not_found = report.not_found().len(),
        "batch finished"
    );
    store.record_batch(BatchRecord {
        operation,
        report: report.clone(),
        started_at,
        finished_at: Utc::now(),
    });
    report
}

/// Compute one image's change without touching the store.
fn prepare(
    store: &ImageStore,
    collaborators: Collaborators<'_>,
    id: &ImageId,
    action: &BatchAction,
) -> Result<Change, EditError> {
    match action {
        BatchAction::Edit(params) => {
            editing::filter_change(store, collaborators.surface, id, params)
        }
        BatchAction::Compress(settings) => {
            editing::compress_change(store, collaborators.compressor, id, settings)
        }
        BatchAction::Stream(settings) => {
            let record = store
                .image(id)
                .ok_or_else(|| EditError::NotFound(id.clone()))?;
            let frames = quality_ladder(collaborators.surface, &record.preview, settings.steps)?;
            let qualities: Vec<u32> = frames.iter().map(|f| f.quality.value()).collect();
            let sizes: Vec<usize> = frames.iter().map(|f| f.bytes.len()).collect();
            Ok(Change {
                update: ImageUpdate::new(),
                action: NewAction::new(ActionKind::Stream, "Streamed image")
                    .with_param("steps", settings.steps)
                    .with_param("chunkSize", settings.chunk_size)
                    .with_param("qualities", qualities)
                    .with_param("frameSizes", sizes),
            })
        }
    }
}
