//! The image collection store.
//!
//! [`ImageStore`] is the single source of truth of a session: the image
//! records, the tag taxonomy, the filter presets, the gallery view criteria
//! and the batch log. It is a plain owned value; every mutation goes through
//! `&mut self`, so there is exactly one writer at a time.
//!
//! ## Invariants
//!
//! - Image ids are unique.
//! - Every tag id attached to an image exists in the taxonomy. Unknown ids
//!   are dropped on the way in and [`remove_tag`](ImageStore::remove_tag)
//!   strips the removed id from every image.
//! - The selection, when set, names an image that exists.
//!
//! Mutators that name an unknown image are silent no-ops and report it
//! through their return value. Flows that must surface a missing image as an
//! error live in [`editing`](crate::editing).
//!
//! ## Gallery view
//!
//! [`filtered_and_sorted_images`](ImageStore::filtered_and_sorted_images) is
//! derived on every call from the search query, sort key and sort direction:
//!
//! ```text
//! images ──search──▶ matches (by relevance) ──stable sort──▶ view
//! ```
//!
//! An empty query keeps everything in insertion order. Descending order
//! reverses the comparator, not the list, so equal keys keep their relative
//! order in both directions.

use crate::batch::BatchRecord;
use crate::config::StudioConfig;
use crate::history::{ActionKind, EditAction, EditHistory, NewAction};
use crate::imaging::{FilterParams, data_uri};
use crate::metadata::{ExtractionError, ImageMetadata, MetadataExtractor};
use crate::presets::{FilterPreset, stock_presets};
use crate::search;
use crate::tags::{self, Tag, TagError, TagRegistry, TagUpdate};
use crate::types::{ImageId, SortDirection, SortKey, SourceFile};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// One image in the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: ImageId,
    pub file: SourceFile,
    /// Renderable handle of the current look, a `data:` URI.
    pub preview: String,
    /// Tag ids, each present in the taxonomy.
    pub tags: BTreeSet<String>,
    pub history: EditHistory,
    pub filters: FilterParams,
    pub metadata: Option<ImageMetadata>,
}

/// A file to add to the store.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file: SourceFile,
    pub tags: Vec<String>,
    pub filters: Option<FilterParams>,
}

impl Upload {
    pub fn new(file: SourceFile) -> Self {
        Self {
            file,
            tags: Vec::new(),
            filters: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_filters(mut self, filters: FilterParams) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Result of [`ImageStore::add_image`].
#[derive(Debug)]
pub struct AddedImage {
    pub id: ImageId,
    /// Why metadata is missing, when extraction failed.
    pub warning: Option<ExtractionError>,
}

/// Partial update of an [`ImageRecord`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ImageUpdate {
    pub file: Option<SourceFile>,
    pub preview: Option<String>,
    pub tags: Option<Vec<String>>,
    pub filters: Option<FilterParams>,
    /// `Some(None)` clears the metadata.
    pub metadata: Option<Option<ImageMetadata>>,
}

impl ImageUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, file: SourceFile) -> Self {
        self.file = Some(file);
        self
    }

    pub fn preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn filters(mut self, filters: FilterParams) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn metadata(mut self, metadata: Option<ImageMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    config: StudioConfig,
    images: Vec<ImageRecord>,
    tags: TagRegistry,
    presets: Vec<FilterPreset>,
    selected: Option<ImageId>,
    search_query: String,
    sort_by: SortKey,
    sort_direction: SortDirection,
    batch_log: Vec<BatchRecord>,
    sequence: u64,
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore {
    /// An empty store with default configuration, the stock tags and the
    /// stock presets.
    pub fn new() -> Self {
        Self::with_config(StudioConfig::default())
    }

    pub fn with_config(config: StudioConfig) -> Self {
        Self {
            config,
            images: Vec::new(),
            tags: TagRegistry::with_stock_tags(),
            presets: stock_presets(),
            selected: None,
            search_query: String::new(),
            sort_by: SortKey::default(),
            sort_direction: SortDirection::default(),
            batch_log: Vec::new(),
            sequence: 0,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    // =====================================================================
    // Images
    // =====================================================================

    /// Add an uploaded file and return its new id.
    ///
    /// Unknown tag ids are dropped. A failing extractor never blocks the
    /// insert: the record gets no metadata and the error is handed back as
    /// a warning.
    pub fn add_image(
        &mut self,
        extractor: &(impl MetadataExtractor + ?Sized),
        upload: Upload,
    ) -> AddedImage {
        let Upload {
            file,
            tags,
            filters,
        } = upload;
        let (metadata, warning) = match extractor.extract(&file) {
            Ok(metadata) => (Some(metadata), None),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "metadata extraction failed");
                (None, Some(e))
            }
        };
        let record = ImageRecord {
            id: ImageId::new(),
            preview: data_uri::encode(&file.mime_type, &file.bytes),
            tags: self.known_tags(tags),
            history: EditHistory::new(),
            filters: filters.unwrap_or_default(),
            metadata,
            file,
        };
        let id = record.id.clone();
        tracing::debug!(%id, file = %record.file.name, "image added");
        self.images.push(record);
        AddedImage { id, warning }
    }

    /// Remove an image, clearing the selection if it pointed at it.
    pub fn remove_image(&mut self, id: &ImageId) -> Option<ImageRecord> {
        let index = self.images.iter().position(|r| r.id == *id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        tracing::debug!(%id, "image removed");
        Some(self.images.remove(index))
    }

    /// Merge `update` into an image. Returns false when the image is absent.
    pub fn update_image(&mut self, id: &ImageId, update: ImageUpdate) -> bool {
        let tags = update.tags.map(|t| self.known_tags(t));
        let Some(record) = self.image_mut(id) else {
            return false;
        };
        if let Some(file) = update.file {
            record.file = file;
        }
        if let Some(preview) = update.preview {
            record.preview = preview;
        }
        if let Some(tags) = tags {
            record.tags = tags;
        }
        if let Some(filters) = update.filters {
            record.filters = filters;
        }
        if let Some(metadata) = update.metadata {
            record.metadata = metadata;
        }
        true
    }

    pub fn image(&self, id: &ImageId) -> Option<&ImageRecord> {
        self.images.iter().find(|r| r.id == *id)
    }

    pub(crate) fn image_mut(&mut self, id: &ImageId) -> Option<&mut ImageRecord> {
        self.images.iter_mut().find(|r| r.id == *id)
    }

    /// All images in insertion order.
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    // =====================================================================
    // Selection
    // =====================================================================

    /// Select an image, or clear the selection with `None`. Selecting an
    /// unknown id clears the selection.
    pub fn set_selected_image(&mut self, id: Option<ImageId>) {
        self.selected = id.filter(|id| self.image(id).is_some());
    }

    pub fn selected_image(&self) -> Option<&ImageRecord> {
        self.selected.as_ref().and_then(|id| self.image(id))
    }

    // =====================================================================
    // Tags
    // =====================================================================

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn add_tag(&mut self, tag: Tag) -> Result<&Tag, TagError> {
        self.tags.add(tag)
    }

    pub fn update_tag(&mut self, value: &str, update: TagUpdate) -> bool {
        self.tags.update(value, update)
    }

    /// Remove a tag from the taxonomy and from every image.
    pub fn remove_tag(&mut self, value: &str) -> Option<Tag> {
        let removed = self.tags.remove(value)?;
        let mut stripped = 0;
        for record in &mut self.images {
            if record.tags.remove(&removed.value) {
                stripped += 1;
            }
        }
        tracing::debug!(value = %removed.value, images = stripped, "tag cascade");
        Some(removed)
    }

    /// Attach a known tag to an image and log it. Returns false when the
    /// image or tag is unknown, or the image already carries the tag.
    pub fn tag_image(&mut self, id: &ImageId, value: &str) -> bool {
        let Some(tag) = self.tags.get(value) else {
            return false;
        };
        let (value, label) = (tag.value.clone(), tag.label.clone());
        let inserted = self
            .image_mut(id)
            .is_some_and(|record| record.tags.insert(value.clone()));
        if !inserted {
            return false;
        }
        self.add_edit_action(
            id,
            NewAction::new(ActionKind::Tag, format!("Added tag {label}"))
                .with_param("tag", value)
                .with_param("action", "add"),
        );
        true
    }

    /// Detach a tag from an image and log it. Returns false when the image
    /// does not carry the tag.
    pub fn untag_image(&mut self, id: &ImageId, value: &str) -> bool {
        let value = tags::normalize(value);
        let removed = self
            .image_mut(id)
            .is_some_and(|record| record.tags.remove(&value));
        if !removed {
            return false;
        }
        self.add_edit_action(
            id,
            NewAction::new(ActionKind::Tag, format!("Removed tag {value}"))
                .with_param("tag", value)
                .with_param("action", "remove"),
        );
        true
    }

    fn known_tags(&self, requested: Vec<String>) -> BTreeSet<String> {
        requested
            .iter()
            .map(|t| tags::normalize(t))
            .filter(|t| {
                let known = self.tags.contains(t);
                if !known {
                    tracing::debug!(tag = %t, "dropping unknown tag");
                }
                known
            })
            .collect()
    }

    // =====================================================================
    // History
    // =====================================================================

    /// Append an action to an image's history. `None` when the image is
    /// absent.
    pub fn add_edit_action(&mut self, id: &ImageId, action: NewAction) -> Option<&EditAction> {
        let index = self.images.iter().position(|r| r.id == *id)?;
        self.sequence += 1;
        let sequence = self.sequence;
        let entry = self.images[index].history.append(action, sequence);
        tracing::debug!(%id, kind = entry.kind.as_str(), sequence, "history entry");
        Some(entry)
    }

    // =====================================================================
    // Gallery view
    // =====================================================================

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn sort_by(&self) -> SortKey {
        self.sort_by
    }

    pub fn set_sort_by(&mut self, key: SortKey) {
        self.sort_by = key;
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn set_sort_direction(&mut self, direction: SortDirection) {
        self.sort_direction = direction;
    }

    /// The gallery view: search matches (file name and tag ids) ordered by
    /// the current sort key and direction.
    pub fn filtered_and_sorted_images(&self) -> Vec<&ImageRecord> {
        let query = self.search_query.trim();
        let mut view: Vec<&ImageRecord> = if query.is_empty() {
            self.images.iter().collect()
        } else {
            search::rank(
                &self.images,
                query,
                self.config.search.threshold,
                |record: &ImageRecord| {
                    std::iter::once(record.file.name.as_str())
                        .chain(record.tags.iter().map(String::as_str))
                        .collect()
                },
            )
            .into_iter()
            .map(|i| &self.images[i])
            .collect()
        };

        let key = self.sort_by;
        let direction = self.sort_direction;
        view.sort_by(|a, b| {
            let ord = compare(a, b, key);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        view
    }

    // =====================================================================
    // Presets
    // =====================================================================

    /// Register a preset. Returns false for an empty or taken id.
    pub fn add_filter_preset(&mut self, preset: FilterPreset) -> bool {
        if preset.id.is_empty() || self.filter_preset(&preset.id).is_some() {
            return false;
        }
        self.presets.push(preset);
        true
    }

    pub fn filter_preset(&self, id: &str) -> Option<&FilterPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn filter_presets(&self) -> &[FilterPreset] {
        &self.presets
    }

    // =====================================================================
    // Batch log
    // =====================================================================

    /// Completed batch runs, oldest first.
    pub fn batch_log(&self) -> &[BatchRecord] {
        &self.batch_log
    }

    pub(crate) fn record_batch(&mut self, record: BatchRecord) {
        self.batch_log.push(record);
    }
}

fn compare(a: &ImageRecord, b: &ImageRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a
            .file
            .name
            .to_lowercase()
            .cmp(&b.file.name.to_lowercase())
            .then_with(|| a.file.name.cmp(&b.file.name)),
        SortKey::Date => a.file.last_modified.cmp(&b.file.last_modified),
        SortKey::Size => a.file.size().cmp(&b.file.size()),
    }
}
