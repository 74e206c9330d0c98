//! Shared types used across the store, the editing flows and the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque, unique identifier of an image in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    /// A fresh random (UUID v4) id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ImageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The uploaded file backing an image record.
///
/// Bytes are shared (`Arc`) so cloning a record never copies pixel data.
#[derive(Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
    pub last_modified: DateTime<Utc>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: Arc::from(bytes.into()),
            last_modified,
        }
    }

    /// Build a source file, sniffing the MIME type from the content and
    /// falling back to the file extension, then `application/octet-stream`.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let mime_type = image::guess_format(&bytes)
            .ok()
            .or_else(|| {
                std::path::Path::new(&name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(image::ImageFormat::from_extension)
            })
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Self::new(name, mime_type, bytes, last_modified)
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Subtype of the MIME type (`image/jpeg` → `jpeg`).
    pub fn format_label(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or(&self.mime_type)
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.name)
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .field("last_modified", &self.last_modified)
            .finish()
    }
}

/// Key used to order the gallery view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    /// Last-modified timestamp of the source file.
    Date,
    /// Byte size of the source file.
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}
