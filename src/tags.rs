//! Tag taxonomy: the registry of valid tag definitions.
//!
//! Tags are keyed by their lowercase `value`. The registry keeps insertion
//! order and a consistent hierarchy: a tag's `parent` and `children` only
//! ever name tags that exist, and parent/child links are kept symmetric.
//!
//! The registry knows nothing about images. Cascading a removal into image
//! tag sets is the store's job (see
//! [`ImageStore::remove_tag`](crate::store::ImageStore::remove_tag)).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TagError {
    #[error("tag value must not be empty")]
    Empty,
    #[error("tag '{0}' already exists")]
    Duplicate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TagCategory {
    Nature,
    People,
    Objects,
    #[default]
    Other,
}

impl TagCategory {
    pub const ALL: [TagCategory; 4] = [
        TagCategory::Nature,
        TagCategory::People,
        TagCategory::Objects,
        TagCategory::Other,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique lowercase key.
    pub value: String,
    pub label: String,
    pub category: TagCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl Tag {
    /// A tag whose value is the trimmed, lowercased label.
    pub fn new(label: impl Into<String>, category: TagCategory) -> Self {
        let label = label.into();
        Self {
            value: normalize(&label),
            label,
            category,
            color: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(normalize(&parent.into()));
        self
    }
}

/// Partial update of a [`Tag`]. `None` fields are left untouched; the value
/// (the key) cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub label: Option<String>,
    pub category: Option<TagCategory>,
    /// `Some(None)` clears the color.
    pub color: Option<Option<String>>,
    /// `Some(None)` detaches from the current parent.
    pub parent: Option<Option<String>>,
}

/// Normalized tag key: trimmed and lowercased.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagRegistry {
    tags: Vec<Tag>,
}

impl TagRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock taxonomy: `nature`, `people` and `objects`.
    pub fn with_stock_tags() -> Self {
        let mut registry = Self::new();
        for (label, category) in [
            ("Nature", TagCategory::Nature),
            ("People", TagCategory::People),
            ("Objects", TagCategory::Objects),
        ] {
            let added = registry.add(Tag::new(label, category));
            debug_assert!(added.is_ok(), "stock tag {label} rejected: {added:?}");
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    pub fn get(&self, value: &str) -> Option<&Tag> {
        let key = normalize(value);
        self.tags.iter().find(|t| t.value == key)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.get(value).is_some()
    }

    pub fn by_category(&self, category: TagCategory) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(move |t| t.category == category)
    }

    /// Register a tag.
    ///
    /// The value is normalized first. A parent that does not exist is
    /// dropped; a known parent gets the new tag appended to its children.
    /// Children supplied on the tag are ignored, they are derived from the
    /// parents of later tags.
    pub fn add(&mut self, mut tag: Tag) -> Result<&Tag, TagError> {
        tag.value = normalize(&tag.value);
        if tag.value.is_empty() {
            return Err(TagError::Empty);
        }
        if self.contains(&tag.value) {
            return Err(TagError::Duplicate(tag.value));
        }
        tag.children.clear();
        tag.parent = tag
            .parent
            .map(|p| normalize(&p))
            .filter(|p| *p != tag.value && self.contains(p));
        if let Some(parent) = &tag.parent {
            self.link_child(parent, &tag.value);
        }
        tracing::debug!(value = %tag.value, "tag added");
        self.tags.push(tag);
        Ok(&self.tags[self.tags.len() - 1])
    }

    /// Merge `update` into the tag with `value`. Returns false when absent.
    pub fn update(&mut self, value: &str, update: TagUpdate) -> bool {
        let key = normalize(value);
        let Some(index) = self.tags.iter().position(|t| t.value == key) else {
            return false;
        };
        if let Some(parent) = update.parent {
            let parent = parent
                .map(|p| normalize(&p))
                .filter(|p| *p != key && self.contains(p) && !self.is_descendant(p, &key));
            if let Some(old) = self.tags[index].parent.take() {
                self.unlink_child(&old, &key);
            }
            if let Some(new) = &parent {
                self.link_child(new, &key);
            }
            self.tags[index].parent = parent;
        }
        let tag = &mut self.tags[index];
        if let Some(label) = update.label {
            tag.label = label;
        }
        if let Some(category) = update.category {
            tag.category = category;
        }
        if let Some(color) = update.color {
            tag.color = color;
        }
        true
    }

    /// Remove a tag and every hierarchy link naming it. Its children become
    /// roots.
    pub fn remove(&mut self, value: &str) -> Option<Tag> {
        let key = normalize(value);
        let index = self.tags.iter().position(|t| t.value == key)?;
        let removed = self.tags.remove(index);
        for tag in &mut self.tags {
            if tag.parent.as_deref() == Some(key.as_str()) {
                tag.parent = None;
            }
            tag.children.retain(|c| *c != key);
        }
        tracing::debug!(value = %key, "tag removed");
        Some(removed)
    }

    fn link_child(&mut self, parent: &str, child: &str) {
        if let Some(p) = self.tags.iter_mut().find(|t| t.value == parent) {
            if !p.children.iter().any(|c| c == child) {
                p.children.push(child.to_string());
            }
        }
    }

    fn unlink_child(&mut self, parent: &str, child: &str) {
        if let Some(p) = self.tags.iter_mut().find(|t| t.value == parent) {
            p.children.retain(|c| c != child);
        }
    }

    /// Whether `candidate` sits below `ancestor` in the hierarchy.
    fn is_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        let mut current = self.get(candidate).and_then(|t| t.parent.clone());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.get(&parent).and_then(|t| t.parent.clone());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_tags_are_registered() {
        let registry = TagRegistry::with_stock_tags();
        let values: Vec<_> = registry.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["nature", "people", "objects"]);
        assert_eq!(registry.get("People").unwrap().category, TagCategory::People);
    }

    #[test]
    fn add_normalizes_value() {
        let mut registry = TagRegistry::new();
        let tag = registry.add(Tag::new("  Sunset ", TagCategory::Nature)).unwrap();
        assert_eq!(tag.value, "sunset");
        assert_eq!(tag.label, "  Sunset ");
    }

    #[test]
    fn add_rejects_empty_and_duplicate() {
        let mut registry = TagRegistry::with_stock_tags();
        assert_eq!(
            registry.add(Tag::new("   ", TagCategory::Other)).unwrap_err(),
            TagError::Empty
        );
        assert_eq!(
            registry.add(Tag::new("NATURE", TagCategory::Other)).unwrap_err(),
            TagError::Duplicate("nature".into())
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn add_with_parent_links_both_ways() {
        let mut registry = TagRegistry::with_stock_tags();
        registry
            .add(Tag::new("Forest", TagCategory::Nature).with_parent("nature"))
            .unwrap();
        assert_eq!(registry.get("forest").unwrap().parent.as_deref(), Some("nature"));
        assert_eq!(registry.get("nature").unwrap().children, vec!["forest"]);
    }

    #[test]
    fn add_drops_unknown_parent() {
        let mut registry = TagRegistry::new();
        let tag = registry
            .add(Tag::new("Forest", TagCategory::Nature).with_parent("ghost"))
            .unwrap();
        assert_eq!(tag.parent, None);
    }

    #[test]
    fn update_is_partial() {
        let mut registry = TagRegistry::with_stock_tags();
        assert!(registry.update(
            "nature",
            TagUpdate {
                color: Some(Some("#00ff00".into())),
                ..TagUpdate::default()
            }
        ));
        let tag = registry.get("nature").unwrap();
        assert_eq!(tag.color.as_deref(), Some("#00ff00"));
        assert_eq!(tag.label, "Nature");
        assert_eq!(tag.category, TagCategory::Nature);
    }

    #[test]
    fn update_unknown_is_noop() {
        let mut registry = TagRegistry::with_stock_tags();
        let before = registry.clone();
        assert!(!registry.update("ghost", TagUpdate::default()));
        assert_eq!(registry, before);
    }

    #[test]
    fn update_parent_moves_child_link() {
        let mut registry = TagRegistry::with_stock_tags();
        registry
            .add(Tag::new("Tree", TagCategory::Nature).with_parent("nature"))
            .unwrap();
        registry.update(
            "tree",
            TagUpdate {
                parent: Some(Some("objects".into())),
                ..TagUpdate::default()
            },
        );
        assert!(registry.get("nature").unwrap().children.is_empty());
        assert_eq!(registry.get("objects").unwrap().children, vec!["tree"]);
    }

    #[test]
    fn update_rejects_cyclic_parent() {
        let mut registry = TagRegistry::with_stock_tags();
        registry
            .add(Tag::new("Tree", TagCategory::Nature).with_parent("nature"))
            .unwrap();
        registry.update(
            "nature",
            TagUpdate {
                parent: Some(Some("tree".into())),
                ..TagUpdate::default()
            },
        );
        assert_eq!(registry.get("nature").unwrap().parent, None);
    }

    #[test]
    fn remove_strips_hierarchy_links() {
        let mut registry = TagRegistry::with_stock_tags();
        registry
            .add(Tag::new("Tree", TagCategory::Nature).with_parent("nature"))
            .unwrap();
        let removed = registry.remove("nature").unwrap();
        assert_eq!(removed.value, "nature");
        assert!(!registry.contains("nature"));
        assert_eq!(registry.get("tree").unwrap().parent, None);
        assert!(
            registry
                .iter()
                .all(|t| t.children.iter().all(|c| c != "nature"))
        );
    }

    #[test]
    fn remove_unknown_returns_none() {
        let mut registry = TagRegistry::with_stock_tags();
        assert!(registry.remove("ghost").is_none());
        assert_eq!(registry.len(), 3);
    }
}
