//! Per-image edit history: an append-only command log.
//!
//! Entries are immutable once appended and are always read in append order.
//! Nothing is ever removed:
//!
//! - **Undo / redo** are entries of their own that reference the entry they
//!   toggle. [`EditHistory::effective`] replays them to tell which actions
//!   are currently in force.
//! - **Clear** is an entry that hides everything before it from
//!   [`EditHistory::visible`]; [`EditHistory::entries`] still returns the full
//!   audit trail.
//!
//! Timestamps never go backwards within one history: an entry stamped
//! earlier than its predecessor is raised to the predecessor's timestamp.
//! Each entry also carries a store-wide `sequence` number, which orders
//! entries across images.
//!
//! The log is unbounded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Free-form parameters of an entry.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Serialize `value` into a parameter map. Non-object values land under
/// the key `value`.
pub fn params_from<T: Serialize>(value: &T) -> Params {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Params::new();
            map.insert("value".into(), other);
            map
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot serialize history parameters");
            Params::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Filter,
    Rotate,
    CustomRotate,
    Annotation,
    Shape,
    Text,
    Tag,
    Compress,
    Stream,
    Crop,
    Flip,
    Save,
    Undo,
    Redo,
    Clear,
    Preset,
    Edit,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Filter => "filter",
            ActionKind::Rotate => "rotate",
            ActionKind::CustomRotate => "customRotate",
            ActionKind::Annotation => "annotation",
            ActionKind::Shape => "shape",
            ActionKind::Text => "text",
            ActionKind::Tag => "tag",
            ActionKind::Compress => "compress",
            ActionKind::Stream => "stream",
            ActionKind::Crop => "crop",
            ActionKind::Flip => "flip",
            ActionKind::Save => "save",
            ActionKind::Undo => "undo",
            ActionKind::Redo => "redo",
            ActionKind::Clear => "clear",
            ActionKind::Preset => "preset",
            ActionKind::Edit => "edit",
        }
    }

    /// Undo, redo and clear act on the log rather than the image.
    pub fn is_control(self) -> bool {
        matches!(self, ActionKind::Undo | ActionKind::Redo | ActionKind::Clear)
    }
}

/// One recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAction {
    pub id: String,
    pub kind: ActionKind,
    /// Recorded by a batch operation.
    pub batch: bool,
    pub timestamp: DateTime<Utc>,
    /// Store-wide append counter.
    pub sequence: u64,
    pub description: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub params: Params,
    /// Entry an undo or redo acts on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The action was attempted and failed; the image was left unchanged.
    pub failed: bool,
}

/// An action waiting to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAction {
    pub kind: ActionKind,
    pub description: String,
    pub params: Params,
    pub batch: bool,
    pub failed: bool,
    pub reference: Option<String>,
    /// Stamp to use instead of the current time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewAction {
    pub fn new(kind: ActionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            params: Params::new(),
            batch: false,
            failed: false,
            reference: None,
            timestamp: None,
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn batch(mut self) -> Self {
        self.batch = true;
        self
    }

    pub fn failed(mut self) -> Self {
        self.failed = true;
        self
    }

    pub fn referencing(mut self, id: impl Into<String>) -> Self {
        self.reference = Some(id.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditHistory {
    entries: Vec<EditAction>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action and return the stored entry.
    pub fn append(&mut self, action: NewAction, sequence: u64) -> &EditAction {
        let now = action.timestamp.unwrap_or_else(Utc::now);
        let timestamp = match self.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        self.entries.push(EditAction {
            id: uuid::Uuid::new_v4().to_string(),
            kind: action.kind,
            batch: action.batch,
            timestamp,
            sequence,
            description: action.description,
            params: action.params,
            reference: action.reference,
            failed: action.failed,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Every entry ever appended.
    pub fn entries(&self) -> &[EditAction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&EditAction> {
        self.entries.last()
    }

    pub fn get(&self, id: &str) -> Option<&EditAction> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries from the last `clear` onward (the clear entry included).
    pub fn visible(&self) -> &[EditAction] {
        let start = self
            .entries
            .iter()
            .rposition(|e| e.kind == ActionKind::Clear)
            .unwrap_or(0);
        &self.entries[start..]
    }

    /// Visible, successful, non-control actions that are not currently
    /// undone, in append order.
    pub fn effective(&self) -> Vec<&EditAction> {
        let state = self.replay();
        let done: HashSet<&str> = state.done.into_iter().collect();
        self.visible()
            .iter()
            .filter(|e| done.contains(e.id.as_str()))
            .collect()
    }

    /// The entry the next undo would revert.
    pub fn undo_target(&self) -> Option<&EditAction> {
        self.replay().done.last().and_then(|id| self.get(id))
    }

    /// The entry the next redo would restore.
    pub fn redo_target(&self) -> Option<&EditAction> {
        self.replay().undone.last().and_then(|id| self.get(id))
    }

    fn replay(&self) -> Replay<'_> {
        let mut state = Replay::default();
        for entry in self.visible() {
            if entry.failed {
                continue;
            }
            match (entry.kind, entry.reference.as_deref()) {
                (ActionKind::Undo, Some(target)) => {
                    if let Some(pos) = state.done.iter().rposition(|id| *id == target) {
                        state.done.remove(pos);
                        state.undone.push(target);
                    }
                }
                (ActionKind::Redo, Some(target)) => {
                    if let Some(pos) = state.undone.iter().rposition(|id| *id == target) {
                        state.undone.remove(pos);
                        state.done.push(target);
                    }
                }
                (kind, _) if kind.is_control() => {}
                _ => {
                    state.done.push(&entry.id);
                    state.undone.clear();
                }
            }
        }
        state
    }
}

/// Undo/redo stacks reconstructed from the visible log.
#[derive(Default)]
struct Replay<'a> {
    done: Vec<&'a str>,
    undone: Vec<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn kinds(entries: &[&EditAction]) -> Vec<ActionKind> {
        entries.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn append_keeps_order_and_assigns_ids() {
        let mut history = EditHistory::new();
        let a = history.append(NewAction::new(ActionKind::Filter, "a"), 1).id.clone();
        let b = history.append(NewAction::new(ActionKind::Rotate, "b"), 2).id.clone();
        assert_ne!(a, b);
        let descriptions: Vec<_> = history
            .entries()
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["a", "b"]);
        assert_eq!(history.entries()[1].sequence, 2);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let mut history = EditHistory::new();
        history.append(NewAction::new(ActionKind::Filter, "late").at(at(200)), 1);
        let early = history.append(NewAction::new(ActionKind::Filter, "early").at(at(100)), 2);
        assert_eq!(early.timestamp, at(200));
    }

    #[test]
    fn missing_timestamp_is_now() {
        let before = Utc::now();
        let mut history = EditHistory::new();
        let entry = history.append(NewAction::new(ActionKind::Save, "s"), 1);
        assert!(entry.timestamp >= before);
    }

    #[test]
    fn clear_hides_but_retains() {
        let mut history = EditHistory::new();
        history.append(NewAction::new(ActionKind::Filter, "a"), 1);
        history.append(NewAction::new(ActionKind::Clear, "cleared"), 2);
        history.append(NewAction::new(ActionKind::Crop, "c"), 3);
        assert_eq!(history.entries().len(), 3);
        let visible: Vec<_> = history.visible().iter().map(|e| e.kind).collect();
        assert_eq!(visible, vec![ActionKind::Clear, ActionKind::Crop]);
        assert_eq!(kinds(&history.effective()), vec![ActionKind::Crop]);
    }

    #[test]
    fn undo_and_redo_toggle_their_target() {
        let mut history = EditHistory::new();
        history.append(NewAction::new(ActionKind::Filter, "a"), 1);
        let b = history.append(NewAction::new(ActionKind::Rotate, "b"), 2).id.clone();
        assert_eq!(history.undo_target().unwrap().id, b);

        history.append(NewAction::new(ActionKind::Undo, "undo").referencing(&b), 3);
        assert_eq!(kinds(&history.effective()), vec![ActionKind::Filter]);
        assert_eq!(history.redo_target().unwrap().id, b);

        history.append(NewAction::new(ActionKind::Redo, "redo").referencing(&b), 4);
        assert_eq!(
            kinds(&history.effective()),
            vec![ActionKind::Filter, ActionKind::Rotate]
        );
        assert!(history.redo_target().is_none());
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn new_action_discards_redo() {
        let mut history = EditHistory::new();
        let a = history.append(NewAction::new(ActionKind::Filter, "a"), 1).id.clone();
        history.append(NewAction::new(ActionKind::Undo, "undo").referencing(&a), 2);
        history.append(NewAction::new(ActionKind::Text, "t"), 3);
        assert!(history.redo_target().is_none());
        assert_eq!(kinds(&history.effective()), vec![ActionKind::Text]);
    }

    #[test]
    fn failed_entries_are_never_effective() {
        let mut history = EditHistory::new();
        history.append(NewAction::new(ActionKind::Compress, "boom").failed(), 1);
        assert!(history.effective().is_empty());
        assert!(history.undo_target().is_none());
    }

    #[test]
    fn params_from_struct_is_object() {
        #[derive(Serialize)]
        struct Knobs {
            brightness: u8,
        }
        let params = params_from(&Knobs { brightness: 150 });
        assert_eq!(params["brightness"], 150);

        let scalar = params_from(&42);
        assert_eq!(scalar["value"], 42);
    }

    #[test]
    fn kind_serializes_camel_case() {
        assert_eq!(
            serde_json::to_value(ActionKind::CustomRotate).unwrap(),
            "customRotate"
        );
        assert_eq!(ActionKind::CustomRotate.as_str(), "customRotate");
    }
}
