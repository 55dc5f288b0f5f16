//! The state tree: staged mutations, dirty tracking, and atomic flush.

use crate::error::{StateError, StateResult};
use crate::update::{NullSink, StateChange, StateSink, StateUpdate};
use crate::value::{StateValue, ValueKind};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which serialized view of an object's state a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotView {
    /// Full published state, used for preference save/restore.
    Preferences,
    /// Lightweight identity-and-links view, used for layout save/restore.
    Layout,
}

/// Hierarchical document of one object's observable configuration.
pub struct StateTree {
    owner: String,
    /// Staged state; every read and write goes here.
    working: Value,
    /// State as of the last flush; snapshots read this.
    published: Value,
    dirty: BTreeSet<String>,
    /// Default element for each array path, cloned when an array grows.
    templates: HashMap<String, Value>,
    revision: u64,
    sink: Arc<dyn StateSink>,
}

impl StateTree {
    /// Creates an empty tree that publishes nowhere.
    pub fn new(owner: impl Into<String>) -> Self {
        Self::with_sink(owner, Arc::new(NullSink))
    }

    /// Creates an empty tree that publishes every flush to `sink`.
    pub fn with_sink(owner: impl Into<String>, sink: Arc<dyn StateSink>) -> Self {
        Self {
            owner: owner.into(),
            working: Value::Object(Map::new()),
            published: Value::Object(Map::new()),
            dirty: BTreeSet::new(),
            templates: HashMap::new(),
            revision: 0,
            sink,
        }
    }

    /// Path of the object that owns this tree.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Number of flushes that published at least one change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Paths mutated since the last flush, in sorted order.
    pub fn dirty_paths(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.working.pointer(&pointer(path)).is_some()
    }

    // ── Structure ────────────────────────────────────────────────

    /// Establishes a scalar node with a default value.
    pub fn insert_value<T: StateValue>(&mut self, path: &str, default: T) -> StateResult<()> {
        let value = default
            .into_json()
            .ok_or_else(|| StateError::Unrepresentable(normalize(path)))?;
        self.insert_json(path, value)
    }

    /// Establishes an empty object node, replacing anything already there.
    pub fn insert_object(&mut self, path: &str) -> StateResult<()> {
        self.insert_json(path, Value::Object(Map::new()))
    }

    /// Establishes an array of `size` null elements.
    pub fn insert_array(&mut self, path: &str, size: usize) -> StateResult<()> {
        self.insert_array_with(path, size, Value::Null)
    }

    /// Establishes an array of `size` copies of `element`; later growth pads
    /// with fresh copies of the same element.
    pub fn insert_array_with(&mut self, path: &str, size: usize, element: Value) -> StateResult<()> {
        self.insert_json(path, Value::Array(vec![element.clone(); size]))?;
        self.templates.insert(normalize(path), element);
        Ok(())
    }

    /// Establishes an arbitrary JSON subtree at `path`.
    pub fn insert_json(&mut self, path: &str, value: Value) -> StateResult<()> {
        let path = normalize(path);
        let (parent, name) = split_parent(&path);
        if name.is_empty() {
            if !value.is_object() {
                return Err(StateError::NotAnObject(path));
            }
            self.working = value;
        } else {
            let parent_node = self
                .working
                .pointer_mut(&pointer(parent))
                .ok_or_else(|| StateError::ParentNotFound(path.clone()))?;
            let Value::Object(map) = parent_node else {
                return Err(StateError::NotAnObject(parent.to_string()));
            };
            map.insert(name.to_string(), value);
        }
        self.forget_templates_under(&path);
        self.mark_dirty(path);
        Ok(())
    }

    /// Removes an object member and returns its previous value.
    pub fn remove(&mut self, path: &str) -> StateResult<Value> {
        let path = normalize(path);
        let (parent, name) = split_parent(&path);
        let removed = self
            .working
            .pointer_mut(&pointer(parent))
            .and_then(Value::as_object_mut)
            .and_then(|map| map.remove(name))
            .ok_or_else(|| StateError::PathNotFound(path.clone()))?;
        self.forget_templates_under(&path);
        self.templates.remove(&path);
        self.mark_dirty(path);
        Ok(removed)
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Overwrites the node at `path`. A null node accepts any type; otherwise
    /// the stored kind must match `T`.
    pub fn set_value<T: StateValue>(&mut self, path: &str, value: T) -> StateResult<()> {
        let path = normalize(path);
        let Some(json) = value.into_json() else {
            return Err(StateError::Unrepresentable(path));
        };
        let node = self
            .working
            .pointer_mut(&pointer(&path))
            .ok_or_else(|| StateError::PathNotFound(path.clone()))?;
        let found = ValueKind::of(node);
        if found != ValueKind::Null && found != T::KIND {
            return Err(StateError::TypeMismatch {
                path,
                expected: T::KIND,
                found,
            });
        }
        *node = json;
        self.mark_dirty(path);
        Ok(())
    }

    /// Grows the array with default elements or drops trailing elements.
    /// Always marks the whole array dirty.
    pub fn resize_array(&mut self, path: &str, size: usize) -> StateResult<()> {
        let path = normalize(path);
        let element = self.templates.get(&path).cloned().unwrap_or(Value::Null);
        let node = self
            .working
            .pointer_mut(&pointer(&path))
            .ok_or_else(|| StateError::PathNotFound(path.clone()))?;
        let Value::Array(items) = node else {
            return Err(StateError::NotAnArray(path));
        };
        items.resize(size, element);
        self.mark_dirty(path);
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Reads a typed scalar from the working state.
    pub fn get_value<T: StateValue>(&self, path: &str) -> StateResult<T> {
        let node = self.get_json(path)?;
        T::from_json(node).ok_or_else(|| StateError::TypeMismatch {
            path: normalize(path),
            expected: T::KIND,
            found: ValueKind::of(node),
        })
    }

    /// Reads the raw node at `path` from the working state.
    pub fn get_json(&self, path: &str) -> StateResult<&Value> {
        self.working
            .pointer(&pointer(path))
            .ok_or_else(|| StateError::PathNotFound(normalize(path)))
    }

    pub fn get_array_size(&self, path: &str) -> StateResult<usize> {
        match self.get_json(path)? {
            Value::Array(items) => Ok(items.len()),
            _ => Err(StateError::NotAnArray(normalize(path))),
        }
    }

    /// The state as observers last saw it.
    pub fn snapshot(&self) -> &Value {
        &self.published
    }

    // ── Publication ──────────────────────────────────────────────

    /// Publishes every dirty path as one update and clears dirtiness.
    /// Returns `None` when nothing changed since the last flush.
    pub fn flush(&mut self) -> Option<StateUpdate> {
        if self.dirty.is_empty() {
            return None;
        }
        let changes = collapse(&self.dirty)
            .into_iter()
            .map(|path| {
                let value = self.working.pointer(&pointer(&path)).cloned();
                StateChange { path, value }
            })
            .collect();
        self.dirty.clear();
        self.revision += 1;
        self.published = self.working.clone();

        let update = StateUpdate {
            owner: self.owner.clone(),
            revision: self.revision,
            changes,
        };
        debug!(
            owner = %self.owner,
            revision = self.revision,
            changes = update.changes.len(),
            "Flushed state"
        );
        self.sink.publish(&update);
        Some(update)
    }

    /// Marks the entire tree dirty so the next flush republishes it whole.
    pub fn refresh(&mut self) {
        self.mark_dirty(String::new());
    }

    /// Replaces the working state with a preferences snapshot. Takes effect
    /// for observers at the next flush.
    pub fn restore(&mut self, snapshot: &str) -> StateResult<()> {
        let value: Value = serde_json::from_str(snapshot)?;
        if !value.is_object() {
            return Err(StateError::NotAnObject(String::new()));
        }
        self.working = value;
        self.refresh();
        Ok(())
    }

    fn mark_dirty(&mut self, path: String) {
        self.dirty.insert(path);
    }

    fn forget_templates_under(&mut self, path: &str) {
        if path.is_empty() {
            self.templates.clear();
            return;
        }
        let prefix = format!("{path}/");
        self.templates.retain(|key, _| !key.starts_with(&prefix));
    }
}

impl fmt::Display for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.published)
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("owner", &self.owner)
            .field("revision", &self.revision)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// Strips leading/trailing/duplicate delimiters: `/a//b/` → `a/b`.
fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Converts a state path into a JSON pointer.
pub(crate) fn pointer(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(String::new(), |mut acc, segment| {
            acc.push('/');
            acc.push_str(&segment.replace('~', "~0"));
            acc
        })
}

/// Splits a normalized path into (parent, last segment).
fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Drops every dirty path already covered by a dirty ancestor. Sorted order
/// guarantees an ancestor is visited before its descendants.
fn collapse(dirty: &BTreeSet<String>) -> Vec<String> {
    let mut roots: Vec<String> = Vec::new();
    for path in dirty {
        let covered = roots
            .iter()
            .any(|root| root.is_empty() || path.starts_with(&format!("{root}/")));
        if !covered {
            roots.push(path.clone());
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_escapes_tilde() {
        assert_eq!(pointer("a~b/c"), "/a~0b/c");
        assert_eq!(pointer(""), "");
    }

    #[test]
    fn normalize_collapses_delimiters() {
        assert_eq!(normalize("/colorMix//redPercent/"), "colorMix/redPercent");
    }

    #[test]
    fn split_parent_of_top_level_is_root() {
        assert_eq!(split_parent("gamma"), ("", "gamma"));
        assert_eq!(split_parent("colorMix/red"), ("colorMix", "red"));
    }

    #[test]
    fn collapse_keeps_only_outermost_paths() {
        let dirty: BTreeSet<String> = ["links", "links/0", "links/1", "gamma", "linksExtra"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(collapse(&dirty), vec!["gamma", "links", "linksExtra"]);
    }

    #[test]
    fn collapse_root_swallows_everything() {
        let dirty: BTreeSet<String> = ["", "a", "b/c"].into_iter().map(String::from).collect();
        assert_eq!(collapse(&dirty), vec![String::new()]);
    }
}
