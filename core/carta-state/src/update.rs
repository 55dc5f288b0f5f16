//! Flush output: the unit of replication sent to observers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One published change. `value == None` means the node was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// State path relative to the owner; empty for the whole tree.
    pub path: String,
    pub value: Option<Value>,
}

/// Everything one flush published, in a single atomic batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Path of the object whose tree was flushed.
    pub owner: String,
    /// Monotonic per-tree flush counter.
    pub revision: u64,
    pub changes: Vec<StateChange>,
}

impl StateUpdate {
    /// Applies this update to a remote mirror of the owner's document,
    /// creating intermediate objects as needed.
    pub fn apply_to(&self, document: &mut Value) {
        for change in &self.changes {
            apply_change(document, &change.path, change.value.clone());
        }
    }
}

fn apply_change(document: &mut Value, path: &str, value: Option<Value>) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        *document = value.unwrap_or_else(|| Value::Object(Map::new()));
        return;
    };

    let mut node = document;
    for segment in parents {
        match child_mut(node, segment) {
            Some(child) => node = child,
            None => return,
        }
    }
    match (node, value) {
        (Value::Array(items), Some(value)) => {
            if let Ok(index) = last.parse::<usize>() {
                if index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
                items[index] = value;
            }
        }
        (Value::Array(items), None) => {
            if let Ok(index) = last.parse::<usize>() {
                items.truncate(index);
            }
        }
        (node, Some(value)) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(map) = node {
                map.insert((*last).to_string(), value);
            }
        }
        (Value::Object(map), None) => {
            map.remove(*last);
        }
        (_, None) => {}
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match (node, segment.parse::<usize>().ok()) {
        (Value::Array(items), Some(index)) => {
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items.get_mut(index)
        }
        (node, _) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node.as_object_mut().map(|map| {
                map.entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new()))
            })
        }
    }
}

/// Receives every update a [`crate::StateTree`] flushes.
pub trait StateSink: Send + Sync {
    fn publish(&self, update: &StateUpdate);

    /// Called once when the owner of a tree is destroyed.
    fn retire(&self, _owner: &str) {}
}

/// Sink that discards updates; used by trees with no remote observers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StateSink for NullSink {
    fn publish(&self, _update: &StateUpdate) {}
}

impl<F> StateSink for F
where
    F: Fn(&StateUpdate) + Send + Sync,
{
    fn publish(&self, update: &StateUpdate) {
        self(update)
    }
}
