//! Fan-out of flushed state to remote observers.

use crate::protocol::SyncMessage;
use carta_state::{StateSink, StateUpdate};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

/// Publishes every flush to subscribed views and mirrors it into a
/// per-object document, so a view that joins late can ask for the full
/// current state instead of replaying updates.
pub struct SyncBridge {
    sender: broadcast::Sender<SyncMessage>,
    documents: Mutex<BTreeMap<String, Value>>,
}

impl SyncBridge {
    /// `capacity` bounds how many updates a slow subscriber may lag behind
    /// before it starts missing them.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            documents: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncMessage> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Latest published document of one object.
    pub fn document(&self, owner: &str) -> Option<Value> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner)
            .cloned()
    }

    /// Latest published documents of every object, keyed by path.
    pub fn documents(&self) -> Value {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Value::Object(
            documents
                .iter()
                .map(|(owner, document)| (owner.clone(), document.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl StateSink for SyncBridge {
    fn publish(&self, update: &StateUpdate) {
        {
            let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
            let document = documents
                .entry(update.owner.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            update.apply_to(document);
        }
        // Sending fails only when nobody is subscribed.
        if self.sender.send(SyncMessage::StateUpdate(update.clone())).is_err() {
            debug!(owner = %update.owner, "No observers for state update");
        }
    }

    fn retire(&self, owner: &str) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(owner);
    }
}
