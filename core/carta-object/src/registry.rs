//! The object registry: factory table, live instances, and the top-level
//! entry points that drive one event to completion.

use crate::context::{FactoryTable, ObjectContext, ObjectStore};
use crate::error::{ObjectError, ObjectResult};
use crate::object::{CartaObject, ObjectFactory};
use carta_hooks::HookDispatcher;
use carta_state::{SnapshotView, StateSink};
use carta_types::{ObjectId, ObjectPath, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound on notification rounds per event; a link cycle that keeps
/// re-notifying is cut off here.
const MAX_NOTIFY_ROUNDS: usize = 16;

/// Default parent path for created objects.
pub const DEFAULT_ROOT: &str = "/CartaObjects";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub root: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
        }
    }
}

type ChangeObserver = Box<dyn FnMut(&ObjectPath) + Send>;

/// Owns every live object.
///
/// Each public mutating call is one event: it runs the operation, flushes
/// every dirty state tree, then delivers change notifications to linked
/// hosts and observers until none remain.
pub struct ObjectRegistry {
    factories: FactoryTable,
    store: ObjectStore,
    hooks: Arc<HookDispatcher>,
    observers: Vec<ChangeObserver>,
}

impl ObjectRegistry {
    pub fn new(
        config: RegistryConfig,
        hooks: Arc<HookDispatcher>,
        sink: Arc<dyn StateSink>,
    ) -> ObjectResult<Self> {
        let root = ObjectPath::new(&config.root)?;
        info!(root = %root, "Object registry ready");
        Ok(Self {
            factories: FactoryTable::new(),
            store: ObjectStore::new(root, sink),
            hooks,
            observers: Vec::new(),
        })
    }

    // ========================================================================
    // Factories
    // ========================================================================

    /// Registers a factory for `class`. Returns `false`, leaving the existing
    /// factory in place, if the class is already registered.
    pub fn register_factory(&mut self, class: &str, factory: impl ObjectFactory + 'static) -> bool {
        if self.factories.contains_key(class) {
            warn!(class, "Factory already registered");
            return false;
        }
        self.factories.insert(class.to_string(), Box::new(factory));
        true
    }

    pub fn is_registered(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn hooks(&self) -> &HookDispatcher {
        &self.hooks
    }

    pub fn root(&self) -> &ObjectPath {
        self.store.root()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn create(&mut self, class: &str) -> ObjectResult<ObjectPath> {
        self.run(None, |ctx| ctx.create(class))
    }

    pub fn create_at(&mut self, class: &str, path: ObjectPath) -> ObjectResult<ObjectPath> {
        self.run(None, |ctx| ctx.create_at(class, path))
    }

    pub fn find_singleton(&mut self, class: &str) -> ObjectResult<ObjectPath> {
        self.run(None, |ctx| ctx.find_singleton(class))
    }

    pub fn destroy(&mut self, id: ObjectId) -> ObjectResult<()> {
        self.run(None, |ctx| ctx.destroy(id))
    }

    pub fn destroy_path(&mut self, path: &ObjectPath) -> ObjectResult<()> {
        self.run(None, |ctx| ctx.destroy_path(path))
    }

    /// Destroys every live object, oldest first.
    pub fn shutdown(&mut self) {
        let mut ids: Vec<ObjectId> = self.store.objects.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            // Owners tear down their children, which may already be gone.
            if self.store.objects.contains_key(&id) {
                if let Err(err) = self.destroy(id) {
                    warn!(id = %id, error = %err, "Failed to destroy object during shutdown");
                }
            }
        }
        info!("Object registry shut down");
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn id_of(&self, path: &ObjectPath) -> Option<ObjectId> {
        self.store.id_of(path)
    }

    pub fn get(&self, path: &ObjectPath) -> Option<&dyn CartaObject> {
        let id = self.store.id_of(path)?;
        self.store.objects.get(&id).map(|o| &**o)
    }

    pub fn get_as<T: CartaObject>(&self, path: &ObjectPath) -> Option<&T> {
        self.get(path)?.downcast_ref::<T>()
    }

    pub fn live_count(&self) -> usize {
        self.store.objects.len()
    }

    /// Live paths ordered by creation.
    pub fn paths(&self) -> Vec<ObjectPath> {
        let mut objects: Vec<&dyn CartaObject> = self.store.objects.values().map(|o| &**o).collect();
        objects.sort_unstable_by_key(|o| o.id());
        objects.into_iter().map(|o| o.path().clone()).collect()
    }

    /// Runs `f` on the object at `path` as a `T`, as one event.
    pub fn with_object<T, R>(
        &mut self,
        path: &ObjectPath,
        f: impl FnOnce(&mut T, &mut ObjectContext<'_>) -> R,
    ) -> ObjectResult<R>
    where
        T: CartaObject,
    {
        self.run(None, |ctx| ctx.with_object(path, f))
    }

    // ========================================================================
    // Commands and links
    // ========================================================================

    /// Routes a remote command to the object at `path`. Rejections come back
    /// as a non-empty `Ok` string; structural failures as `Err`.
    pub fn dispatch(
        &mut self,
        path: &ObjectPath,
        command: &str,
        raw_params: &str,
        session: Option<SessionId>,
    ) -> ObjectResult<String> {
        let id = self
            .store
            .id_of(path)
            .ok_or_else(|| ObjectError::NotFound(path.to_string()))?;
        self.run(session, |ctx| {
            ctx.checkout(id, |object, ctx| object.invoke_command(command, raw_params, ctx))?
        })
    }

    pub fn link(&mut self, host: &ObjectPath, target: &ObjectPath) -> ObjectResult<bool> {
        self.run(None, |ctx| ctx.link(host, target))
    }

    pub fn unlink(&mut self, host: &ObjectPath, target: &ObjectPath) -> ObjectResult<bool> {
        self.run(None, |ctx| ctx.unlink(host, target))
    }

    // ========================================================================
    // Change notification
    // ========================================================================

    /// Adds an observer called with the path of every object that reports a
    /// change, after that change is flushed.
    pub fn on_changed(&mut self, observer: impl FnMut(&ObjectPath) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Reports a change to `path` from outside any command.
    pub fn notify_changed(&mut self, path: &ObjectPath) {
        self.run(None, |ctx| ctx.notify_changed(path));
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Every object's state for `view`, keyed by path in creation order.
    pub fn snapshot(&self, view: SnapshotView) -> Value {
        let mut objects: Vec<&dyn CartaObject> = self.store.objects.values().map(|o| &**o).collect();
        objects.sort_unstable_by_key(|o| o.id());
        let mut document = Map::new();
        for object in objects {
            let raw = object.state_string(view);
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            document.insert(object.path().to_string(), value);
        }
        Value::Object(document)
    }

    /// Replaces an object's state from a preferences snapshot and
    /// publishes it.
    pub fn restore(&mut self, path: &ObjectPath, snapshot: &str) -> ObjectResult<()> {
        self.run(None, |ctx| {
            let id = ctx
                .id_of(path)
                .ok_or_else(|| ObjectError::NotFound(path.to_string()))?;
            ctx.checkout(id, |object, _| object.state_mut().restore(snapshot))??;
            ctx.notify_changed(path);
            Ok(())
        })
    }

    /// Marks every tree dirty and publishes them whole, for a session that
    /// joined late.
    pub fn refresh_all(&mut self) {
        for object in self.store.objects.values_mut() {
            object.state_mut().refresh();
        }
        self.settle();
    }

    // ========================================================================
    // Event driver
    // ========================================================================

    fn run<R>(&mut self, session: Option<SessionId>, f: impl FnOnce(&mut ObjectContext<'_>) -> R) -> R {
        let result = {
            let mut ctx = ObjectContext::new(&mut self.store, &self.factories, &self.hooks, session);
            f(&mut ctx)
        };
        self.settle();
        result
    }

    fn flush_all(&mut self) {
        for object in self.store.objects.values_mut() {
            object.state_mut().flush();
        }
    }

    /// Flushes, then delivers pending change notifications until none
    /// remain.
    fn settle(&mut self) {
        for _ in 0..MAX_NOTIFY_ROUNDS {
            self.flush_all();
            let pending = std::mem::take(&mut self.store.pending);
            if pending.is_empty() {
                return;
            }
            for target in pending {
                for observer in &mut self.observers {
                    observer(&target);
                }
                let hosts = self.store.subscribers(&target);
                let mut ctx = ObjectContext::new(&mut self.store, &self.factories, &self.hooks, None);
                for host in hosts {
                    ctx.deliver_link_changed(&host, &target);
                }
            }
        }
        warn!(
            dropped = self.store.pending.len(),
            "Change notifications did not settle"
        );
        self.store.pending.clear();
        self.flush_all();
    }
}

impl Drop for ObjectRegistry {
    fn drop(&mut self) {
        if !self.store.objects.is_empty() {
            self.shutdown();
        }
    }
}
