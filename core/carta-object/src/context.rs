//! Per-event access to the live object set.

use crate::error::{ObjectError, ObjectResult};
use crate::object::{CartaObject, ObjectFactory, ObjectInit};
use carta_hooks::HookDispatcher;
use carta_state::StateSink;
use carta_types::{ObjectId, ObjectPath, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) type FactoryTable = HashMap<String, Box<dyn ObjectFactory>>;

/// Live objects plus the indexes that address them.
pub(crate) struct ObjectStore {
    pub(crate) objects: HashMap<ObjectId, Box<dyn CartaObject>>,
    pub(crate) paths: HashMap<ObjectPath, ObjectId>,
    singletons: HashMap<String, ObjectPath>,
    /// Target path to the hosts linked to it.
    subscriptions: HashMap<ObjectPath, Vec<ObjectPath>>,
    /// Objects that reported a change during the current event.
    pub(crate) pending: Vec<ObjectPath>,
    next_id: ObjectId,
    root: ObjectPath,
    sink: Arc<dyn StateSink>,
}

impl ObjectStore {
    pub(crate) fn new(root: ObjectPath, sink: Arc<dyn StateSink>) -> Self {
        Self {
            objects: HashMap::new(),
            paths: HashMap::new(),
            singletons: HashMap::new(),
            subscriptions: HashMap::new(),
            pending: Vec::new(),
            next_id: ObjectId::from_raw(1),
            root,
            sink,
        }
    }

    pub(crate) fn root(&self) -> &ObjectPath {
        &self.root
    }

    pub(crate) fn id_of(&self, path: &ObjectPath) -> Option<ObjectId> {
        self.paths.get(path).copied()
    }

    pub(crate) fn subscribers(&self, target: &ObjectPath) -> Vec<ObjectPath> {
        self.subscriptions.get(target).cloned().unwrap_or_default()
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    fn checkout(&mut self, id: ObjectId) -> ObjectResult<Box<dyn CartaObject>> {
        self.objects
            .remove(&id)
            .ok_or_else(|| ObjectError::NotFound(id.to_string()))
    }

    fn checkin(&mut self, object: Box<dyn CartaObject>) {
        self.objects.insert(object.id(), object);
    }

    fn subscribe(&mut self, target: &ObjectPath, host: &ObjectPath) {
        let hosts = self.subscriptions.entry(target.clone()).or_default();
        if !hosts.contains(host) {
            hosts.push(host.clone());
        }
    }

    fn unsubscribe(&mut self, target: &ObjectPath, host: &ObjectPath) {
        if let Some(hosts) = self.subscriptions.get_mut(target) {
            hosts.retain(|h| h != host);
            if hosts.is_empty() {
                self.subscriptions.remove(target);
            }
        }
    }

    /// Drops every index entry for a destroyed object.
    fn forget(&mut self, path: &ObjectPath) {
        self.paths.remove(path);
        self.singletons.retain(|_, p| p != path);
        self.subscriptions.remove(path);
        self.subscriptions.retain(|_, hosts| {
            hosts.retain(|h| h != path);
            !hosts.is_empty()
        });
        self.pending.retain(|p| p != path);
    }
}

/// Handle through which an object reaches the rest of the system while
/// one of its callbacks runs.
///
/// The calling object is checked out for the duration, so lookups of its
/// own path return `None`.
pub struct ObjectContext<'a> {
    pub(crate) store: &'a mut ObjectStore,
    pub(crate) factories: &'a FactoryTable,
    hooks: &'a HookDispatcher,
    session: Option<SessionId>,
}

impl<'a> ObjectContext<'a> {
    pub(crate) fn new(
        store: &'a mut ObjectStore,
        factories: &'a FactoryTable,
        hooks: &'a HookDispatcher,
        session: Option<SessionId>,
    ) -> Self {
        Self {
            store,
            factories,
            hooks,
            session,
        }
    }

    pub fn hooks(&self) -> &HookDispatcher {
        self.hooks
    }

    /// Session that issued the current command, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session
    }

    /// Path under which new objects are created.
    pub fn root(&self) -> &ObjectPath {
        self.store.root()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Creates and initializes an instance of `class` at `<root>/c<N>`.
    pub fn create(&mut self, class: &str) -> ObjectResult<ObjectPath> {
        let id = self.store.allocate_id();
        let path = self.store.root().child(&id.to_string());
        self.construct(class, id, path)
    }

    /// Creates and initializes an instance of `class` at an explicit path.
    pub fn create_at(&mut self, class: &str, path: ObjectPath) -> ObjectResult<ObjectPath> {
        if self.store.paths.contains_key(&path) {
            return Err(ObjectError::AlreadyExists(path.to_string()));
        }
        let id = self.store.allocate_id();
        self.construct(class, id, path)
    }

    /// Returns the single instance of `class`, creating it at
    /// `<root>/<class>` on first use.
    pub fn find_singleton(&mut self, class: &str) -> ObjectResult<ObjectPath> {
        if let Some(path) = self.store.singletons.get(class) {
            if self.store.paths.contains_key(path) {
                return Ok(path.clone());
            }
        }
        let path = self.create_at(class, self.store.root().child(class))?;
        self.store.singletons.insert(class.to_string(), path.clone());
        Ok(path)
    }

    /// Tears down and removes an object, unlinking it from every host.
    /// Fails with [`ObjectError::NotFound`] if it is already gone.
    pub fn destroy(&mut self, id: ObjectId) -> ObjectResult<()> {
        let mut object = self.store.checkout(id)?;
        object.teardown(self);
        let path = object.path().clone();
        self.store.forget(&path);
        self.store.sink.retire(path.as_str());

        let hosts: Vec<ObjectId> = self
            .store
            .objects
            .values()
            .filter(|o| o.as_linkable().is_some_and(|l| l.link_set().contains(&path)))
            .map(|o| o.id())
            .collect();
        for host_id in hosts {
            let removed = self.checkout(host_id, |host, ctx| match host.as_linkable_mut() {
                Some(linkable) => linkable.remove_link(&mut *object, ctx),
                None => Ok(false),
            });
            if let Err(err) | Ok(Err(err)) = removed {
                warn!(host = %host_id, target = %path, error = %err, "Failed to unlink destroyed object");
            }
        }

        info!(id = %id, path = %path, class = object.class_name(), "Destroyed object");
        Ok(())
    }

    pub fn destroy_path(&mut self, path: &ObjectPath) -> ObjectResult<()> {
        let id = self
            .store
            .id_of(path)
            .ok_or_else(|| ObjectError::NotFound(path.to_string()))?;
        self.destroy(id)
    }

    fn construct(&mut self, class: &str, id: ObjectId, path: ObjectPath) -> ObjectResult<ObjectPath> {
        let factories = self.factories;
        let factory = factories
            .get(class)
            .ok_or_else(|| ObjectError::UnknownClass(class.to_string()))?;
        let init = ObjectInit {
            path: path.clone(),
            id,
            sink: Arc::clone(&self.store.sink),
        };
        let mut object = factory.create(init)?;

        // Reserve the path so nothing created during initialize can take it.
        self.store.paths.insert(path.clone(), id);
        if let Err(err) = object.initialize(self) {
            object.teardown(self);
            self.store.paths.remove(&path);
            warn!(class, path = %path, error = %err, "Object failed to initialize");
            return Err(err);
        }
        object.state_mut().flush();
        self.store.objects.insert(id, object);
        info!(id = %id, path = %path, class, "Created object");
        Ok(path)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn contains(&self, path: &ObjectPath) -> bool {
        self.get(path).is_some()
    }

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

    /// Runs `f` on the object at `path` as a `T`, with a context for
    /// reaching further objects.
    pub fn with_object<T, R>(
        &mut self,
        path: &ObjectPath,
        f: impl FnOnce(&mut T, &mut ObjectContext<'_>) -> R,
    ) -> ObjectResult<R>
    where
        T: CartaObject,
    {
        let id = self
            .store
            .id_of(path)
            .ok_or_else(|| ObjectError::NotFound(path.to_string()))?;
        self.checkout(id, |object, ctx| object.downcast_mut::<T>().map(|typed| f(typed, ctx)))?
            .ok_or_else(|| ObjectError::InvalidTarget(path.to_string()))
    }

    pub(crate) fn checkout<R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut dyn CartaObject, &mut ObjectContext<'_>) -> R,
    ) -> ObjectResult<R> {
        let mut object = self.store.checkout(id)?;
        let result = f(&mut *object, self);
        self.store.checkin(object);
        Ok(result)
    }

    fn with_pair<R>(
        &mut self,
        first: ObjectId,
        second: ObjectId,
        f: impl FnOnce(&mut dyn CartaObject, &mut dyn CartaObject, &mut ObjectContext<'_>) -> R,
    ) -> ObjectResult<R> {
        let mut a = self.store.checkout(first)?;
        let mut b = match self.store.checkout(second) {
            Ok(b) => b,
            Err(err) => {
                self.store.checkin(a);
                return Err(err);
            }
        };
        let result = f(&mut *a, &mut *b, self);
        self.store.checkin(b);
        self.store.checkin(a);
        Ok(result)
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Links `target` into `host`'s link set and subscribes `host` to
    /// `target`'s change notifications.
    pub fn link(&mut self, host: &ObjectPath, target: &ObjectPath) -> ObjectResult<bool> {
        let host_id = self
            .store
            .id_of(host)
            .ok_or_else(|| ObjectError::NotFound(host.to_string()))?;
        let target_id = self
            .store
            .id_of(target)
            .filter(|id| *id != host_id)
            .ok_or_else(|| ObjectError::InvalidTarget(target.to_string()))?;

        let added = self.with_pair(host_id, target_id, |host_obj, target_obj, ctx| {
            let host_path = host_obj.path().to_string();
            host_obj
                .as_linkable_mut()
                .ok_or(ObjectError::NotLinkable(host_path))?
                .add_link(target_obj, ctx)
        })??;
        if added {
            self.store.subscribe(target, host);
            debug!(host = %host, target = %target, "Linked");
        }
        Ok(added)
    }

    /// Removes `target` from `host`'s link set. `Ok(false)` when it was not
    /// linked.
    pub fn unlink(&mut self, host: &ObjectPath, target: &ObjectPath) -> ObjectResult<bool> {
        let host_id = self
            .store
            .id_of(host)
            .ok_or_else(|| ObjectError::NotFound(host.to_string()))?;
        let target_id = self
            .store
            .id_of(target)
            .filter(|id| *id != host_id)
            .ok_or_else(|| ObjectError::InvalidTarget(target.to_string()))?;

        let removed = self.with_pair(host_id, target_id, |host_obj, target_obj, ctx| {
            let host_path = host_obj.path().to_string();
            host_obj
                .as_linkable_mut()
                .ok_or(ObjectError::NotLinkable(host_path))?
                .remove_link(target_obj, ctx)
        })??;
        if removed {
            self.store.unsubscribe(target, host);
            debug!(host = %host, target = %target, "Unlinked");
        }
        Ok(removed)
    }

    // ========================================================================
    // Change notification
    // ========================================================================

    /// Records that the object at `path` changed. Linked hosts and registry
    /// observers are told once the current event finishes.
    pub fn notify_changed(&mut self, path: &ObjectPath) {
        if !self.store.pending.contains(path) {
            self.store.pending.push(path.clone());
        }
    }

    pub(crate) fn deliver_link_changed(&mut self, host: &ObjectPath, target: &ObjectPath) {
        let (Some(host_id), Some(target_id)) = (self.store.id_of(host), self.store.id_of(target)) else {
            return;
        };
        let delivered = self.with_pair(host_id, target_id, |host_obj, target_obj, ctx| {
            if let Some(linkable) = host_obj.as_linkable_mut() {
                linkable.on_link_changed(target_obj, ctx);
            }
        });
        if let Err(err) = delivered {
            debug!(host = %host, target = %target, error = %err, "Skipped link change delivery");
        }
    }
}
