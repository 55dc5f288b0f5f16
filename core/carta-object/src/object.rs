//! The capability surface shared by every addressable object.

use crate::context::ObjectContext;
use crate::error::{ObjectError, ObjectResult};
use crate::linkable::Linkable;
use carta_state::{SnapshotView, StateSink, StateTree};
use carta_types::{ObjectId, ObjectPath};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;

/// Upcast to `Any` for downcasting trait objects to concrete classes.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Identity and state every object carries.
pub struct ObjectCore {
    class_name: &'static str,
    path: ObjectPath,
    id: ObjectId,
    state: StateTree,
}

impl ObjectCore {
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn state(&self) -> &StateTree {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateTree {
        &mut self.state
    }
}

/// Everything a factory needs to construct one instance.
pub struct ObjectInit {
    pub path: ObjectPath,
    pub id: ObjectId,
    pub(crate) sink: Arc<dyn StateSink>,
}

impl ObjectInit {
    /// Builds the object core, with a state tree publishing under the
    /// object's path.
    pub fn into_core(self, class_name: &'static str) -> ObjectCore {
        let state = StateTree::with_sink(self.path.as_str(), self.sink);
        ObjectCore {
            class_name,
            path: self.path,
            id: self.id,
            state,
        }
    }
}

/// Constructs instances of one class.
pub trait ObjectFactory: Send + Sync {
    fn create(&self, init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>>;
}

impl<F> ObjectFactory for F
where
    F: Fn(ObjectInit) -> ObjectResult<Box<dyn CartaObject>> + Send + Sync,
{
    fn create(&self, init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        self(init)
    }
}

/// A named, path-addressable unit of server state.
///
/// Objects are owned by the registry. During any callback the object is
/// checked out of the registry, so the [`ObjectContext`] it receives can
/// reach every *other* live object but not itself.
pub trait CartaObject: AsAny + Send + 'static {
    fn core(&self) -> &ObjectCore;
    fn core_mut(&mut self) -> &mut ObjectCore;

    fn class_name(&self) -> &'static str {
        self.core().class_name()
    }

    fn path(&self) -> &ObjectPath {
        self.core().path()
    }

    fn id(&self) -> ObjectId {
        self.core().id()
    }

    fn state(&self) -> &StateTree {
        self.core().state()
    }

    fn state_mut(&mut self) -> &mut StateTree {
        self.core_mut().state_mut()
    }

    /// Runs once after construction, before the object is visible to
    /// lookups. Owned children are created here.
    fn initialize(&mut self, _ctx: &mut ObjectContext<'_>) -> ObjectResult<()> {
        Ok(())
    }

    /// Runs once on destruction. Owned children are destroyed here.
    fn teardown(&mut self, _ctx: &mut ObjectContext<'_>) {}

    /// Runs a named remote command. Classes with a [`crate::CommandRouter`]
    /// forward to it; the default knows no commands.
    fn invoke_command(
        &mut self,
        name: &str,
        _raw_params: &str,
        _ctx: &mut ObjectContext<'_>,
    ) -> ObjectResult<String> {
        Err(ObjectError::UnknownCommand {
            path: self.path().to_string(),
            command: name.to_string(),
        })
    }

    fn as_linkable(&self) -> Option<&dyn Linkable> {
        None
    }

    fn as_linkable_mut(&mut self) -> Option<&mut dyn Linkable> {
        None
    }

    /// Serialized state for one snapshot view.
    fn state_string(&self, view: SnapshotView) -> String {
        match view {
            SnapshotView::Preferences => self.state().to_string(),
            SnapshotView::Layout => {
                let links: Vec<&str> = self
                    .as_linkable()
                    .map(|l| l.link_set().targets().iter().map(ObjectPath::as_str).collect())
                    .unwrap_or_default();
                json!({
                    "class": self.class_name(),
                    "path": self.path(),
                    "links": links,
                })
                .to_string()
            }
        }
    }
}

impl<'a> dyn CartaObject + 'a {
    pub fn is<T: CartaObject>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: CartaObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: CartaObject>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
