//! Ordered, duplicate-free links from a host object to its targets.

use crate::context::ObjectContext;
use crate::error::{ObjectError, ObjectResult};
use crate::object::CartaObject;
use carta_state::StateTree;
use carta_types::ObjectPath;

/// State-tree array that mirrors a host's link list.
pub const LINKS: &str = "links";

/// The link list of one host object.
///
/// Targets are held as paths, never as references; the registry resolves
/// them per event. After every successful mutation the list is mirrored
/// into the host's `links` array so a flush publishes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkableSet {
    targets: Vec<ObjectPath>,
}

impl LinkableSet {
    /// Creates an empty set and its `links` array in `state`.
    pub fn new(state: &mut StateTree) -> ObjectResult<Self> {
        state.insert_array(LINKS, 0)?;
        Ok(Self::default())
    }

    /// Appends `target` unless already present. Re-adding an existing
    /// target is a successful no-op, so this always returns `true`.
    pub fn add_link(&mut self, state: &mut StateTree, target: &ObjectPath) -> ObjectResult<bool> {
        if !self.contains(target) {
            self.targets.push(target.clone());
            self.mirror(state)?;
        }
        Ok(true)
    }

    /// Removes `target`. Returns `false` when it was not linked.
    pub fn remove_link(&mut self, state: &mut StateTree, target: &ObjectPath) -> ObjectResult<bool> {
        let Some(index) = self.targets.iter().position(|t| t == target) else {
            return Ok(false);
        };
        self.targets.remove(index);
        self.mirror(state)?;
        Ok(true)
    }

    pub fn clear(&mut self, state: &mut StateTree) -> ObjectResult<()> {
        self.targets.clear();
        self.mirror(state)
    }

    pub fn contains(&self, target: &ObjectPath) -> bool {
        self.targets.contains(target)
    }

    /// Targets in insertion order.
    pub fn targets(&self) -> &[ObjectPath] {
        &self.targets
    }

    /// Number of links as recorded in `state`.
    pub fn link_count(&self, state: &StateTree) -> ObjectResult<usize> {
        Ok(state.get_array_size(LINKS)?)
    }

    /// Target paths as recorded in `state`.
    pub fn links(&self, state: &StateTree) -> ObjectResult<Vec<String>> {
        let count = self.link_count(state)?;
        (0..count).map(|index| self.link_id(state, index)).collect()
    }

    /// Target path at `index` as recorded in `state`.
    pub fn link_id(&self, state: &StateTree, index: usize) -> ObjectResult<String> {
        let len = self.link_count(state)?;
        if index >= len {
            return Err(ObjectError::IndexOutOfRange { index, len });
        }
        Ok(state.get_value::<String>(&format!("{LINKS}/{index}"))?)
    }

    fn mirror(&self, state: &mut StateTree) -> ObjectResult<()> {
        state.resize_array(LINKS, self.targets.len())?;
        for (index, target) in self.targets.iter().enumerate() {
            state.set_value(&format!("{LINKS}/{index}"), target.to_string())?;
        }
        Ok(())
    }
}

/// Host side of linking. Implementors own a [`LinkableSet`] and decide
/// which target classes they accept.
pub trait Linkable {
    fn link_set(&self) -> &LinkableSet;

    /// Links `target`. Returns [`ObjectError::InvalidTarget`] when the target
    /// is of a class the host cannot link to.
    fn add_link(&mut self, target: &mut dyn CartaObject, ctx: &mut ObjectContext<'_>) -> ObjectResult<bool>;

    /// Unlinks `target`; `Ok(false)` when it was not linked.
    fn remove_link(&mut self, target: &mut dyn CartaObject, ctx: &mut ObjectContext<'_>) -> ObjectResult<bool>;

    /// Called when a linked target reports a change.
    fn on_link_changed(&mut self, _target: &mut dyn CartaObject, _ctx: &mut ObjectContext<'_>) {}
}
