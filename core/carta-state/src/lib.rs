//! Hierarchical state tree for CARTA objects.
//!
//! Every addressable object owns exactly one [`StateTree`]: a nested
//! document of scalar values, objects, and resizable arrays addressed by
//! `/`-delimited paths (`colorMix/redPercent`, `links/0`).
//!
//! Mutations are staged in a working copy and only become visible to
//! observers at [`StateTree::flush`], which publishes every dirty path as one
//! [`StateUpdate`] to the tree's [`StateSink`]. Snapshots always read the
//! published copy, so a partially applied multi-field change is never seen.

mod error;
mod tree;
mod update;
mod value;

pub use error::{StateError, StateResult};
pub use tree::{SnapshotView, StateTree};
pub use update::{NullSink, StateChange, StateSink, StateUpdate};
pub use value::{StateValue, ValueKind};
