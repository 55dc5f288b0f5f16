//! Addressable objects for CARTA.
//!
//! - [`ObjectRegistry`]: factory table plus the live-instance map; creates,
//!   resolves, and destroys objects and routes remote commands to them
//! - [`CartaObject`]: the capability surface every object implements
//! - [`LinkableSet`] / [`Linkable`]: ordered, duplicate-free links from a
//!   host object to targets, mirrored into the host's state tree
//! - [`CommandRouter`]: per-class table of named commands with
//!   `key=value` parameter parsing
//!
//! Objects never hold references to each other. Links are stored as paths
//! and resolved through an [`ObjectContext`] for the duration of one event.

mod command;
mod context;
mod error;
mod linkable;
mod object;
mod params;
mod registry;

pub use command::{command_post_process, CommandRouter};
pub use context::ObjectContext;
pub use error::{ObjectError, ObjectResult};
pub use linkable::{Linkable, LinkableSet, LINKS};
pub use object::{AsAny, CartaObject, ObjectCore, ObjectFactory, ObjectInit};
pub use params::ParamMap;
pub use registry::{ObjectRegistry, RegistryConfig, DEFAULT_ROOT};
