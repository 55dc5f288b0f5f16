//! Synchronization bridge between the object registry and remote views.
//!
//! [`SyncBridge`] is the [`carta_state::StateSink`] every state tree
//! publishes to; it fans flushed updates out to subscribers and keeps the
//! latest document per object for late joiners. [`EventLoop`] owns the
//! registry and applies remote commands one at a time, in arrival order.

mod bridge;
mod error;
mod event_loop;
pub mod protocol;

pub use bridge::SyncBridge;
pub use error::{SyncError, SyncResult};
pub use event_loop::{Event, EventLoop, EventLoopHandle};
pub use protocol::{CommandRequest, CommandResponse, SyncMessage, PROTOCOL_VERSION};
