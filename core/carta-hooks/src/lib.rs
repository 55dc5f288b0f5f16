//! Plugin hook dispatch for CARTA.
//!
//! Plugins declare which hooks they want at load time and receive typed
//! hook requests through an opaque [`HookPayload`]. The [`HookDispatcher`]
//! calls plugins in registration order and stops at the first one that
//! reports the hook handled. A plugin that errors or panics is logged and
//! skipped; it never aborts dispatch to the remaining plugins.
//!
//! Hook types shipped with the core live in [`hooks`].

mod dispatcher;
mod error;
mod hook;
pub mod hooks;
mod plugin;

pub use dispatcher::{DispatchOutcome, HookDispatcher};
pub use error::{HookError, HookResult};
pub use hook::{Hook, HookId, HookPayload, HookRequest};
pub use plugin::Plugin;
