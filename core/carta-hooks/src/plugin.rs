//! Plugin capability surface seen by the dispatcher.

use crate::hook::{HookId, HookPayload};

/// A dynamically loaded extension.
///
/// The dispatcher only ever sees this capability surface; it never depends
/// on a plugin's concrete type. Handlers take `&self` because one plugin
/// instance is shared by every hook it subscribes to. Plugins that keep
/// mutable state use interior mutability.
pub trait Plugin: Send + Sync {
    /// Unique plugin name, used for logging and duplicate detection.
    fn name(&self) -> &str;

    /// Hooks this plugin wants to receive, declared once at load time.
    fn initial_hook_list(&self) -> Vec<HookId>;

    /// Handles one hook request. Return `Ok(true)` to claim the hook and stop
    /// dispatch, `Ok(false)` to pass it on. Errors are logged and treated as
    /// a pass.
    fn handle_hook(&self, payload: &mut dyn HookPayload) -> anyhow::Result<bool>;
}
