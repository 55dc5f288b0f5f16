//! Hook dispatcher: ordered, short-circuiting, failure-isolated.

use crate::error::{HookError, HookResult};
use crate::hook::{Hook, HookId, HookPayload, HookRequest};
use crate::plugin::Plugin;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful [`HookDispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Name of the plugin that claimed the hook.
    pub handled_by: String,
    /// How many plugins were invoked, including the one that claimed it.
    pub attempts: usize,
}

/// Routes hook requests to subscribed plugins.
#[derive(Default)]
pub struct HookDispatcher {
    /// Loaded plugins in load order.
    plugins: Vec<Arc<dyn Plugin>>,
    /// Per-hook subscriber lists in registration order.
    routes: HashMap<HookId, Vec<Arc<dyn Plugin>>>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    // ================================================================
    // Registration
    // ================================================================

    /// Loads a plugin and subscribes it to every hook in its initial list.
    pub fn load_plugin(&mut self, plugin: Arc<dyn Plugin>) -> HookResult<()> {
        let name = plugin.name().to_string();
        if self.plugins.iter().any(|p| p.name() == name) {
            return Err(HookError::PluginAlreadyLoaded(name));
        }
        let hook_ids = plugin.initial_hook_list();
        for hook_id in &hook_ids {
            self.register_plugin(*hook_id, Arc::clone(&plugin));
        }
        info!(plugin = %name, hooks = hook_ids.len(), "Plugin loaded");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Appends a plugin to the subscriber list of one hook.
    pub fn register_plugin(&mut self, hook_id: HookId, plugin: Arc<dyn Plugin>) {
        debug!(plugin = %plugin.name(), hook = %hook_id, "Plugin subscribed to hook");
        self.routes.entry(hook_id).or_default().push(plugin);
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Number of plugins subscribed to `hook_id`.
    pub fn handler_count(&self, hook_id: HookId) -> usize {
        self.routes.get(&hook_id).map_or(0, Vec::len)
    }

    // ================================================================
    // Dispatch
    // ================================================================

    /// Offers the payload to each subscriber in order until one claims it.
    pub fn dispatch(&self, payload: &mut dyn HookPayload) -> HookResult<DispatchOutcome> {
        let hook_id = payload.hook_id();
        let subscribers = self.routes.get(&hook_id).map(Vec::as_slice).unwrap_or_default();

        for (index, plugin) in subscribers.iter().enumerate() {
            if invoke(&**plugin, payload) {
                debug!(plugin = %plugin.name(), hook = %hook_id, "Hook handled");
                return Ok(DispatchOutcome {
                    handled_by: plugin.name().to_string(),
                    attempts: index + 1,
                });
            }
        }
        Err(HookError::NoHandler(hook_id))
    }

    /// Offers the payload to every subscriber regardless of earlier claims.
    /// Returns how many plugins reported it handled.
    pub fn broadcast(&self, payload: &mut dyn HookPayload) -> usize {
        let hook_id = payload.hook_id();
        let mut handled = 0;
        for plugin in self.routes.get(&hook_id).into_iter().flatten() {
            if invoke(&**plugin, payload) {
                handled += 1;
            }
        }
        handled
    }

    /// Typed convenience over [`dispatch`](Self::dispatch).
    pub fn call<H: Hook>(&self, params: H::Params) -> HookResult<H::Output> {
        let mut request = HookRequest::<H>::new(params);
        let outcome = self.dispatch(&mut request)?;
        request.into_output().ok_or(HookError::EmptyResult {
            hook: H::ID,
            plugin: outcome.handled_by,
        })
    }
}

/// Runs one plugin handler, converting errors and panics into "not handled".
/// Output written by a failed handler is rolled back.
fn invoke(plugin: &dyn Plugin, payload: &mut dyn HookPayload) -> bool {
    let hook_id = payload.hook_id();
    let saved = payload.save_output();
    match panic::catch_unwind(AssertUnwindSafe(|| plugin.handle_hook(payload))) {
        Ok(Ok(handled)) => handled,
        Ok(Err(e)) => {
            warn!(plugin = %plugin.name(), hook = %hook_id, "Plugin hook handler failed: {:#}", e);
            payload.restore_output(saved);
            false
        }
        Err(_) => {
            warn!(plugin = %plugin.name(), hook = %hook_id, "Plugin hook handler panicked");
            payload.restore_output(saved);
            false
        }
    }
}
