//! Error types for hook dispatch.

use crate::hook::HookId;
use thiserror::Error;

/// Result type for hook dispatch.
pub type HookResult<T> = Result<T, HookError>;

#[derive(Debug, Error)]
pub enum HookError {
    /// Every registered plugin passed on the hook (or none is registered).
    #[error("no plugin handled hook '{0}'")]
    NoHandler(HookId),

    #[error("plugin already loaded: {0}")]
    PluginAlreadyLoaded(String),

    /// A plugin claimed the hook but left no result in the payload.
    #[error("plugin '{plugin}' handled hook '{hook}' without producing a result")]
    EmptyResult { hook: HookId, plugin: String },
}
