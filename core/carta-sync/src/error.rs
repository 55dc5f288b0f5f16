//! Error types for the sync layer.

use carta_hooks::HookError;
use carta_object::ObjectError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed request from a remote view.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Hook(#[from] HookError),

    /// The event loop has stopped.
    #[error("channel closed")]
    ChannelClosed,
}
