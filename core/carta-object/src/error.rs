//! Error types for registry, link, and command operations.

use carta_state::StateError;
use thiserror::Error;

/// Result type for object operations.
pub type ObjectResult<T> = Result<T, ObjectError>;

/// Structural failures. Business-rule rejections inside a command handler
/// are never reported here; handlers return them as result strings.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// No factory is registered for the class name.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// No live object has this id or path.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A live object already uses this id or path.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// The link target is missing or of a kind the host cannot link to.
    #[error("invalid link target: {0}")]
    InvalidTarget(String),

    /// The host object does not support links.
    #[error("object does not support links: {0}")]
    NotLinkable(String),

    #[error("link index {index} out of range (count {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown command '{command}' on {path}")]
    UnknownCommand { path: String, command: String },

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("invalid identifier: {0}")]
    Identifier(#[from] carta_types::Error),
}
