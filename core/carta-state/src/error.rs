//! Error types for state-tree operations.

use crate::value::ValueKind;
use thiserror::Error;

/// Result type for state-tree operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors raised by [`crate::StateTree`].
#[derive(Debug, Error)]
pub enum StateError {
    /// No node exists at the path.
    #[error("state path not found: {0}")]
    PathNotFound(String),

    /// The parent of the path being inserted does not exist.
    #[error("parent of state path does not exist: {0}")]
    ParentNotFound(String),

    /// The parent of the path being inserted is not an object node.
    #[error("state path is not an object: {0}")]
    NotAnObject(String),

    /// An array operation targeted a non-array node.
    #[error("state path is not an array: {0}")]
    NotAnArray(String),

    /// The stored node's type differs from the requested one.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// The value has no JSON form, such as a NaN or infinite float.
    #[error("value at {0} cannot be stored (not a finite number)")]
    Unrepresentable(String),

    /// A restored snapshot could not be parsed.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),
}
