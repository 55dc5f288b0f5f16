//! Core type definitions for the CARTA object substrate.
//!
//! This crate defines the identity types shared by every other crate:
//! - [`ObjectId`]: process-unique instance identifier (`c<N>`)
//! - [`ObjectPath`]: position of an object in the logical object hierarchy
//! - [`SessionId`]: identifies the remote view client issuing a command
//!
//! Domain objects (colormaps, animators, image controllers) live in
//! `carta-data`, not here.

mod ids;
mod path;

pub use ids::{ObjectId, SessionId};
pub use path::{ObjectPath, DELIMITER};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing identity types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),
}
