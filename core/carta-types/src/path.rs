//! Hierarchical object paths.
//!
//! A path is a `/`-delimited sequence of segments, always absolute
//! (`/CartaObjects/c3`). Paths are compared by value; two references to the
//! same path denote the same object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between path segments, shared with state-tree paths.
pub const DELIMITER: &str = "/";

/// Absolute position of an object in the logical object hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Parses and normalizes a path: a leading delimiter is required, empty
    /// segments are dropped.
    pub fn new(raw: &str) -> crate::Result<Self> {
        if !raw.starts_with(DELIMITER) {
            return Err(crate::Error::InvalidPath(raw.to_string()));
        }
        let segments: Vec<&str> = raw.split(DELIMITER).filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(crate::Error::InvalidPath(raw.to_string()));
        }
        Ok(Self(format!("{DELIMITER}{}", segments.join(DELIMITER))))
    }

    /// Appends a child segment.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        Self(format!("{}{DELIMITER}{segment}", self.0))
    }

    /// Returns the parent path, or `None` for a single-segment path.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let idx = self.0.rfind(DELIMITER)?;
        (idx > 0).then(|| Self(self.0[..idx].to_string()))
    }

    /// Returns the final path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit(DELIMITER).next().unwrap_or_default()
    }

    /// Returns true if `self` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &ObjectPath) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0[ancestor.0.len()..].starts_with(DELIMITER)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectPath {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectPath {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
