//! Key/value JSON persistence.
//!
//! Every durable piece of state (normalized presets, activation markers,
//! group definitions, the session record) is a JSON blob under a
//! slash-separated key such as `groups/roleplay`. The [`JsonStore`] trait
//! is the only seam the rest of the crate touches.

pub mod fs;
pub mod memory;

use std::path::PathBuf;

pub use fs::FsJsonStore;
pub use memory::MemoryJsonStore;

/// Namespace for normalized preset records.
pub const EXTRACTED_NS: &str = "extracted";
/// Namespace for per-preset activation markers.
pub const ACTIVATION_NS: &str = "activation";
/// Namespace for per-preset group definitions.
pub const GROUPS_NS: &str = "groups";
/// Key of the session record.
pub const SESSION_KEY: &str = "session";

/// Errors raised by a [`JsonStore`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON under key {key:?}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A synchronous JSON blob store.
pub trait JsonStore {
    /// Read the value under `key`. Returns `Ok(None)` if nothing is stored.
    fn read_json(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    fn write_json(&mut self, key: &str, value: &serde_json::Value) -> Result<(), StorageError>;

    /// List the names stored directly under `namespace`, in ascending order.
    fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError>;
}

/// Build `<namespace>/<name>`.
pub fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Check that `segment` can be used as one path component of a key.
///
/// Rejects empty strings, `.`-prefixed names (which also covers `.` and
/// `..`), path separators and control characters.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Validate a full key and split it into segments.
pub fn key_segments(key: &str) -> Result<Vec<&str>, StorageError> {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.iter().all(|s| is_safe_segment(s)) {
        Ok(segments)
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_segments() {
        assert!(is_safe_segment("roleplay"));
        assert!(is_safe_segment("my preset (v2)"));
        assert!(!is_safe_segment(""));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment(".hidden"));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment("a\\b"));
        assert!(!is_safe_segment("a\nb"));
    }

    #[test]
    fn key_segments_validates_every_part() {
        assert_eq!(key_segments("groups/rp").unwrap(), vec!["groups", "rp"]);
        assert!(key_segments("groups/../etc").is_err());
        assert!(key_segments("groups/").is_err());
        assert!(key_segments("/abs").is_err());
    }
}
