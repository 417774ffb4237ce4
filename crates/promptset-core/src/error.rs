//! Error taxonomy for coordinator operations.
//!
//! Components return [`SessionError`]; the coordinator converts it into a
//! failed [`crate::Outcome`] at its boundary so nothing propagates to the
//! host.

use std::fmt;

use serde::Serialize;

use crate::storage::StorageError;

/// Coarse classification surfaced to hosts alongside a failed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Persistence,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Persistence => "persistence",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Bad input: empty name, out-of-range index, malformed index list.
    #[error("{0}")]
    Validation(String),

    /// Unknown preset or group.
    #[error("{0}")]
    NotFound(String),

    /// A store write (or a read during initialization) failed.
    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: StorageError,
    },

    /// An invariant the coordinator relies on did not hold.
    #[error("{0}")]
    Internal(String),
}

impl SessionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn persistence(context: impl Into<String>, source: StorageError) -> Self {
        Self::Persistence {
            context: context.into(),
            source,
        }
    }

    /// Out-of-range indices against a list of `len` entries, e.g.
    /// `invalid prompt indices: 3, 7 (valid range is 0-2)`.
    pub fn invalid_indices(what: &str, invalid: &[usize], len: usize) -> Self {
        let listed: Vec<String> = invalid.iter().map(usize::to_string).collect();
        let range = match len {
            0 => "the list is empty".to_owned(),
            n => format!("valid range is 0-{}", n - 1),
        };
        Self::Validation(format!(
            "invalid {what} indices: {} ({range})",
            listed.join(", ")
        ))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Attach a context message to a storage result.
pub(crate) trait StorageContext<T> {
    fn persist_context(self, context: impl FnOnce() -> String) -> Result<T, SessionError>;
}

impl<T> StorageContext<T> for Result<T, StorageError> {
    fn persist_context(self, context: impl FnOnce() -> String) -> Result<T, SessionError> {
        self.map_err(|source| SessionError::persistence(context(), source))
    }
}
