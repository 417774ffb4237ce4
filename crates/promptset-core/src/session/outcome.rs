use serde::Serialize;

use crate::error::{ErrorKind, SessionError};

/// Result of one coordinator operation as seen by a host.
///
/// Hosts that only care about the `(success, message, payload)` triple use
/// [`Outcome::into_parts`]; `error` carries the coarse failure class for
/// hosts that want to branch on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    pub message: String,
    pub payload: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl<T> Outcome<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload,
            error: None,
        }
    }

    /// A failed outcome carrying the error's message and an empty payload.
    pub fn failed(err: &SessionError) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            message: err.to_string(),
            payload: T::default(),
            error: Some(err.kind()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }

    pub fn into_parts(self) -> (bool, String, T) {
        (self.success, self.message, self.payload)
    }
}
