//! Error types for the API client.
//!
//! # Design
//! Every failure that leaves the request core is an `ApiError`. It always
//! carries a human-readable message; `status` is `Some` exactly when the
//! backend answered with an HTTP response. The remaining failures are split
//! into connectivity errors (no response reached the client) and
//! unclassified errors (decode failures, errors raised by caller code).
//!
//! `ApiError` is `Clone` because lifecycle hooks both store an error in their
//! state and hand it back to the caller.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Message used when the transport could not reach the backend at all.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error: Could not connect to the server. Make sure your backend is running.";

/// Message used when a failure carries no message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Shared, type-erased source error.
pub type BoxedSource = Arc<dyn StdError + Send + Sync + 'static>;

/// Broad class of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend responded with a non-2xx status.
    Application,
    /// No response reached the client.
    Connectivity,
    /// Anything else: decode failures, serialization failures, caller errors.
    Unclassified,
}

/// Opaque payload attached to an `ApiError`.
#[derive(Clone)]
pub enum ErrorCause {
    /// The full parsed body of a failing response.
    Body(Value),
    /// The underlying failure that was normalized into this error.
    Source(BoxedSource),
}

impl fmt::Debug for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCause::Body(body) => f.debug_tuple("Body").field(body).finish(),
            ErrorCause::Source(source) => f.debug_tuple("Source").field(&source.to_string()).finish(),
        }
    }
}

/// The normalized error returned by every request.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    cause: Option<ErrorCause>,
}

impl ApiError {
    /// Error for a response whose status indicates failure.
    ///
    /// The message is taken from the body's `message` field, then its `error`
    /// field, falling back to a generic one built from the status code.
    pub fn application(status: u16, body: Value) -> Self {
        let message = body_message(&body).unwrap_or_else(|| format!("HTTP error! status: {status}"));
        Self {
            kind: ErrorKind::Application,
            message,
            status: Some(status),
            cause: Some(ErrorCause::Body(body)),
        }
    }

    /// Error for a request that never reached a server.
    pub fn connectivity<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            kind: ErrorKind::Connectivity,
            message: NETWORK_ERROR_MESSAGE.to_string(),
            status: None,
            cause: Some(ErrorCause::Source(Arc::new(source))),
        }
    }

    /// Error for any other failure; the message comes from the source.
    pub fn unclassified<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let source: BoxedSource = Arc::new(source);
        let message = match source.to_string() {
            m if m.is_empty() => UNKNOWN_ERROR_MESSAGE.to_string(),
            m => m,
        };
        Self {
            kind: ErrorKind::Unclassified,
            message,
            status: None,
            cause: Some(ErrorCause::Source(source)),
        }
    }

    /// Unclassified error with the generic message and no cause.
    pub fn unknown() -> Self {
        Self {
            kind: ErrorKind::Unclassified,
            message: UNKNOWN_ERROR_MESSAGE.to_string(),
            status: None,
            cause: None,
        }
    }

    /// Normalize an arbitrary failure raised by caller-supplied code.
    ///
    /// An `ApiError` passes through unchanged. Anything else becomes an
    /// unclassified error with the generic message, keeping the failure as
    /// its cause.
    pub fn from_failure(failure: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        match failure.downcast::<ApiError>() {
            Ok(api) => *api,
            Err(other) => Self {
                cause: Some(ErrorCause::Source(Arc::from(other))),
                ..Self::unknown()
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// The parsed response body, for application errors.
    pub fn body(&self) -> Option<&Value> {
        match &self.cause {
            Some(ErrorCause::Body(body)) => Some(body),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Connectivity
    }
}

/// Only non-empty string `message`/`error` fields count as a message.
fn body_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| body.get(key))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
