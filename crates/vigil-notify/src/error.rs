//! Error types for notification dispatch.

use thiserror::Error;
use vigil_core::{JoinedError, ValidationError};

/// Errors from building, validating or dispatching notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Config validation failed; holds the full multi-line report.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The connection URL could not be turned into a sender.
    #[error("{id}: failed to create {kind} sender: {reason}")]
    InvalidSender {
        /// Channel id.
        id: String,
        /// Resolved protocol kind.
        kind: String,
        /// Why the sender could not be created.
        reason: String,
    },

    /// A single channel exhausted its retries.
    #[error("failed {tries} times to send a {kind} message for {service_id} to {id} ({summary})")]
    Exhausted {
        /// Channel id.
        id: String,
        /// Resolved protocol kind.
        kind: String,
        /// Owning service id.
        service_id: String,
        /// Attempts made.
        tries: u8,
        /// Distinct attempt errors with occurrence counts.
        summary: String,
    },

    /// Combined terminal errors from a set-wide dispatch.
    #[error(transparent)]
    Aggregate(#[from] JoinedError),
}

/// A single transport attempt failure.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// Connection-level failure (DNS, refused, TLS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The destination answered outside the 2xx range.
    #[error("{endpoint} gave {status}: {body}")]
    Status {
        /// Endpoint the request went to.
        endpoint: String,
        /// HTTP status received.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The delivery could not be encoded for the destination.
    #[error("invalid payload: {0}")]
    Payload(String),

    /// The connection URL does not parse.
    #[error("invalid connection url {url:?}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parse failure detail.
        reason: String,
    },

    /// No transport knows how to carry this scheme.
    #[error("no transport for scheme {0:?}")]
    UnsupportedScheme(String),
}
