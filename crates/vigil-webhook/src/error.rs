//! Error types for webhook dispatch.

use thiserror::Error;
use vigil_core::{JoinedError, ValidationError};

/// Errors from building, validating or firing webhooks.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Config validation failed; holds the full multi-line report.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The HTTP client or request could not be constructed.
    #[error("{id}: failed to build webhook request: {reason}")]
    Build {
        /// Webhook id.
        id: String,
        /// What went wrong.
        reason: String,
    },

    /// Connection-level failure on one attempt.
    #[error("{id}: network error: {reason}")]
    Network {
        /// Webhook id.
        id: String,
        /// Failure detail.
        reason: String,
    },

    /// The endpoint answered with an unwanted status or a rejecting body.
    #[error("{id} gave {got}, not {wanted}: {body}")]
    Rejected {
        /// Webhook id.
        id: String,
        /// Status received.
        got: u16,
        /// Status wanted (`2XX` when any success code is accepted).
        wanted: String,
        /// Response body (truncated).
        body: String,
    },

    /// A single webhook exhausted its retries.
    #[error("failed {tries} times to send the webhook for {service_id} to {id}")]
    Exhausted {
        /// Webhook id.
        id: String,
        /// Owning service id.
        service_id: String,
        /// Attempts made.
        tries: u8,
    },

    /// Combined terminal errors from a set-wide dispatch.
    #[error(transparent)]
    Aggregate(#[from] JoinedError),
}
