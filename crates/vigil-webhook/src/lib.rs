//! Webhook triggers for release events.
//!
//! A service configures a set of outbound webhooks fired when a new
//! version is approved. Each webhook resolves its settings through the
//! four-level cascade, builds a GitHub-style signed push request or a
//! GitLab-style token request, retries with backoff, and keeps per-item
//! scheduling state (`next_runnable`) so the same trigger is never
//! hammered or double-fired. Exhausted retries raise the fallback
//! notifiers unless the webhook is set to fail silently.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod announce;
pub mod config;
mod error;
pub mod request;
pub mod schedule;
pub mod send;
pub mod validate;

pub use config::{Header, WebHook, WebhookDefaults, WebhookSet};
pub use error::WebhookError;
