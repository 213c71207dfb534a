//! Notification channels for release events.
//!
//! A service configures a set of notification channels (Slack, Discord,
//! SMTP, Gotify, …). Each channel resolves its settings through the
//! four-level cascade (item → main → defaults → hard defaults), builds a
//! protocol connection URL through the adapter registry, and is dispatched
//! concurrently with bounded retries by the engine in [`engine`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌───────────────────┐
//! │ NotifierSet │──▶│ Adapter registry │──▶│ Transport (seam)  │
//! │ (engine)    │   │ (URL + validate) │   │ reqwest / lettre  │
//! └─────────────┘   └──────────────────┘   └───────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod config;
pub mod defaults;
pub mod engine;
mod error;
#[cfg(test)]
pub(crate) mod testutil;
pub mod transport;
pub mod validate;

pub use config::{Notifier, NotifierDefaults, NotifierSet};
pub use error::{NotifyError, SendError};
pub use transport::{Delivery, ProtocolTransport, Transport};
