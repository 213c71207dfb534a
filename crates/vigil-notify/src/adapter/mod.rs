//! Protocol adapter registry.
//!
//! Each supported protocol implements [`Adapter`]: how its connection URL
//! is assembled from resolved fields, which fields are mandatory, and any
//! one-off normalization it applies at validation time. Adapters are looked
//! up through a registry table so every protocol stays independently
//! testable and new ones slot in without touching a central switch.

use std::fmt;

use crate::config::Notifier;

mod chat;
mod misc;
mod push;

pub use chat::{Discord, GoogleChat, Matrix, Mattermost, RocketChat, Slack, Teams, Telegram, Zulip};
pub use misc::{Generic, Raw, Smtp};
pub use push::{Bark, Gotify, Ifttt, Join, Ntfy, OpsGenie, PushBullet, Pushover};

/// Read access to a channel's resolved fields during URL building.
pub struct FieldView<'a> {
    notifier: &'a Notifier,
}

impl<'a> FieldView<'a> {
    /// Wraps a notifier for adapter access.
    pub fn new(notifier: &'a Notifier) -> Self {
        Self { notifier }
    }

    /// Resolved URL field (empty when unset at every level).
    pub fn url_field(&self, key: &str) -> String {
        self.notifier.url_field(key)
    }

    /// Resolved param (empty when unset at every level).
    pub fn param(&self, key: &str) -> String {
        self.notifier.param(key)
    }
}

/// Accumulated required-field failures, split by config section.
#[derive(Debug, Default)]
pub struct RequiredErrors {
    /// Failures under `url_fields`.
    pub url_fields: Vec<String>,
    /// Failures under `params`.
    pub params: Vec<String>,
}

impl RequiredErrors {
    /// Records a missing URL field, with an example where one helps.
    pub fn require_url_field(&mut self, f: &FieldView<'_>, key: &str, example: Option<&str>) {
        if f.url_field(key).is_empty() {
            self.url_fields.push(required_line(key, example));
        }
    }

    /// Records a missing param.
    pub fn require_param(&mut self, f: &FieldView<'_>, key: &str, example: Option<&str>) {
        if f.param(key).is_empty() {
            self.params.push(required_line(key, example));
        }
    }

    /// Records an invalid (present but unusable) URL field.
    pub fn invalid_url_field(&mut self, key: &str, value: &str, reason: &str) {
        self.url_fields
            .push(format!("{key}: {value:?} <invalid> ({reason})"));
    }

    /// Whether anything failed.
    pub fn is_empty(&self) -> bool {
        self.url_fields.is_empty() && self.params.is_empty()
    }
}

fn required_line(key: &str, example: Option<&str>) -> String {
    match example {
        Some(example) => format!("{key}: <required> e.g. '{example}'"),
        None => format!("{key}: <required>"),
    }
}

/// One protocol's URL construction and validation rules.
pub trait Adapter: Send + Sync + fmt::Debug {
    /// The protocol kind this adapter serves.
    fn kind(&self) -> &'static str;

    /// Assembles the connection URL from resolved fields.
    fn build_url(&self, f: &FieldView<'_>) -> String;

    /// Records every missing mandatory field; never short-circuits.
    fn required_fields(&self, f: &FieldView<'_>, errs: &mut RequiredErrors);

    /// Protocol-specific normalization, run once at validation time.
    fn normalize(&self, _notifier: &mut Notifier) {}
}

static ADAPTERS: &[&(dyn Adapter)] = &[
    &Bark,
    &Discord,
    &Smtp,
    &Gotify,
    &GoogleChat,
    &Ifttt,
    &Join,
    &Mattermost,
    &Matrix,
    &Ntfy,
    &OpsGenie,
    &PushBullet,
    &Pushover,
    &RocketChat,
    &Slack,
    &Teams,
    &Telegram,
    &Zulip,
    &Generic,
    &Raw,
];

/// Looks up the adapter for a protocol kind.
pub fn adapter_for(kind: &str) -> Option<&'static dyn Adapter> {
    ADAPTERS.iter().find(|a| a.kind() == kind).copied()
}

/// Every supported protocol kind, in registry order.
pub fn supported_kinds() -> Vec<&'static str> {
    ADAPTERS.iter().map(|a| a.kind()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_twenty_kinds() {
        assert_eq!(supported_kinds().len(), 20);
    }

    #[test]
    fn lookup_by_kind() {
        assert_eq!(adapter_for("slack").unwrap().kind(), "slack");
        assert_eq!(adapter_for("gotify").unwrap().kind(), "gotify");
        assert!(adapter_for("carrier-pigeon").is_none());
    }

    #[test]
    fn kinds_are_unique() {
        let mut kinds = supported_kinds();
        kinds.sort_unstable();
        let len = kinds.len();
        kinds.dedup();
        assert_eq!(kinds.len(), len);
    }
}
