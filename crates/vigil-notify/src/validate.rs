//! Validation and field normalization for notification channels.
//!
//! Runs once at load time, before any concurrent dispatch: self-corrects
//! common config slips (leading `:` on ports, scheme-qualified hosts),
//! applies protocol-specific fixups, and accumulates every failure into a
//! path-labelled report. Corrections are written into the channel's own
//! maps only, so shared lower levels stay untouched.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use vigil_core::duration::{normalize_duration, parse_duration};
use vigil_core::template::check_template;

use crate::adapter::{adapter_for, supported_kinds, FieldView, RequiredErrors};
use crate::config::Notifier;

static SCHEME_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("valid regex"));

impl Notifier {
    /// Normalizes resolved fields in place. Idempotent.
    pub fn normalize(&mut self) {
        let port = self.url_field("port");
        if let Some(stripped) = port.strip_prefix(':') {
            self.set_url_field("port", stripped.to_string());
        }

        let path = self.url_field("path");
        if let Some(stripped) = path.strip_prefix('/') {
            self.set_url_field("path", stripped.to_string());
        }

        let host = self.url_field("host");
        if SCHEME_HOST.is_match(&host) {
            let host = host
                .trim_start_matches("http://")
                .trim_start_matches("https://");
            if let Some((bare_host, port)) = host.split_once(':') {
                let (bare_host, port) = (bare_host.to_string(), port.to_string());
                self.set_url_field("host", bare_host);
                self.set_url_field("port", port);
            } else {
                self.set_url_field("host", host.to_string());
            }
        }

        if let Some(adapter) = adapter_for(&self.kind()) {
            adapter.normalize(self);
        }
    }

    /// Validates this channel, returning pre-indented report lines.
    ///
    /// `prefix` is the indentation for this channel's own fields;
    /// sub-sections indent two further spaces. All checks run; nothing
    /// short-circuits.
    pub fn check_values(&mut self, prefix: &str) -> Vec<String> {
        self.normalize();

        let mut lines = Vec::new();
        let sub = format!("{prefix}  ");

        // Type.
        let kind = self.kind();
        let known = supported_kinds().contains(&kind.as_str());
        if !known && self.own_kind().is_empty() && self.main_kind().is_empty() {
            lines.push(format!(
                "{prefix}type: <required> e.g. 'slack', see the docs for possible types"
            ));
        } else if !self.main_kind().is_empty() && kind != self.main_kind() {
            lines.push(format!(
                "{prefix}type: {kind:?} != {:?} <invalid> (must be the same as the main notify.{}.type)",
                self.main_kind(),
                self.id(),
            ));
        } else if !known {
            lines.push(format!(
                "{prefix}type: {kind:?} <invalid> (supported types = [{}])",
                supported_kinds().join(","),
            ));
        }

        // Options.
        let mut option_lines = Vec::new();
        let delay = self.option("delay");
        if !delay.is_empty() {
            let normalized = normalize_duration(&delay);
            if normalized != delay {
                self.set_option("delay", normalized.clone());
            }
            if parse_duration(&normalized).is_err() {
                option_lines.push(format!(
                    "{sub}delay: {delay:?} <invalid> (use 'AhBmCs' duration format)"
                ));
            }
        }
        let max_tries = self.option("max_tries");
        if !max_tries.is_empty() {
            if let Err(line) = check_max_tries(&max_tries) {
                option_lines.push(format!("{sub}max_tries: {max_tries:?} <invalid> ({line})"));
            }
        }
        let message = self.option("message");
        if !check_template(&message) {
            option_lines.push(format!(
                "{sub}message: {message:?} <invalid> (didn't pass templating)"
            ));
        }
        if !option_lines.is_empty() {
            lines.push(format!("{prefix}options:"));
            lines.append(&mut option_lines);
        }

        // URL fields and params, per adapter.
        let mut required = RequiredErrors::default();
        if let Some(adapter) = adapter_for(&kind) {
            adapter.required_fields(&FieldView::new(self), &mut required);
        }
        if !required.url_fields.is_empty() {
            lines.push(format!("{prefix}url_fields:"));
            lines.extend(
                required
                    .url_fields
                    .iter()
                    .map(|line| format!("{sub}{line}")),
            );
        }

        let mut param_lines = Vec::new();
        for (key, value) in self.params.iter() {
            if !check_template(value) {
                param_lines.push(format!(
                    "{sub}{key}: {value:?} <invalid> (didn't pass templating)"
                ));
            }
        }
        param_lines.extend(required.params.iter().map(|line| format!("{sub}{line}")));
        if !param_lines.is_empty() {
            lines.push(format!("{prefix}params:"));
            lines.append(&mut param_lines);
        }

        // Whole-URL sanity check once the fields themselves pass.
        if lines.is_empty() {
            if let Some(adapter) = adapter_for(&kind) {
                let built = adapter.build_url(&FieldView::new(self));
                if let Err(err) = Url::parse(&built) {
                    lines.push(format!("{prefix}url: {built:?} <invalid> ({err})"));
                }
            }
        }

        lines
    }
}

fn check_max_tries(value: &str) -> Result<(), String> {
    if value.parse::<u8>().is_ok() {
        return Ok(());
    }
    if value.starts_with('-') && value[1..].chars().all(|c| c.is_ascii_digit()) {
        return Err("must be positive".to_string());
    }
    if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() {
        return Err(format!("too large, max = {}", u8::MAX));
    }
    Err("must be an integer".to_string())
}
