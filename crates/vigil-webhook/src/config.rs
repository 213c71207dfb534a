//! Webhook configuration and tiered getters.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use vigil_core::cascade::{first_non_empty, first_some};
use vigil_core::duration::{normalize_duration, parse_duration};
use vigil_core::template::render_template;
use vigil_core::{Clock, CounterResult, MetricSink, ServiceInfo, ServiceStatus};
use vigil_notify::NotifierSet;

use crate::error::WebhookError;

/// Timeout for one outbound webhook attempt.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// One custom header, value template-expanded at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub key: String,
    /// Header value (may hold template markers).
    pub value: String,
}

/// One configuration level of a webhook.
///
/// Used for the webhook's own settings and for the main/defaults/hard
/// defaults levels beneath it; every field resolves independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookDefaults {
    /// Webhook style: `github` or `gitlab`.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Destination URL (may hold template markers).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Shared secret for signing (github) or the token param (gitlab).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
    /// Ordered custom headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_headers: Vec<Header>,
    /// Skip TLS certificate verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_invalid_certs: Option<bool>,
    /// Status code counted as success; `0` accepts any 2xx.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_status_code: Option<u16>,
    /// Delay before sending on auto-approved releases.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub delay: String,
    /// Maximum send attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u8>,
    /// Suppress the fallback notifiers on exhausted retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silent_fails: Option<bool>,
}

/// The built-in hard-default level every webhook bottoms out at.
pub fn hard_defaults() -> WebhookDefaults {
    WebhookDefaults {
        kind: "github".to_string(),
        delay: "0s".to_string(),
        allow_invalid_certs: Some(false),
        desired_status_code: Some(0),
        max_tries: Some(3),
        silent_fails: Some(false),
        ..WebhookDefaults::default()
    }
}

/// One configured webhook trigger, bound to its service.
#[derive(Debug)]
pub struct WebHook {
    id: String,
    pub(crate) spec: WebhookDefaults,
    pub(crate) main: Arc<WebhookDefaults>,
    defaults: Arc<WebhookDefaults>,
    hard_defaults: Arc<WebhookDefaults>,
    parent_interval: Duration,
    status: Arc<ServiceStatus>,
    metrics: Arc<dyn MetricSink>,
    notifiers: Option<Arc<NotifierSet>>,
    clock: Arc<dyn Clock>,
    pub(crate) client: reqwest::Client,
    next_runnable: RwLock<DateTime<Utc>>,
}

impl WebHook {
    /// Binds a configured webhook to its levels, service and sinks.
    ///
    /// Builds the HTTP client for this webhook's TLS policy, registers its
    /// counters and resets its fail flag to untried.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        spec: WebhookDefaults,
        main: Arc<WebhookDefaults>,
        defaults: Arc<WebhookDefaults>,
        hard_defaults: Arc<WebhookDefaults>,
        parent_interval: Duration,
        status: Arc<ServiceStatus>,
        metrics: Arc<dyn MetricSink>,
        notifiers: Option<Arc<NotifierSet>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WebhookError> {
        let id = id.into();

        let allow_invalid_certs = first_some([
            spec.allow_invalid_certs,
            main.allow_invalid_certs,
            defaults.allow_invalid_certs,
            hard_defaults.allow_invalid_certs,
        ])
        .unwrap_or(false);
        let client = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .danger_accept_invalid_certs(allow_invalid_certs)
            .build()
            .map_err(|err| WebhookError::Build {
                id: id.clone(),
                reason: err.to_string(),
            })?;

        let webhook = Self {
            id,
            spec,
            main,
            defaults,
            hard_defaults,
            parent_interval,
            status,
            metrics,
            notifiers,
            clock,
            client,
            next_runnable: RwLock::new(DateTime::<Utc>::MIN_UTC),
        };

        for result in [CounterResult::Success, CounterResult::Fail] {
            webhook
                .metrics
                .init_counter(&webhook.id, webhook.status.service_id(), "", result);
        }
        webhook.status.webhook_fails().set(&webhook.id, None);
        Ok(webhook)
    }

    /// The webhook's id, unique within its set.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolved webhook style.
    pub fn kind(&self) -> String {
        first_non_empty([
            self.spec.kind.as_str(),
            self.main.kind.as_str(),
            self.defaults.kind.as_str(),
            self.hard_defaults.kind.as_str(),
        ])
    }

    /// Resolved destination URL with the service context applied.
    pub fn url(&self, info: &ServiceInfo) -> String {
        let url = first_non_empty([
            self.spec.url.as_str(),
            self.main.url.as_str(),
            self.defaults.url.as_str(),
            self.hard_defaults.url.as_str(),
        ]);
        if url.contains('{') {
            render_template(&url, info)
        } else {
            url
        }
    }

    /// Resolved URL without templating, for validation.
    pub(crate) fn raw_url(&self) -> String {
        first_non_empty([
            self.spec.url.as_str(),
            self.main.url.as_str(),
            self.defaults.url.as_str(),
            self.hard_defaults.url.as_str(),
        ])
    }

    /// Resolved signing secret / token.
    pub fn secret(&self) -> String {
        first_non_empty([
            self.spec.secret.as_str(),
            self.main.secret.as_str(),
            self.defaults.secret.as_str(),
            self.hard_defaults.secret.as_str(),
        ])
    }

    /// Resolved pre-send delay, `"0s"` when unset.
    pub fn delay(&self) -> String {
        let delay = first_non_empty([
            self.spec.delay.as_str(),
            self.main.delay.as_str(),
            self.defaults.delay.as_str(),
            self.hard_defaults.delay.as_str(),
        ]);
        if delay.is_empty() {
            "0s".to_string()
        } else {
            delay
        }
    }

    /// The pre-send delay as a duration.
    pub fn delay_duration(&self) -> Duration {
        parse_duration(&normalize_duration(&self.delay())).unwrap_or(Duration::ZERO)
    }

    /// Maximum send attempts.
    pub fn max_tries(&self) -> u8 {
        first_some([
            self.spec.max_tries,
            self.main.max_tries,
            self.defaults.max_tries,
            self.hard_defaults.max_tries,
        ])
        .unwrap_or(1)
        .max(1)
    }

    /// Status code counted as success; `0` accepts any 2xx.
    pub fn desired_status_code(&self) -> u16 {
        first_some([
            self.spec.desired_status_code,
            self.main.desired_status_code,
            self.defaults.desired_status_code,
            self.hard_defaults.desired_status_code,
        ])
        .unwrap_or(0)
    }

    /// Whether the fallback notifiers stay quiet on exhausted retries.
    pub fn silent_fails(&self) -> bool {
        first_some([
            self.spec.silent_fails,
            self.main.silent_fails,
            self.defaults.silent_fails,
            self.hard_defaults.silent_fails,
        ])
        .unwrap_or(false)
    }

    /// The first non-empty custom-header list across levels.
    pub fn custom_headers(&self) -> &[Header] {
        for level in [&self.spec, &*self.main, &*self.defaults, &*self.hard_defaults] {
            if !level.custom_headers.is_empty() {
                return &level.custom_headers;
            }
        }
        &[]
    }

    /// The owning service's poll interval.
    pub fn parent_interval(&self) -> Duration {
        self.parent_interval
    }

    /// The owning service's status.
    pub fn status(&self) -> &ServiceStatus {
        &self.status
    }

    pub(crate) fn metrics(&self) -> &dyn MetricSink {
        self.metrics.as_ref()
    }

    pub(crate) fn notifiers(&self) -> Option<&NotifierSet> {
        self.notifiers.as_deref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn next_runnable_lock(&self) -> &RwLock<DateTime<Utc>> {
        &self.next_runnable
    }

    /// The shared fail flag for this webhook.
    pub fn failed(&self) -> Option<bool> {
        self.status.webhook_fails().get(&self.id)
    }

    /// Sets the shared fail flag for this webhook.
    pub(crate) fn set_failed(&self, state: Option<bool>) {
        self.status.webhook_fails().set(&self.id, state);
    }

    /// Drops this webhook's counters; called when the service is deleted.
    pub fn delete_metrics(&self) {
        self.metrics
            .delete_counters(&self.id, self.status.service_id());
    }
}

/// The full set of webhooks configured for one service.
#[derive(Debug, Default)]
pub struct WebhookSet {
    pub(crate) items: BTreeMap<String, Arc<WebHook>>,
}

impl WebhookSet {
    /// Validates the given webhooks and assembles the set.
    pub fn new(items: Vec<WebHook>) -> Result<Self, WebhookError> {
        let mut items = items;
        items.sort_by(|a, b| a.id.cmp(&b.id));

        let mut lines = Vec::new();
        for item in &mut items {
            let item_lines = item.check_values("    ");
            if !item_lines.is_empty() {
                lines.push(format!("  {}:", item.id));
                lines.extend(item_lines);
            }
        }
        if !lines.is_empty() {
            lines.insert(0, "webhook:".to_string());
        }
        if let Some(report) = vigil_core::ValidationError::from_lines(lines) {
            return Err(WebhookError::Validation(report));
        }

        Ok(Self {
            items: items
                .into_iter()
                .map(|item| (item.id.clone(), Arc::new(item)))
                .collect(),
        })
    }

    /// Builds a set from raw config levels.
    #[allow(clippy::too_many_arguments)]
    pub fn from_specs(
        specs: BTreeMap<String, WebhookDefaults>,
        mains: &BTreeMap<String, Arc<WebhookDefaults>>,
        defaults: &Arc<WebhookDefaults>,
        parent_interval: Duration,
        status: &Arc<ServiceStatus>,
        metrics: &Arc<dyn MetricSink>,
        notifiers: Option<Arc<NotifierSet>>,
        clock: &Arc<dyn Clock>,
    ) -> Result<Self, WebhookError> {
        let hard = Arc::new(hard_defaults());
        let empty = Arc::new(WebhookDefaults::default());

        let mut items = Vec::with_capacity(specs.len());
        for (id, spec) in specs {
            let main = mains.get(&id).cloned().unwrap_or_else(|| empty.clone());
            items.push(WebHook::new(
                id,
                spec,
                main,
                defaults.clone(),
                hard.clone(),
                parent_interval,
                status.clone(),
                metrics.clone(),
                notifiers.clone(),
                clock.clone(),
            )?);
        }
        Self::new(items)
    }

    /// Number of webhooks in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set holds no webhooks.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up a webhook by id.
    pub fn get(&self, id: &str) -> Option<&Arc<WebHook>> {
        self.items.get(id)
    }

    /// Iterates webhooks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<WebHook>> {
        self.items.values()
    }

    /// Resets every webhook's fail flag to untried.
    pub fn reset_fails(&self) {
        for item in self.items.values() {
            item.set_failed(None);
        }
    }

    /// Drops every webhook's counters; called when the service is deleted.
    pub fn delete_metrics(&self) {
        for item in self.items.values() {
            item.delete_metrics();
        }
    }
}
