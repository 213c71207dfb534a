//! Notification channel configuration and tiered getters.
//!
//! A [`Notifier`] is one configured destination. Every setting resolves
//! through four levels: the notifier's own maps, the main entry it
//! references, the per-type user defaults, and the built-in hard defaults.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vigil_core::cascade::{self, FieldMap};
use vigil_core::duration::{normalize_duration, parse_duration};
use vigil_core::template::render_template;
use vigil_core::{CounterResult, MetricSink, ServiceInfo, ServiceStatus};

use crate::defaults::hard_defaults;
use crate::error::NotifyError;
use crate::transport::Transport;

/// One configuration level of a notification channel.
///
/// Used for the channel's own settings and for the main/defaults/hard
/// defaults levels beneath it; all four share this shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierDefaults {
    /// Protocol kind, e.g. `slack`. May be empty at any single level.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Protocol-agnostic options (delay, max_tries, message template).
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub options: FieldMap,
    /// Connection fields (host, token, path, …).
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub url_fields: FieldMap,
    /// Protocol query/body parameters.
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub params: FieldMap,
}

impl NotifierDefaults {
    /// Creates a level with the given maps.
    pub fn new(kind: &str, options: FieldMap, url_fields: FieldMap, params: FieldMap) -> Self {
        Self {
            kind: kind.to_string(),
            options,
            url_fields,
            params,
        }
    }
}

/// One configured notification destination, bound to its service.
#[derive(Debug)]
pub struct Notifier {
    id: String,
    kind: String,
    pub(crate) options: FieldMap,
    pub(crate) url_fields: FieldMap,
    pub(crate) params: FieldMap,
    main: Arc<NotifierDefaults>,
    defaults: Arc<NotifierDefaults>,
    hard_defaults: Arc<NotifierDefaults>,
    status: Arc<ServiceStatus>,
    metrics: Arc<dyn MetricSink>,
    pub(crate) transport: Arc<dyn Transport>,
}

impl Notifier {
    /// Binds a configured channel to its levels, service and sinks.
    ///
    /// Registers the channel's SUCCESS/FAIL counters and resets its fail
    /// flag to untried.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        spec: NotifierDefaults,
        main: Arc<NotifierDefaults>,
        defaults: Arc<NotifierDefaults>,
        hard_defaults: Arc<NotifierDefaults>,
        status: Arc<ServiceStatus>,
        metrics: Arc<dyn MetricSink>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let id = id.into();
        let notifier = Self {
            id,
            kind: spec.kind,
            options: spec.options,
            url_fields: spec.url_fields,
            params: spec.params,
            main,
            defaults,
            hard_defaults,
            status,
            metrics,
            transport,
        };

        let kind = notifier.kind();
        for result in [CounterResult::Success, CounterResult::Fail] {
            notifier.metrics.init_counter(
                &notifier.id,
                notifier.status.service_id(),
                &kind,
                result,
            );
        }
        notifier.status.notify_fails().set(&notifier.id, None);
        notifier
    }

    /// The channel's id, unique within its set.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolved protocol kind: own value, then main's, then the id itself.
    pub fn kind(&self) -> String {
        cascade::first_non_empty([self.kind.as_str(), self.main.kind.as_str(), self.id.as_str()])
    }

    /// The kind set on this level only (may be empty).
    pub(crate) fn own_kind(&self) -> &str {
        &self.kind
    }

    /// The main level's kind (may be empty).
    pub(crate) fn main_kind(&self) -> &str {
        &self.main.kind
    }

    /// Resolves an option through the cascade.
    pub fn option(&self, key: &str) -> String {
        cascade::resolve(
            &[
                &self.options,
                &self.main.options,
                &self.defaults.options,
                &self.hard_defaults.options,
            ],
            key,
        )
    }

    /// Resolves a URL field through the cascade.
    pub fn url_field(&self, key: &str) -> String {
        cascade::resolve(
            &[
                &self.url_fields,
                &self.main.url_fields,
                &self.defaults.url_fields,
                &self.hard_defaults.url_fields,
            ],
            key,
        )
    }

    /// Resolves a param through the cascade.
    pub fn param(&self, key: &str) -> String {
        cascade::resolve(
            &[
                &self.params,
                &self.main.params,
                &self.defaults.params,
                &self.hard_defaults.params,
            ],
            key,
        )
    }

    /// Writes a corrected URL field into this channel's own map.
    pub(crate) fn set_url_field(&mut self, key: &str, value: impl Into<String>) {
        self.url_fields.set(key, value);
    }

    /// Writes a corrected param into this channel's own map.
    pub(crate) fn set_param(&mut self, key: &str, value: impl Into<String>) {
        self.params.set(key, value);
    }

    /// Writes a corrected option into this channel's own map.
    pub(crate) fn set_option(&mut self, key: &str, value: impl Into<String>) {
        self.options.set(key, value);
    }

    /// The configured pre-send delay, `"0s"` when unset.
    pub fn delay(&self) -> String {
        let delay = self.option("delay");
        if delay.is_empty() {
            "0s".to_string()
        } else {
            delay
        }
    }

    /// The pre-send delay as a duration (zero on parse failure; validation
    /// rejects bad formats up front).
    pub fn delay_duration(&self) -> Duration {
        parse_duration(&normalize_duration(&self.delay())).unwrap_or(Duration::ZERO)
    }

    /// Maximum send attempts for this channel.
    pub fn max_tries(&self) -> u8 {
        self.option("max_tries").parse().unwrap_or(1).max(1)
    }

    /// The message with the service context applied.
    pub fn message(&self, info: &ServiceInfo) -> String {
        render_template(&self.option("message"), info)
    }

    /// The title with the service context applied.
    pub fn title(&self, info: &ServiceInfo) -> String {
        render_template(&self.param("title"), info)
    }

    /// Union of params across all levels, template-expanded, with the
    /// explicit `title` override applied last.
    pub fn build_params(&self, title: &str, info: &ServiceInfo) -> BTreeMap<String, String> {
        let mut params = cascade::resolve_all(&[
            &self.params,
            &self.main.params,
            &self.defaults.params,
            &self.hard_defaults.params,
        ]);
        for value in params.values_mut() {
            *value = render_template(value, info);
        }
        if !title.is_empty() {
            params.insert("title".to_string(), title.to_string());
        }
        params
    }

    /// Union of URL fields across all levels.
    pub fn resolved_url_fields(&self) -> BTreeMap<String, String> {
        cascade::resolve_all(&[
            &self.url_fields,
            &self.main.url_fields,
            &self.defaults.url_fields,
            &self.hard_defaults.url_fields,
        ])
    }

    /// The owning service's status.
    pub fn status(&self) -> &ServiceStatus {
        &self.status
    }

    pub(crate) fn metrics(&self) -> &dyn MetricSink {
        self.metrics.as_ref()
    }

    /// Sets the shared fail flag for this channel.
    pub(crate) fn set_failed(&self, state: Option<bool>) {
        self.status.notify_fails().set(&self.id, state);
    }

    /// Drops this channel's counters; called when the service is deleted.
    pub fn delete_metrics(&self) {
        self.metrics
            .delete_counters(&self.id, self.status.service_id());
    }
}

/// The full set of notification channels configured for one service.
#[derive(Debug, Default)]
pub struct NotifierSet {
    pub(crate) items: BTreeMap<String, Arc<Notifier>>,
}

impl NotifierSet {
    /// Validates the given channels and assembles the set.
    ///
    /// Validation normalizes fields in place and aggregates every error
    /// into one report, items sorted by id.
    pub fn new(items: Vec<Notifier>) -> Result<Self, NotifyError> {
        let mut items: Vec<Notifier> = items;
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
            lines.insert(0, "notify:".to_string());
        }
        if let Some(report) = vigil_core::ValidationError::from_lines(lines) {
            return Err(NotifyError::Validation(report));
        }

        Ok(Self {
            items: items
                .into_iter()
                .map(|item| (item.id.clone(), Arc::new(item)))
                .collect(),
        })
    }

    /// Builds a set from raw config levels.
    ///
    /// `mains` holds the shared main entries referenced by id; `defaults`
    /// holds per-type user defaults. Hard defaults come from
    /// [`hard_defaults`].
    pub fn from_specs(
        specs: BTreeMap<String, NotifierDefaults>,
        mains: &BTreeMap<String, Arc<NotifierDefaults>>,
        defaults: &BTreeMap<String, Arc<NotifierDefaults>>,
        status: &Arc<ServiceStatus>,
        metrics: &Arc<dyn MetricSink>,
        transport: &Arc<dyn Transport>,
    ) -> Result<Self, NotifyError> {
        let hard = hard_defaults();
        let empty = Arc::new(NotifierDefaults::default());

        let mut items = Vec::with_capacity(specs.len());
        for (id, spec) in specs {
            let main = mains.get(&id).cloned().unwrap_or_else(|| empty.clone());
            let kind =
                cascade::first_non_empty([spec.kind.as_str(), main.kind.as_str(), id.as_str()]);
            let type_defaults = defaults.get(&kind).cloned().unwrap_or_else(|| empty.clone());
            let type_hard = hard.get(&kind).cloned().unwrap_or_else(|| empty.clone());

            items.push(Notifier::new(
                id,
                spec,
                main,
                type_defaults,
                type_hard,
                status.clone(),
                metrics.clone(),
                transport.clone(),
            ));
        }
        Self::new(items)
    }

    /// Number of channels in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set holds no channels.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up a channel by id.
    pub fn get(&self, id: &str) -> Option<&Arc<Notifier>> {
        self.items.get(id)
    }

    /// Iterates channels in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Notifier>> {
        self.items.values()
    }

    /// Drops every channel's counters; called when the service is deleted.
    pub fn delete_metrics(&self) {
        for item in self.items.values() {
            item.delete_metrics();
        }
    }
}
