//! Binary configuration: defaults, `vigil.toml`, environment overrides.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use vigil_core::duration::{normalize_duration, parse_duration};
use vigil_core::ServiceInfo;
use vigil_notify::NotifierDefaults;
use vigil_webhook::WebhookDefaults;

/// The monitored service this process dispatches for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service id.
    #[serde(default = "default_service_id")]
    pub id: String,
    /// Human-friendly name.
    #[serde(default)]
    pub name: String,
    /// URL the service is monitored at.
    #[serde(default)]
    pub url: String,
    /// Web/changelog URL.
    #[serde(default)]
    pub web_url: String,
    /// Poll interval, `AhBmCs` format.
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Version used for one-shot test sends.
    #[serde(default = "default_version")]
    pub latest_version: String,
}

fn default_service_id() -> String {
    "vigil".to_string()
}

fn default_interval() -> String {
    "10m".to_string()
}

fn default_version() -> String {
    "MAJOR.MINOR.PATCH".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id: default_service_id(),
            name: String::new(),
            url: String::new(),
            web_url: String::new(),
            interval: default_interval(),
            latest_version: default_version(),
        }
    }
}

impl ServiceConfig {
    /// The service details handed to the dispatch layer.
    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            web_url: self.web_url.clone(),
            latest_version: self.latest_version.clone(),
            ..ServiceInfo::default()
        }
    }

    /// The poll interval as a duration.
    pub fn interval_duration(&self) -> Result<Duration> {
        parse_duration(&normalize_duration(&self.interval))
            .with_context(|| format!("service.interval {:?}", self.interval))
    }
}

/// Complete process configuration.
///
/// Loaded in priority order: environment variables (`VIGIL_*`, highest),
/// `vigil.toml`, built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// The monitored service.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Notification channels, by id.
    #[serde(default)]
    pub notify: BTreeMap<String, NotifierDefaults>,
    /// Shared main notify entries referenced by id.
    #[serde(default)]
    pub notify_mains: BTreeMap<String, NotifierDefaults>,
    /// Per-type notify defaults.
    #[serde(default)]
    pub notify_defaults: BTreeMap<String, NotifierDefaults>,
    /// Webhooks, by id.
    #[serde(default)]
    pub webhook: BTreeMap<String, WebhookDefaults>,
    /// Shared main webhook entries referenced by id.
    #[serde(default)]
    pub webhook_mains: BTreeMap<String, WebhookDefaults>,
    /// Webhook defaults.
    #[serde(default)]
    pub webhook_defaults: WebhookDefaults,
}

impl Config {
    /// Loads configuration from defaults, the given file and environment.
    pub fn load(path: &Path) -> Result<Self> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("VIGIL_").split("__"))
            .extract()
            .context("failed to load configuration")
    }
}
