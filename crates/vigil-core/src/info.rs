//! Read-only service details handed to the dispatch layer.

use serde::{Deserialize, Serialize};

/// Details of the monitored service, supplied by the polling subsystem.
///
/// This is the template context for messages, titles, params, custom
/// headers and webhook URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Unique service identifier.
    #[serde(default)]
    pub id: String,
    /// Human-friendly name, may be empty.
    #[serde(default)]
    pub name: String,
    /// URL the service is monitored at.
    #[serde(default)]
    pub url: String,
    /// Web/changelog URL shown to operators.
    #[serde(default)]
    pub web_url: String,
    /// Icon URL for rich notifications.
    #[serde(default)]
    pub icon: String,
    /// URL the icon links to.
    #[serde(default)]
    pub icon_link_to: String,
    /// Latest detected version.
    #[serde(default)]
    pub latest_version: String,
    /// Version most recently approved/deployed.
    #[serde(default)]
    pub approved_version: String,
}

impl ServiceInfo {
    /// Creates an info with just an id, for tests and one-shot sends.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}
