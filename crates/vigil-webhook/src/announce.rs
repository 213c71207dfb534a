//! Webhook state broadcasts for the real-time UI layer.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::WebHook;

/// Broadcast payload describing a webhook's latest pass/fail state.
#[derive(Debug, Serialize)]
pub struct AnnouncePayload {
    /// UI page the update belongs to.
    pub page: String,
    /// Update type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Update sub-type.
    pub sub_type: String,
    /// The owning service.
    pub service_data: ServiceData,
    /// Per-webhook state, keyed by webhook id.
    pub webhook_data: BTreeMap<String, WebhookData>,
}

/// Service identification in an announce payload.
#[derive(Debug, Serialize)]
pub struct ServiceData {
    /// Service id.
    pub id: String,
}

/// One webhook's state in an announce payload.
#[derive(Debug, Serialize)]
pub struct WebhookData {
    /// Latest fail flag (`null` when never tried).
    pub failed: Option<bool>,
    /// Earliest time the webhook may run again, RFC 3339.
    pub next_runnable: String,
}

impl AnnouncePayload {
    /// The payload for one webhook's current state.
    pub fn for_webhook(
        service_id: &str,
        webhook_id: &str,
        failed: Option<bool>,
        next_runnable: DateTime<Utc>,
    ) -> Self {
        let mut webhook_data = BTreeMap::new();
        webhook_data.insert(
            webhook_id.to_string(),
            WebhookData {
                failed,
                next_runnable: next_runnable.to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        );
        Self {
            page: "APPROVALS".to_string(),
            kind: "WEBHOOK".to_string(),
            sub_type: "EVENT".to_string(),
            service_data: ServiceData {
                id: service_id.to_string(),
            },
            webhook_data,
        }
    }
}

impl WebHook {
    /// Broadcasts this webhook's latest pass/fail + next-runnable state.
    pub fn announce(&self) {
        let payload = AnnouncePayload::for_webhook(
            self.status().service_id(),
            self.id(),
            self.failed(),
            self.next_runnable(),
        );
        match serde_json::to_vec(&payload) {
            Ok(bytes) => self.status().announce(bytes),
            Err(err) => {
                tracing::warn!(webhook = self.id(), error = %err, "failed to encode announce payload");
            }
        }
    }
}
