//! Per-service runtime state shared with the dispatch layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::info::ServiceInfo;
use crate::sink::AnnounceSink;

/// Tri-state fail flags for the items of one dispatch set.
///
/// `None` means never tried, `Some(false)` last attempt succeeded,
/// `Some(true)` last attempt exhausted its retries. Flags are scoped to
/// (item id, owning service).
#[derive(Debug, Default)]
pub struct FailMap {
    flags: Mutex<BTreeMap<String, Option<bool>>>,
}

impl FailMap {
    /// The flag for `item_id` (`None` when untried or unknown).
    pub fn get(&self, item_id: &str) -> Option<bool> {
        self.flags.lock().get(item_id).copied().flatten()
    }

    /// Sets the flag for `item_id`.
    pub fn set(&self, item_id: &str, state: Option<bool>) {
        self.flags.lock().insert(item_id.to_string(), state);
    }

    /// Resets every flag to untried.
    pub fn reset(&self) {
        for state in self.flags.lock().values_mut() {
            *state = None;
        }
    }
}

/// Mutable status of one monitored service.
///
/// Holds the deletion signal, the fail-flag maps for the notification and
/// webhook sets, the current service details for templating, and the
/// announce sink handle. Everything here is shared between the owning
/// service and its in-flight dispatch workers.
#[derive(Debug)]
pub struct ServiceStatus {
    service_id: String,
    deleted: CancellationToken,
    notify_fails: FailMap,
    webhook_fails: FailMap,
    info: RwLock<ServiceInfo>,
    announce: Arc<dyn AnnounceSink>,
}

impl ServiceStatus {
    /// Creates the status for a service.
    pub fn new(info: ServiceInfo, announce: Arc<dyn AnnounceSink>) -> Self {
        Self {
            service_id: info.id.clone(),
            deleted: CancellationToken::new(),
            notify_fails: FailMap::default(),
            webhook_fails: FailMap::default(),
            info: RwLock::new(info),
            announce,
        }
    }

    /// The owning service's id.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Marks the service as deleted, aborting in-flight retries.
    pub fn delete(&self) {
        self.deleted.cancel();
    }

    /// Whether the service is being deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted.is_cancelled()
    }

    /// The deletion signal, polled around each retry.
    pub fn deletion(&self) -> &CancellationToken {
        &self.deleted
    }

    /// Fail flags for the notification set.
    pub fn notify_fails(&self) -> &FailMap {
        &self.notify_fails
    }

    /// Fail flags for the webhook set.
    pub fn webhook_fails(&self) -> &FailMap {
        &self.webhook_fails
    }

    /// Snapshot of the current service details.
    pub fn info(&self) -> ServiceInfo {
        self.info.read().clone()
    }

    /// Replaces the service details after a new poll.
    pub fn set_info(&self, info: ServiceInfo) {
        *self.info.write() = info;
    }

    /// Publishes a payload on the announce channel.
    pub fn announce(&self, payload: Vec<u8>) {
        self.announce.announce(payload);
    }
}
