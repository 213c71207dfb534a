//! Shared test support: recording sinks, scripted transports and fixtures.
//!
//! Nothing here ships in production builds; the dispatch crates pull this
//! in as a dev-dependency so their tests can pin attempt counts, inspect
//! emitted counters and read announce payloads without real sinks.

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use vigil_core::{AnnounceSink, CounterResult, MetricSink, ServiceInfo, ServiceStatus};
use vigil_notify::{Delivery, SendError, Transport};

/// One counter event captured by [`RecordingMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterEvent {
    /// Item the counter belongs to.
    pub item_id: String,
    /// Owning service.
    pub service_id: String,
    /// Protocol kind (empty for webhooks).
    pub kind: String,
    /// SUCCESS or FAIL.
    pub result: CounterResult,
}

/// Metric sink that records every increment for assertions.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    increments: Mutex<Vec<CounterEvent>>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl RecordingMetrics {
    /// Creates an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every increment seen so far.
    pub fn increments(&self) -> Vec<CounterEvent> {
        self.increments.lock().clone()
    }

    /// Number of increments with the given result.
    pub fn count(&self, result: CounterResult) -> usize {
        self.increments
            .lock()
            .iter()
            .filter(|event| event.result == result)
            .count()
    }

    /// (item, service) pairs whose counters were deleted.
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().clone()
    }
}

impl MetricSink for RecordingMetrics {
    fn init_counter(&self, _: &str, _: &str, _: &str, _: CounterResult) {}

    fn inc_counter(&self, item_id: &str, service_id: &str, kind: &str, result: CounterResult) {
        self.increments.lock().push(CounterEvent {
            item_id: item_id.to_string(),
            service_id: service_id.to_string(),
            kind: kind.to_string(),
            result,
        });
    }

    fn delete_counters(&self, item_id: &str, service_id: &str) {
        self.deleted
            .lock()
            .push((item_id.to_string(), service_id.to_string()));
    }
}

/// Announce sink that keeps every payload for assertions.
#[derive(Debug, Default)]
pub struct RecordingAnnounce {
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl RecordingAnnounce {
    /// Creates an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payload seen so far.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().clone()
    }

    /// Payloads decoded as JSON values.
    pub fn json_payloads(&self) -> Vec<serde_json::Value> {
        self.payloads
            .lock()
            .iter()
            .filter_map(|bytes| serde_json::from_slice(bytes).ok())
            .collect()
    }
}

impl AnnounceSink for RecordingAnnounce {
    fn announce(&self, payload: Vec<u8>) {
        self.payloads.lock().push(payload);
    }
}

/// Transport with a scripted outcome per attempt.
///
/// `succeed_after(k)` fails the first `k - 1` attempts and succeeds on
/// attempt `k`; `always_failing` never succeeds. Either way every call is
/// counted, so tests can pin exact attempt counts.
#[derive(Debug)]
pub struct ScriptedTransport {
    succeed_on: Option<usize>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    /// A transport that fails every attempt.
    pub fn always_failing() -> Self {
        Self {
            succeed_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A transport that succeeds on attempt `k` (1-based).
    pub fn succeed_after(k: usize) -> Self {
        Self {
            succeed_on: Some(k),
            calls: AtomicUsize::new(0),
        }
    }

    /// A transport that succeeds immediately.
    pub fn always_ok() -> Self {
        Self::succeed_after(1)
    }

    /// Number of delivery attempts made through this transport.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn deliver(&self, delivery: &Delivery) -> Result<(), SendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.succeed_on {
            Some(k) if call >= k => Ok(()),
            _ => Err(SendError::Network(format!(
                "scripted failure for {}",
                delivery.id
            ))),
        }
    }
}

/// A service status wired to a recording announce sink.
pub fn recording_status(service_id: &str) -> (Arc<ServiceStatus>, Arc<RecordingAnnounce>) {
    let announce = Arc::new(RecordingAnnounce::new());
    let status = Arc::new(ServiceStatus::new(
        ServiceInfo::with_id(service_id),
        announce.clone(),
    ));
    (status, announce)
}

/// A populated service info for template-heavy tests.
pub fn service_info() -> ServiceInfo {
    ServiceInfo {
        id: "test-service".to_string(),
        name: "Test Service".to_string(),
        url: "https://github.com/vigil-watch/vigil".to_string(),
        web_url: "https://example.com/changelog".to_string(),
        icon: String::new(),
        icon_link_to: String::new(),
        latest_version: "1.2.3".to_string(),
        approved_version: "1.2.2".to_string(),
    }
}
