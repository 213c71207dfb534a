//! Metric and announce sink interfaces.
//!
//! The dispatch engine reports outcomes through these traits instead of a
//! package-level registry, so tests run in parallel with isolated sinks and
//! the metrics storage engine stays an external concern. Counters are
//! write-only from the engine's point of view: they never feed back into
//! dispatch decisions.

use std::fmt;

/// Terminal result of a dispatch attempt, as recorded in counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterResult {
    /// The item reached its destination.
    Success,
    /// The item exhausted its retries.
    Fail,
}

impl CounterResult {
    /// The stable label used by counter storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for CounterResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter storage for dispatch outcomes.
///
/// Implementations must be thread-safe; the engine calls them from
/// concurrent workers.
pub trait MetricSink: Send + Sync + fmt::Debug {
    /// Registers a counter with a starting value of zero.
    fn init_counter(&self, item_id: &str, service_id: &str, kind: &str, result: CounterResult);

    /// Increments a counter.
    fn inc_counter(&self, item_id: &str, service_id: &str, kind: &str, result: CounterResult);

    /// Drops all counters for an item, called when its service is deleted.
    fn delete_counters(&self, item_id: &str, service_id: &str);
}

/// Broadcast channel for item state updates, consumed by a real-time UI.
pub trait AnnounceSink: Send + Sync + fmt::Debug {
    /// Publishes a serialized state payload.
    fn announce(&self, payload: Vec<u8>);
}

/// Metric sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricSink for NoopMetrics {
    fn init_counter(&self, _: &str, _: &str, _: &str, _: CounterResult) {}
    fn inc_counter(&self, _: &str, _: &str, _: &str, _: CounterResult) {}
    fn delete_counters(&self, _: &str, _: &str) {}
}

/// Announce sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnnounce;

impl AnnounceSink for NoopAnnounce {
    fn announce(&self, _payload: Vec<u8>) {}
}
