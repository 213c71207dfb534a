//! Per-webhook scheduling state.
//!
//! Every webhook tracks the earliest time it may run again. A send marks
//! the webhook executing up front, which pushes `next_runnable` far enough
//! out that a concurrent poll cycle cannot double-fire it; the cooldown
//! differs for a webhook whose last attempt failed (retry soon) versus one
//! that succeeded or was never tried (wait two full poll cycles).

use chrono::{DateTime, Utc};

use crate::config::WebHook;

/// Cooldown after a failed webhook before it may be retried.
pub const FAIL_COOLDOWN_SECS: i64 = 15;

/// Extra hold while a send is in flight awaiting a response.
pub const IN_FLIGHT_HOLD_SECS: i64 = 3600;

impl WebHook {
    /// The time before which this webhook must not be re-triggered.
    pub fn next_runnable(&self) -> DateTime<Utc> {
        *self.next_runnable_lock().read()
    }

    /// Overrides the next-runnable time directly.
    pub fn set_next_runnable(&self, at: DateTime<Utc>) {
        *self.next_runnable_lock().write() = at;
    }

    /// Whether the webhook may run now.
    pub fn is_runnable(&self) -> bool {
        self.clock().now() > self.next_runnable()
    }

    /// Recomputes `next_runnable` as a send starts.
    ///
    /// A webhook whose last attempt did not fail (success, or never tried)
    /// cools down for two parent poll intervals; a failed one gets a short
    /// window so a genuinely broken endpoint can be retried quickly.
    /// `add_delay` stacks the configured delay on top (auto-approved
    /// releases honouring their hold-off); `received` stacks a long hold
    /// covering the in-flight send.
    pub fn set_executing(&self, add_delay: bool, received: bool) {
        let mut next = self.clock().now();

        if self.failed() != Some(true) {
            next += chrono::Duration::from_std(2 * self.parent_interval())
                .unwrap_or_else(|_| chrono::Duration::zero());
        } else {
            next += chrono::Duration::seconds(FAIL_COOLDOWN_SECS);
        }

        if add_delay {
            next += chrono::Duration::from_std(self.delay_duration())
                .unwrap_or_else(|_| chrono::Duration::zero());
        }

        if received {
            next += chrono::Duration::seconds(IN_FLIGHT_HOLD_SECS);
        }

        *self.next_runnable_lock().write() = next;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use vigil_core::{Clock, NoopAnnounce, NoopMetrics, ServiceInfo, ServiceStatus, TestClock};

    use crate::config::{hard_defaults, WebHook, WebhookDefaults};

    fn webhook_with(clock: Arc<TestClock>, interval: Duration) -> WebHook {
        let status = Arc::new(ServiceStatus::new(
            ServiceInfo::with_id("test-service"),
            Arc::new(NoopAnnounce),
        ));
        let spec = WebhookDefaults {
            url: "https://example.com/hook".to_string(),
            secret: "shhh".to_string(),
            delay: "9s".to_string(),
            ..WebhookDefaults::default()
        };
        let clock: Arc<dyn Clock> = clock;
        WebHook::new(
            "hook",
            spec,
            Arc::new(WebhookDefaults::default()),
            Arc::new(WebhookDefaults::default()),
            Arc::new(hard_defaults()),
            interval,
            status,
            Arc::new(NoopMetrics),
            None,
            clock,
        )
        .unwrap()
    }

    fn setup() -> (Arc<TestClock>, WebHook) {
        let clock = Arc::new(TestClock::new());
        let webhook = webhook_with(clock.clone(), Duration::from_secs(600));
        (clock, webhook)
    }

    #[test]
    fn fresh_webhook_is_runnable() {
        let (_, webhook) = setup();
        assert!(webhook.is_runnable());
    }

    #[test]
    fn success_cooldown_is_twice_parent_interval() {
        let (clock, webhook) = setup();
        webhook.status().webhook_fails().set("hook", Some(false));

        webhook.set_executing(false, false);
        let delta = webhook.next_runnable() - clock.now();
        assert_eq!(delta, chrono::Duration::seconds(1200));
    }

    #[test]
    fn never_tried_takes_the_success_cooldown() {
        let (clock, webhook) = setup();
        assert_eq!(webhook.failed(), None);

        webhook.set_executing(false, false);
        let delta = webhook.next_runnable() - clock.now();
        assert_eq!(delta, chrono::Duration::seconds(1200));
    }

    #[test]
    fn failed_webhook_gets_short_cooldown() {
        let (clock, webhook) = setup();
        webhook.status().webhook_fails().set("hook", Some(true));

        webhook.set_executing(false, false);
        let delta = webhook.next_runnable() - clock.now();
        assert_eq!(delta, chrono::Duration::seconds(15));
    }

    #[test]
    fn add_delay_stacks_the_resolved_delay() {
        let (clock, webhook) = setup();
        webhook.status().webhook_fails().set("hook", Some(false));

        webhook.set_executing(true, false);
        let delta = webhook.next_runnable() - clock.now();
        assert_eq!(delta, chrono::Duration::seconds(1200 + 9));
    }

    #[test]
    fn received_stacks_exactly_one_hour()  {
        let (clock, webhook) = setup();
        webhook.status().webhook_fails().set("hook", Some(false));

        webhook.set_executing(false, true);
        let delta = webhook.next_runnable() - clock.now();
        assert_eq!(delta, chrono::Duration::seconds(1200 + 3600));
    }

    #[test]
    fn is_runnable_flips_when_clock_passes() {
        let (clock, webhook) = setup();
        webhook.status().webhook_fails().set("hook", Some(true));
        webhook.set_executing(false, false);

        assert!(!webhook.is_runnable());
        clock.advance(Duration::from_secs(16));
        assert!(webhook.is_runnable());
    }

    #[test]
    fn next_runnable_can_be_pinned_directly() {
        let (clock, webhook) = setup();
        let at = clock.now() + chrono::Duration::seconds(42);
        webhook.set_next_runnable(at);
        assert_eq!(webhook.next_runnable(), at);
    }
}
