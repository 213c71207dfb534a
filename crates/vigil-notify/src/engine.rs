//! Concurrent dispatch engine for notification sets.
//!
//! `send_all` launches one worker per channel, staggered by a short random
//! delay so a set of channels pointing at the same external service never
//! bursts in lockstep. Each worker owns its channel's full retry loop and
//! the call only returns once every worker reached a terminal state, with
//! all terminal errors joined.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use vigil_core::{retry_with_backoff, BackoffPolicy, CounterResult, JoinedError, RetryOutcome,
    ServiceInfo};

use crate::adapter::{adapter_for, FieldView};
use crate::config::{Notifier, NotifierSet};
use crate::error::NotifyError;
use crate::transport::Delivery;

fn stagger() -> Duration {
    Duration::from_millis(rand::rng().random_range(100..=250))
}

impl NotifierSet {
    /// Sends `title`/`message` through every channel concurrently.
    ///
    /// An empty set is a no-op returning `Ok` without spawning workers.
    /// Returns the joined terminal errors, one fragment per failed channel.
    pub async fn send_all(
        &self,
        title: &str,
        message: &str,
        info: &ServiceInfo,
        use_delay: bool,
    ) -> Result<(), NotifyError> {
        if self.items.is_empty() {
            return Ok(());
        }

        let mut workers = JoinSet::new();
        let total = self.items.len();
        for (launched, notifier) in self.items.values().cloned().enumerate() {
            let title = title.to_string();
            let message = message.to_string();
            let info = info.clone();
            workers.spawn(async move {
                notifier
                    .send(&title, &message, &info, use_delay, true)
                    .await
            });

            if launched + 1 < total {
                tokio::time::sleep(stagger()).await;
            }
        }

        let mut fragments = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => fragments.push(err.to_string()),
                Err(err) => fragments.push(format!("notification worker panicked: {err}")),
            }
        }

        match JoinedError::join(fragments) {
            None => Ok(()),
            Some(joined) => Err(NotifyError::Aggregate(joined)),
        }
    }
}

impl Notifier {
    /// Sends one message through this channel, retrying with backoff.
    ///
    /// `use_delay` honours the configured pre-send delay. `use_metrics`
    /// is disabled for one-shot test sends so they stay out of the
    /// counters. Deletion of the owning service aborts quietly.
    pub async fn send(
        &self,
        title: &str,
        message: &str,
        info: &ServiceInfo,
        use_delay: bool,
        use_metrics: bool,
    ) -> Result<(), NotifyError> {
        let delay = self.delay_duration();
        if use_delay && !delay.is_zero() {
            info!(
                notifier = self.id(),
                service = %info.id,
                delay = %self.delay(),
                "sleeping before sending the notification"
            );
            tokio::time::sleep(delay).await;
        }

        let delivery = self.build_delivery(title, message, info)?;
        debug!(
            notifier = self.id(),
            service = %info.id,
            url = %delivery.url,
            "sending notification"
        );

        let policy = BackoffPolicy::with_max_tries(self.max_tries());
        let outcome = retry_with_backoff(&policy, self.status().deletion(), |attempt| {
            let delivery = &delivery;
            async move {
                let result = self.transport.deliver(delivery).await;
                if let Err(err) = &result {
                    error!(
                        notifier = self.id(),
                        service = %info.id,
                        attempt,
                        error = %err,
                        "notification attempt failed"
                    );
                }
                result
            }
        })
        .await;

        match outcome {
            RetryOutcome::Success => {
                self.set_failed(Some(false));
                if use_metrics {
                    self.metrics().inc_counter(
                        self.id(),
                        &info.id,
                        &self.kind(),
                        CounterResult::Success,
                    );
                }
                Ok(())
            }
            RetryOutcome::Cancelled => Ok(()),
            RetryOutcome::Exhausted(errors) => {
                self.set_failed(Some(true));
                if use_metrics {
                    self.metrics().inc_counter(
                        self.id(),
                        &info.id,
                        &self.kind(),
                        CounterResult::Fail,
                    );
                }

                let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                for err in &errors {
                    *counts.entry(err.to_string()).or_default() += 1;
                }
                let summary = counts
                    .iter()
                    .map(|(msg, count)| format!("{msg} x {count}"))
                    .collect::<Vec<_>>()
                    .join("; ");

                let err = NotifyError::Exhausted {
                    id: self.id().to_string(),
                    kind: self.kind(),
                    service_id: info.id.clone(),
                    tries: self.max_tries(),
                    summary,
                };
                error!(notifier = self.id(), service = %info.id, error = %err, "notification failed");
                Err(err)
            }
        }
    }

    /// Assembles the delivery for this channel: connection URL, resolved
    /// fields, templated params and the message body.
    pub fn build_delivery(
        &self,
        title: &str,
        message: &str,
        info: &ServiceInfo,
    ) -> Result<Delivery, NotifyError> {
        let kind = self.kind();
        let adapter = adapter_for(&kind).ok_or_else(|| NotifyError::InvalidSender {
            id: self.id().to_string(),
            kind: kind.clone(),
            reason: "unknown protocol type".to_string(),
        })?;

        let url = adapter.build_url(&FieldView::new(self));
        url::Url::parse(&url).map_err(|err| NotifyError::InvalidSender {
            id: self.id().to_string(),
            kind: kind.clone(),
            reason: format!("invalid connection url {url:?}: {err}"),
        })?;

        let resolved_title = if title.is_empty() {
            self.title(info)
        } else {
            title.to_string()
        };
        let params = self.build_params(&resolved_title, info);
        let message = if message.is_empty() {
            self.message(info)
        } else {
            message.to_string()
        };

        Ok(Delivery {
            id: self.id().to_string(),
            kind,
            url,
            fields: self.resolved_url_fields(),
            params,
            message,
        })
    }
}
