//! Webhook dispatch: set fan-out and the per-webhook attempt loop.

use std::time::Duration;

use rand::Rng;
use tokio::task::JoinSet;
use tracing::{error, info};

use vigil_core::{retry_with_backoff, BackoffPolicy, CounterResult, JoinedError, RetryOutcome,
    ServiceInfo};

use crate::config::{WebHook, WebhookSet};
use crate::error::WebhookError;

fn stagger() -> Duration {
    Duration::from_millis(rand::rng().random_range(100..=250))
}

/// Response bodies that reject the delivery even under a wanted status.
fn body_rejects(body: &str) -> bool {
    ["do not have permission", "rules were not satisfied"]
        .iter()
        .any(|marker| body.contains(marker))
}

impl WebhookSet {
    /// Fires every webhook concurrently.
    ///
    /// An empty set is a no-op returning `Ok` without spawning workers.
    /// Returns the joined terminal errors, one fragment per failed webhook.
    pub async fn send_all(
        &self,
        info: &ServiceInfo,
        use_delay: bool,
    ) -> Result<(), WebhookError> {
        if self.items.is_empty() {
            return Ok(());
        }

        let mut workers = JoinSet::new();
        let total = self.items.len();
        for (launched, webhook) in self.items.values().cloned().enumerate() {
            let info = info.clone();
            workers.spawn(async move { webhook.send(&info, use_delay).await });

            if launched + 1 < total {
                tokio::time::sleep(stagger()).await;
            }
        }

        let mut fragments = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => fragments.push(err.to_string()),
                Err(err) => fragments.push(format!("webhook worker panicked: {err}")),
            }
        }

        match JoinedError::join(fragments) {
            None => Ok(()),
            Some(joined) => Err(WebhookError::Aggregate(joined)),
        }
    }
}

impl WebHook {
    /// Fires this webhook, retrying with backoff until success or the
    /// attempt bound.
    ///
    /// Marks itself executing up front so a concurrent poll cycle cannot
    /// double-fire it; with `use_delay` and a configured delay the hold
    /// covers the delay too, and the send sleeps before the first attempt.
    /// Exhausted retries set the fail flag, broadcast the new state and
    /// raise the fallback notifiers unless this webhook fails silently.
    pub async fn send(&self, info: &ServiceInfo, use_delay: bool) -> Result<(), WebhookError> {
        let delay = self.delay_duration();
        if use_delay && !delay.is_zero() {
            info!(
                webhook = self.id(),
                service = %info.id,
                delay = %self.delay(),
                "sleeping before sending the webhook"
            );
            self.set_executing(true, true);
            tokio::time::sleep(delay).await;
        } else {
            self.set_executing(false, true);
        }

        let policy = BackoffPolicy::with_max_tries(self.max_tries());
        let outcome = retry_with_backoff(&policy, self.status().deletion(), |attempt| async move {
            let result = self.try_once(info).await;
            if let Err(err) = &result {
                error!(
                    webhook = self.id(),
                    service = %info.id,
                    attempt,
                    error = %err,
                    "webhook attempt failed"
                );
            }
            result
        })
        .await;

        match outcome {
            RetryOutcome::Success => {
                self.metrics()
                    .inc_counter(self.id(), &info.id, "", CounterResult::Success);
                self.set_failed(Some(false));
                self.announce();
                Ok(())
            }
            RetryOutcome::Cancelled => Ok(()),
            RetryOutcome::Exhausted(_) => {
                self.metrics()
                    .inc_counter(self.id(), &info.id, "", CounterResult::Fail);
                self.set_failed(Some(true));
                self.announce();

                let err = WebhookError::Exhausted {
                    id: self.id().to_string(),
                    service_id: info.id.clone(),
                    tries: self.max_tries(),
                };
                error!(webhook = self.id(), service = %info.id, error = %err, "webhook failed");

                if !self.silent_fails() {
                    if let Some(notifiers) = self.notifiers() {
                        if let Err(notify_err) = notifiers
                            .send_all("WebHook fail", &err.to_string(), info, false)
                            .await
                        {
                            error!(
                                webhook = self.id(),
                                service = %info.id,
                                error = %notify_err,
                                "fallback notifiers failed"
                            );
                        }
                    }
                }
                Err(err)
            }
        }
    }

    /// One delivery attempt: send the request and judge the response.
    async fn try_once(&self, info: &ServiceInfo) -> Result<(), WebhookError> {
        let request = self.build_request(info)?;
        let response = request.send().await.map_err(|err| WebhookError::Network {
            id: self.id().to_string(),
            reason: if err.is_timeout() {
                "request timed out".to_string()
            } else {
                err.to_string()
            },
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let body_ok = !body_rejects(&body);

        let desired = self.desired_status_code();
        let status_ok = if desired == 0 {
            (200..300).contains(&status)
        } else {
            status == desired
        };

        if status_ok && body_ok {
            info!(
                webhook = self.id(),
                service = %info.id,
                status,
                "webhook received"
            );
            return Ok(());
        }

        let wanted = if desired == 0 {
            "2XX".to_string()
        } else {
            desired.to_string()
        };
        Err(WebhookError::Rejected {
            id: self.id().to_string(),
            got: status,
            wanted,
            body: body.chars().take(256).collect(),
        })
    }
}
