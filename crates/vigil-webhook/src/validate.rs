//! Validation for webhook configuration.
//!
//! Runs once at load time and accumulates every failure into a
//! path-labelled report; nothing short-circuits. Normalized values
//! (bare-integer delays) are written back into the webhook's own level.

use vigil_core::duration::{normalize_duration, parse_duration};
use vigil_core::template::check_template;

use crate::config::WebHook;

const SUPPORTED_KINDS: [&str; 2] = ["github", "gitlab"];

impl WebHook {
    /// Validates this webhook, returning pre-indented report lines.
    pub fn check_values(&mut self, prefix: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let sub = format!("{prefix}  ");

        // Delay.
        let delay = self.delay();
        let normalized = normalize_duration(&delay);
        if normalized != delay {
            self.spec.delay = normalized.clone();
        }
        if parse_duration(&normalized).is_err() {
            lines.push(format!(
                "{prefix}delay: {delay:?} <invalid> (use 'AhBmCs' duration format)"
            ));
        }

        // Type.
        let kind = self.kind();
        if !self.spec.kind.is_empty()
            && !self.main.kind.is_empty()
            && self.spec.kind != self.main.kind
        {
            lines.push(format!(
                "{prefix}type: {:?} != {:?} <invalid> (must be the same as the main webhook.{}.type)",
                self.spec.kind,
                self.main.kind,
                self.id(),
            ));
        } else if !SUPPORTED_KINDS.contains(&kind.as_str()) {
            lines.push(format!(
                "{prefix}type: {kind:?} <invalid> (supported types = [{}])",
                SUPPORTED_KINDS.join(", "),
            ));
        }

        // URL.
        let url = self.raw_url();
        if url.is_empty() {
            lines.push(format!(
                "{prefix}url: <required> (here, or in webhook.{})",
                self.id()
            ));
        } else if !check_template(&url) {
            lines.push(format!(
                "{prefix}url: {url:?} <invalid> (didn't pass templating)"
            ));
        }

        // Secret.
        if self.secret().is_empty() {
            lines.push(format!(
                "{prefix}secret: <required> (here, or in webhook.{})",
                self.id()
            ));
        }

        // Custom headers.
        let mut header_lines = Vec::new();
        for header in &self.spec.custom_headers {
            if !check_template(&header.value) {
                header_lines.push(format!(
                    "{sub}{}: {:?} <invalid> (didn't pass templating)",
                    header.key, header.value
                ));
            }
        }
        if !header_lines.is_empty() {
            lines.push(format!("{prefix}custom_headers:"));
            lines.append(&mut header_lines);
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vigil_core::{Clock, NoopAnnounce, NoopMetrics, ServiceInfo, ServiceStatus, SystemClock};

    use crate::config::{hard_defaults, Header, WebHook, WebhookDefaults, WebhookSet};

    fn build(spec: WebhookDefaults) -> WebHook {
        let status = Arc::new(ServiceStatus::new(
            ServiceInfo::with_id("test-service"),
            Arc::new(NoopAnnounce),
        ));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        WebHook::new(
            "hook",
            spec,
            Arc::new(WebhookDefaults::default()),
            Arc::new(WebhookDefaults::default()),
            Arc::new(hard_defaults()),
            std::time::Duration::from_secs(600),
            status,
            Arc::new(NoopMetrics),
            None,
            clock,
        )
        .unwrap()
    }

    fn valid_spec() -> WebhookDefaults {
        WebhookDefaults {
            url: "https://example.com/hook".to_string(),
            secret: "shhh".to_string(),
            ..WebhookDefaults::default()
        }
    }

    #[test]
    fn valid_webhook_passes() {
        let mut webhook = build(valid_spec());
        assert!(webhook.check_values("").is_empty());
    }

    #[test]
    fn missing_url_and_secret_collected_together() {
        let mut webhook = build(WebhookDefaults::default());
        let text = webhook.check_values("").join("\n");
        assert!(text.contains("url: <required> (here, or in webhook.hook)"));
        assert!(text.contains("secret: <required> (here, or in webhook.hook)"));
    }

    #[test]
    fn unknown_kind_rejected() {
        let mut spec = valid_spec();
        spec.kind = "bitbucket".to_string();
        let mut webhook = build(spec);
        let text = webhook.check_values("").join("\n");
        assert!(text.contains("type: \"bitbucket\" <invalid>"));
    }

    #[test]
    fn bare_integer_delay_normalized() {
        let mut spec = valid_spec();
        spec.delay = "7".to_string();
        let mut webhook = build(spec);
        assert!(webhook.check_values("").is_empty());
        assert_eq!(webhook.delay(), "7s");
    }

    #[test]
    fn invalid_delay_reported() {
        let mut spec = valid_spec();
        spec.delay = "1x".to_string();
        let mut webhook = build(spec);
        let text = webhook.check_values("").join("\n");
        assert!(text.contains("delay: \"1x\" <invalid>"));
    }

    #[test]
    fn bad_header_template_reported() {
        let mut spec = valid_spec();
        spec.custom_headers = vec![Header {
            key: "X-Version".to_string(),
            value: "{% if version %}unclosed".to_string(),
        }];
        let mut webhook = build(spec);
        let text = webhook.check_values("").join("\n");
        assert!(text.contains("custom_headers:"));
        assert!(text.contains("X-Version"));
        assert!(text.contains("didn't pass templating"));
    }

    #[test]
    fn set_report_sorted_by_id() {
        let mut a_spec = valid_spec();
        a_spec.kind = "bitbucket".to_string();

        let status = Arc::new(ServiceStatus::new(
            ServiceInfo::with_id("test-service"),
            Arc::new(NoopAnnounce),
        ));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let make = |id: &str, spec: WebhookDefaults| {
            WebHook::new(
                id,
                spec,
                Arc::new(WebhookDefaults::default()),
                Arc::new(WebhookDefaults::default()),
                Arc::new(hard_defaults()),
                std::time::Duration::from_secs(600),
                status.clone(),
                Arc::new(NoopMetrics),
                None,
                clock.clone(),
            )
            .unwrap()
        };

        let err = WebhookSet::new(vec![
            make("z-hook", WebhookDefaults::default()),
            make("a-hook", a_spec),
        ])
        .unwrap_err();
        let report = err.to_string();
        let a_pos = report.find("a-hook:").unwrap();
        let z_pos = report.find("z-hook:").unwrap();
        assert!(report.starts_with("webhook:"));
        assert!(a_pos < z_pos);
    }
}
