//! Vigil dispatch runner.
//!
//! Loads the service's notification channels and webhooks, validates them,
//! and performs one-shot test sends. The version-detection loop feeding
//! real events lives outside this binary; everything it needs is exercised
//! through the same wiring used here.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use vigil_core::{Clock, MetricSink, NoopAnnounce, NoopMetrics, ServiceStatus, SystemClock};
use vigil_notify::{NotifierSet, ProtocolTransport, Transport};
use vigil_webhook::WebhookSet;

mod config;

use config::Config;

#[derive(Debug, Parser)]
#[command(name = "vigil", about = "Release-monitoring notification dispatcher")]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "vigil.toml")]
    config: PathBuf,

    /// Send a test message through the given notification channel.
    #[arg(long, value_name = "ID")]
    test_notify: Option<String>,

    /// Fire the given webhook once.
    #[arg(long, value_name = "ID")]
    test_webhook: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    info!(
        service = %config.service.id,
        notify = config.notify.len(),
        webhooks = config.webhook.len(),
        "configuration loaded"
    );

    let status = Arc::new(ServiceStatus::new(
        config.service.info(),
        Arc::new(NoopAnnounce),
    ));
    let metrics: Arc<dyn MetricSink> = Arc::new(NoopMetrics);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let transport: Arc<dyn Transport> =
        Arc::new(ProtocolTransport::new().context("failed to build transport")?);

    let notify_mains = share(&config.notify_mains);
    let notify_defaults = share(&config.notify_defaults);
    let notifiers = Arc::new(NotifierSet::from_specs(
        config.notify.clone(),
        &notify_mains,
        &notify_defaults,
        &status,
        &metrics,
        &transport,
    )?);

    let webhook_mains = share(&config.webhook_mains);
    let webhooks = WebhookSet::from_specs(
        config.webhook.clone(),
        &webhook_mains,
        &Arc::new(config.webhook_defaults.clone()),
        config.service.interval_duration()?,
        &status,
        &metrics,
        Some(notifiers.clone()),
        &clock,
    )?;

    let info = status.info();
    if let Some(id) = &args.test_notify {
        let notifier = notifiers
            .get(id)
            .with_context(|| format!("no notify entry named {id:?}"))?;
        info!(notifier = %id, "sending test notification");
        let message = format!("TEST - {}", notifier.message(&info));
        notifier.send("", &message, &info, false, false).await?;
        println!("test notification sent via {id}");
        return Ok(());
    }

    if let Some(id) = &args.test_webhook {
        let webhook = webhooks
            .get(id)
            .with_context(|| format!("no webhook entry named {id:?}"))?;
        info!(webhook = %id, "firing test webhook");
        webhook.send(&info, false).await?;
        println!("webhook {id} fired");
        return Ok(());
    }

    bail!("nothing to do: pass --test-notify <id> or --test-webhook <id>");
}

fn share<T: Clone>(map: &BTreeMap<String, T>) -> BTreeMap<String, Arc<T>> {
    map.iter()
        .map(|(key, value)| (key.clone(), Arc::new(value.clone())))
        .collect()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,vigil=debug"))
        .expect("invalid RUST_LOG environment variable");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
