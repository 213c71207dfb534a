//! Dispatch-engine behaviour: retry bounds, aggregation, cancellation.

use std::sync::Arc;

use vigil_core::{CounterResult, FieldMap, MetricSink, ServiceStatus};
use vigil_notify::{Notifier, NotifierDefaults, NotifierSet, NotifyError, Transport};
use vigil_testing::{recording_status, service_info, RecordingMetrics, ScriptedTransport};

fn slack_spec(max_tries: &str) -> NotifierDefaults {
    NotifierDefaults {
        kind: "slack".to_string(),
        options: FieldMap::from([("max_tries", max_tries), ("message", "released")]),
        url_fields: FieldMap::from([("token", "tok"), ("channel", "chan")]),
        params: FieldMap::new(),
    }
}

fn notifier(
    id: &str,
    spec: NotifierDefaults,
    status: &Arc<ServiceStatus>,
    metrics: &Arc<RecordingMetrics>,
    transport: &Arc<ScriptedTransport>,
) -> Notifier {
    let empty = Arc::new(NotifierDefaults::default());
    let metrics: Arc<dyn MetricSink> = metrics.clone();
    let transport: Arc<dyn Transport> = transport.clone();
    Notifier::new(
        id,
        spec,
        empty.clone(),
        empty.clone(),
        empty,
        status.clone(),
        metrics,
        transport,
    )
}

#[tokio::test(start_paused = true)]
async fn always_failing_transport_invoked_exactly_max_tries() {
    let (status, _) = recording_status("test-service");
    let metrics = Arc::new(RecordingMetrics::new());
    let transport = Arc::new(ScriptedTransport::always_failing());

    let set =
        NotifierSet::new(vec![notifier("one", slack_spec("4"), &status, &metrics, &transport)])
            .unwrap();

    let err = set
        .send_all("", "", &service_info(), false)
        .await
        .unwrap_err();

    assert_eq!(transport.calls(), 4);
    assert_eq!(metrics.count(CounterResult::Fail), 1);
    assert_eq!(metrics.count(CounterResult::Success), 0);
    assert_eq!(status.notify_fails().get("one"), Some(true));
    match err {
        NotifyError::Aggregate(joined) => assert_eq!(joined.len(), 1),
        other => panic!("expected aggregate error, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn success_on_attempt_k_invokes_exactly_k() {
    let (status, _) = recording_status("test-service");
    let metrics = Arc::new(RecordingMetrics::new());
    let transport = Arc::new(ScriptedTransport::succeed_after(3));

    let set =
        NotifierSet::new(vec![notifier("one", slack_spec("5"), &status, &metrics, &transport)])
            .unwrap();

    set.send_all("", "", &service_info(), false).await.unwrap();

    assert_eq!(transport.calls(), 3);
    assert_eq!(metrics.count(CounterResult::Success), 1);
    assert_eq!(metrics.count(CounterResult::Fail), 0);
    assert_eq!(status.notify_fails().get("one"), Some(false));
}

#[tokio::test(start_paused = true)]
async fn aggregate_holds_one_fragment_per_failing_item() {
    let (status, _) = recording_status("test-service");
    let metrics = Arc::new(RecordingMetrics::new());
    let failing = Arc::new(ScriptedTransport::always_failing());
    let passing = Arc::new(ScriptedTransport::always_ok());

    let set = NotifierSet::new(vec![
        notifier("bad-one", slack_spec("2"), &status, &metrics, &failing),
        notifier("bad-two", slack_spec("2"), &status, &metrics, &failing),
        notifier("good", slack_spec("2"), &status, &metrics, &passing),
    ])
    .unwrap();

    let err = set
        .send_all("", "", &service_info(), false)
        .await
        .unwrap_err();

    match err {
        NotifyError::Aggregate(joined) => {
            assert_eq!(joined.len(), 2);
            let text = joined.to_string();
            assert!(text.contains("bad-one"));
            assert!(text.contains("bad-two"));
            assert!(!text.contains("good"));
        }
        other => panic!("expected aggregate error, got {other}"),
    }
    assert_eq!(status.notify_fails().get("good"), Some(false));
    assert_eq!(status.notify_fails().get("bad-one"), Some(true));
}

#[tokio::test(start_paused = true)]
async fn all_success_returns_ok() {
    let (status, _) = recording_status("test-service");
    let metrics = Arc::new(RecordingMetrics::new());
    let transport = Arc::new(ScriptedTransport::always_ok());

    let set = NotifierSet::new(vec![
        notifier("a", slack_spec("2"), &status, &metrics, &transport),
        notifier("b", slack_spec("2"), &status, &metrics, &transport),
    ])
    .unwrap();

    set.send_all("", "", &service_info(), false).await.unwrap();
    assert_eq!(metrics.count(CounterResult::Success), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_set_is_a_no_op() {
    let set = NotifierSet::new(Vec::new()).unwrap();
    set.send_all("", "", &service_info(), false).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn deletion_aborts_without_failure() {
    let (status, _) = recording_status("test-service");
    let metrics = Arc::new(RecordingMetrics::new());
    let transport = Arc::new(ScriptedTransport::always_failing());

    let set =
        NotifierSet::new(vec![notifier("one", slack_spec("5"), &status, &metrics, &transport)])
            .unwrap();

    status.delete();
    set.send_all("", "", &service_info(), false).await.unwrap();

    assert_eq!(transport.calls(), 0);
    assert_eq!(metrics.count(CounterResult::Fail), 0);
    assert_eq!(status.notify_fails().get("one"), None);
}

#[tokio::test(start_paused = true)]
async fn configured_delay_is_honoured_before_sending() {
    let (status, _) = recording_status("test-service");
    let metrics = Arc::new(RecordingMetrics::new());
    let transport = Arc::new(ScriptedTransport::always_ok());

    let mut spec = slack_spec("2");
    spec.options.set("delay", "30s");
    let set = NotifierSet::new(vec![notifier("one", spec, &status, &metrics, &transport)]).unwrap();

    let started = tokio::time::Instant::now();
    set.send_all("", "", &service_info(), true).await.unwrap();
    assert!(started.elapsed() >= std::time::Duration::from_secs(30));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn value_set_at_main_level_resolves_through() {
    let (status, _) = recording_status("test-service");
    let metrics = Arc::new(RecordingMetrics::new());
    let transport = Arc::new(ScriptedTransport::always_ok());

    let spec = NotifierDefaults {
        kind: String::new(),
        options: FieldMap::new(),
        url_fields: FieldMap::from([("channel", "chan")]),
        params: FieldMap::new(),
    };
    let main = Arc::new(NotifierDefaults {
        kind: "slack".to_string(),
        options: FieldMap::from([("max_tries", "1")]),
        url_fields: FieldMap::from([("token", "main-token")]),
        params: FieldMap::new(),
    });
    let empty = Arc::new(NotifierDefaults::default());
    let metrics_sink: Arc<dyn MetricSink> = metrics.clone();
    let transport_seam: Arc<dyn Transport> = transport.clone();
    let item = Notifier::new(
        "release-alerts",
        spec,
        main,
        empty.clone(),
        empty,
        status.clone(),
        metrics_sink,
        transport_seam,
    );

    assert_eq!(item.kind(), "slack");
    let delivery = item.build_delivery("", "", &service_info()).unwrap();
    assert_eq!(delivery.url, "slack://main-token@chan");
}
