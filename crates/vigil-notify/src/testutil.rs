//! In-crate test fixtures.

use std::sync::Arc;

use async_trait::async_trait;
use vigil_core::{FieldMap, NoopAnnounce, NoopMetrics, ServiceInfo, ServiceStatus};

use crate::config::{Notifier, NotifierDefaults};
use crate::error::SendError;
use crate::transport::{Delivery, Transport};

/// Transport that accepts everything without doing I/O.
#[derive(Debug)]
pub struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn deliver(&self, _delivery: &Delivery) -> Result<(), SendError> {
        Ok(())
    }
}

pub fn field_map(pairs: &[(&str, &str)]) -> FieldMap {
    let mut map = FieldMap::new();
    for (key, value) in pairs {
        map.set(key, *value);
    }
    map
}

pub fn test_status() -> Arc<ServiceStatus> {
    Arc::new(ServiceStatus::new(
        ServiceInfo::with_id("test-service"),
        Arc::new(NoopAnnounce),
    ))
}

/// A notifier with only its own level populated; no main/defaults beneath.
pub fn notifier_with(kind: &str, url_fields: &[(&str, &str)], params: &[(&str, &str)]) -> Notifier {
    let spec = NotifierDefaults {
        kind: kind.to_string(),
        options: FieldMap::new(),
        url_fields: field_map(url_fields),
        params: field_map(params),
    };
    let empty = Arc::new(NotifierDefaults::default());
    Notifier::new(
        kind,
        spec,
        empty.clone(),
        empty.clone(),
        empty,
        test_status(),
        Arc::new(NoopMetrics),
        Arc::new(NullTransport),
    )
}
