//! Delivery transport seam.
//!
//! The engine hands a fully-resolved [`Delivery`] to a [`Transport`].
//! Production uses [`ProtocolTransport`]: SMTP deliveries go out through
//! lettre, every other protocol is carried over HTTPS by reqwest using the
//! per-protocol request mapping in [`crate::transport::bridge`]. Tests swap
//! in scripted transports to pin attempt counts and failure paths.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::error::SendError;

pub mod bridge;

/// Default timeout for one outbound notification request.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// A resolved, ready-to-carry notification.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Channel id, for logging.
    pub id: String,
    /// Protocol kind.
    pub kind: String,
    /// The protocol connection URL.
    pub url: String,
    /// Resolved URL fields (union across config levels).
    pub fields: BTreeMap<String, String>,
    /// Resolved, template-expanded params.
    pub params: BTreeMap<String, String>,
    /// Message body.
    pub message: String,
}

impl Delivery {
    /// A resolved URL field, empty when unset.
    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map_or("", String::as_str)
    }

    /// A resolved param, empty when unset.
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map_or("", String::as_str)
    }

    /// The message title (the `title` param).
    pub fn title(&self) -> &str {
        self.param("title")
    }
}

/// Carries deliveries to their destination.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Performs one delivery attempt.
    async fn deliver(&self, delivery: &Delivery) -> Result<(), SendError>;
}

/// Production transport: lettre for SMTP, reqwest for everything else.
#[derive(Debug)]
pub struct ProtocolTransport {
    http: reqwest::Client,
}

impl ProtocolTransport {
    /// Builds the transport with the standard send timeout.
    pub fn new() -> Result<Self, SendError> {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|err| SendError::Network(format!("failed to build http client: {err}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ProtocolTransport {
    async fn deliver(&self, delivery: &Delivery) -> Result<(), SendError> {
        if delivery.kind == "smtp" {
            return send_mail(delivery).await;
        }

        let request = bridge::request_for(delivery)?;
        debug!(
            notifier = %delivery.id,
            kind = %delivery.kind,
            endpoint = %request.url,
            "delivering notification over http"
        );
        execute(&self.http, request).await
    }
}

async fn execute(client: &reqwest::Client, spec: bridge::RequestSpec) -> Result<(), SendError> {
    let endpoint = spec.url.clone();
    let mut request = client.request(spec.method, &spec.url);
    for (key, value) in &spec.headers {
        request = request.header(key, value);
    }
    if let Some((user, pass)) = &spec.basic_auth {
        request = request.basic_auth(user, Some(pass));
    }
    request = match spec.body {
        bridge::Body::Json(payload) => request.json(&payload),
        bridge::Body::Form(pairs) => request.form(&pairs),
        bridge::Body::Text(text) => request.body(text),
        bridge::Body::Empty => request,
    };

    let response = request.send().await.map_err(|err| {
        if err.is_timeout() {
            SendError::Network(format!("request to {endpoint} timed out"))
        } else {
            SendError::Network(err.to_string())
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    let body = body.chars().take(256).collect::<String>();
    Err(SendError::Status {
        endpoint,
        status: status.as_u16(),
        body,
    })
}

async fn send_mail(delivery: &Delivery) -> Result<(), SendError> {
    let from: Mailbox = delivery
        .param("fromaddress")
        .parse()
        .map_err(|err| SendError::Payload(format!("fromaddress: {err}")))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(delivery.title().to_string());
    for to in delivery.param("toaddresses").split(',') {
        let to = to.trim();
        if to.is_empty() {
            continue;
        }
        let mailbox: Mailbox = to
            .parse()
            .map_err(|err| SendError::Payload(format!("toaddresses: {err}")))?;
        builder = builder.to(mailbox);
    }
    let email = builder
        .body(delivery.message.clone())
        .map_err(|err| SendError::Payload(err.to_string()))?;

    let mut smtp = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(delivery.field("host"));
    if let Ok(port) = delivery.field("port").parse::<u16>() {
        smtp = smtp.port(port);
    }
    let username = delivery.field("username");
    if !username.is_empty() {
        smtp = smtp.credentials(Credentials::new(
            username.to_string(),
            delivery.field("password").to_string(),
        ));
    }

    smtp.build()
        .send(email)
        .await
        .map(|_| ())
        .map_err(|err| SendError::Network(err.to_string()))
}
