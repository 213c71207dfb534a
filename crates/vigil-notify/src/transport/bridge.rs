//! Per-protocol HTTP request mapping.
//!
//! Turns a resolved [`Delivery`] into the HTTP call its destination
//! service expects. Webhook-style services take the message straight at a
//! URL assembled from the connection fields; API-style services get their
//! documented endpoint.

use reqwest::Method;
use serde_json::{json, Value};

use vigil_core::util::prefix_unless_empty;

use super::Delivery;
use crate::error::SendError;

/// One outbound HTTP request, transport-agnostic.
#[derive(Debug)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Basic-auth credentials, applied by the executor.
    pub basic_auth: Option<(String, String)>,
    /// Request body.
    pub body: Body,
}

/// Body encodings the bridges use.
#[derive(Debug)]
pub enum Body {
    /// JSON payload.
    Json(Value),
    /// URL-encoded form pairs.
    Form(Vec<(String, String)>),
    /// Plain text body.
    Text(String),
    /// No body.
    Empty,
}

impl RequestSpec {
    fn post_json(url: String, payload: Value) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: Vec::new(),
            basic_auth: None,
            body: Body::Json(payload),
        }
    }
}

/// `https://host[:port][/path]` from the delivery's connection fields.
fn https_base(d: &Delivery) -> String {
    format!(
        "https://{}{}{}",
        d.field("host"),
        prefix_unless_empty(d.field("port"), ":"),
        prefix_unless_empty(d.field("path"), "/"),
    )
}

fn first_item(list: &str) -> &str {
    list.split(',').next().unwrap_or("").trim()
}

/// Builds the HTTP request carrying `delivery` to its destination.
pub fn request_for(delivery: &Delivery) -> Result<RequestSpec, SendError> {
    let d = delivery;
    let message = d.message.as_str();
    let title = d.title();

    let spec = match d.kind.as_str() {
        "bark" => RequestSpec::post_json(
            format!("{}/push", https_base(d)),
            json!({"title": title, "body": message, "device_key": d.field("devicekey")}),
        ),
        "discord" => {
            let mut payload = json!({"content": message});
            let username = d.param("username");
            if !username.is_empty() {
                payload["username"] = Value::String(username.to_string());
            }
            RequestSpec::post_json(
                format!(
                    "https://discord.com/api/webhooks/{}/{}",
                    d.field("webhookid"),
                    d.field("token")
                ),
                payload,
            )
        }
        "gotify" => RequestSpec::post_json(
            format!(
                "{}/message?token={}",
                https_base(d),
                d.field("token")
            ),
            json!({
                "title": title,
                "message": message,
                "priority": d.param("priority").parse::<i64>().unwrap_or(0),
            }),
        ),
        "googlechat" => {
            let raw = d.field("raw");
            let url = if raw.contains("://") {
                raw.to_string()
            } else {
                format!("https://{raw}")
            };
            RequestSpec::post_json(url, json!({"text": message}))
        }
        "ifttt" => RequestSpec::post_json(
            format!(
                "https://maker.ifttt.com/trigger/{}/with/key/{}",
                first_item(d.param("events")),
                d.field("webhookid")
            ),
            json!({"value1": title, "value2": message}),
        ),
        "join" => RequestSpec {
            method: Method::POST,
            url: format!(
                "https://joinjoaomgcd.appspot.com/_ah/api/messaging/v1/sendPush?apikey={}&deviceIds={}&title={}&text={}",
                d.field("apikey"),
                d.param("devices"),
                urlencode(title),
                urlencode(message),
            ),
            headers: Vec::new(),
            basic_auth: None,
            body: Body::Empty,
        },
        "mattermost" => {
            let mut payload = json!({"text": message});
            for (key, target) in [("username", "username"), ("channel", "channel")] {
                let value = d.field(key);
                if !value.is_empty() {
                    payload[target] = Value::String(value.to_string());
                }
            }
            RequestSpec::post_json(format!("{}/hooks/{}", https_base(d), d.field("token")), payload)
        }
        "matrix" => RequestSpec::post_json(
            format!(
                "https://{}{}/_matrix/client/r0/rooms/{}/send/m.room.message?access_token={}",
                d.field("host"),
                prefix_unless_empty(d.field("port"), ":"),
                urlencode(first_item(d.param("rooms"))),
                d.field("password"),
            ),
            json!({"msgtype": "m.text", "body": message}),
        ),
        "ntfy" => {
            let mut headers = Vec::new();
            if !title.is_empty() {
                headers.push(("Title".to_string(), title.to_string()));
            }
            let username = d.field("username");
            let basic_auth = if username.is_empty() {
                None
            } else {
                Some((username.to_string(), d.field("password").to_string()))
            };
            RequestSpec {
                method: Method::POST,
                url: format!(
                    "https://{}{}/{}",
                    d.field("host"),
                    prefix_unless_empty(d.field("port"), ":"),
                    d.field("topic")
                ),
                headers,
                basic_auth,
                body: Body::Text(message.to_string()),
            }
        }
        "opsgenie" => RequestSpec {
            method: Method::POST,
            url: format!("{}/v2/alerts", https_base(d)),
            headers: vec![(
                "Authorization".to_string(),
                format!("GenieKey {}", d.field("apikey")),
            )],
            basic_auth: None,
            body: Body::Json(json!({"message": message})),
        },
        "pushbullet" => RequestSpec {
            method: Method::POST,
            url: "https://api.pushbullet.com/v2/pushes".to_string(),
            headers: vec![("Access-Token".to_string(), d.field("token").to_string())],
            basic_auth: None,
            body: Body::Json(json!({"type": "note", "title": title, "body": message})),
        },
        "pushover" => {
            let mut form = vec![
                ("token".to_string(), d.field("token").to_string()),
                ("user".to_string(), d.field("user").to_string()),
                ("message".to_string(), message.to_string()),
            ];
            if !title.is_empty() {
                form.push(("title".to_string(), title.to_string()));
            }
            let devices = d.param("devices");
            if !devices.is_empty() {
                form.push(("device".to_string(), devices.to_string()));
            }
            RequestSpec {
                method: Method::POST,
                url: "https://api.pushover.net/1/messages.json".to_string(),
                headers: Vec::new(),
                basic_auth: None,
                body: Body::Form(form),
            }
        }
        "rocketchat" => RequestSpec::post_json(
            format!(
                "{}/hooks/{}/{}",
                https_base(d),
                d.field("tokena"),
                d.field("tokenb")
            ),
            json!({"text": message, "channel": d.field("channel")}),
        ),
        "slack" => {
            let token = d.field("token");
            if token.starts_with("xox") {
                RequestSpec {
                    method: Method::POST,
                    url: "https://slack.com/api/chat.postMessage".to_string(),
                    headers: vec![(
                        "Authorization".to_string(),
                        format!("Bearer {token}"),
                    )],
                    basic_auth: None,
                    body: Body::Json(json!({"channel": d.field("channel"), "text": message})),
                }
            } else {
                RequestSpec::post_json(
                    format!(
                        "https://hooks.slack.com/services/{}",
                        token.replace('-', "/")
                    ),
                    json!({"text": message}),
                )
            }
        }
        "teams" => RequestSpec::post_json(
            format!(
                "https://{}/webhookb2/{}@{}/IncomingWebhook/{}/{}",
                d.param("host"),
                d.field("group"),
                d.field("tenant"),
                d.field("altid"),
                d.field("groupowner"),
            ),
            json!({"text": message}),
        ),
        "telegram" => RequestSpec::post_json(
            format!("https://api.telegram.org/bot{}/sendMessage", d.field("token")),
            json!({
                "chat_id": first_item(d.param("chats")),
                "text": message,
                "disable_notification": d.param("notification") == "no",
                "disable_web_page_preview": d.param("preview") == "no",
            }),
        ),
        "zulip" => {
            let stream = d.param("stream");
            let mut form = vec![("content".to_string(), message.to_string())];
            if stream.is_empty() {
                form.push(("type".to_string(), "private".to_string()));
            } else {
                form.push(("type".to_string(), "stream".to_string()));
                form.push(("to".to_string(), stream.to_string()));
                form.push(("subject".to_string(), d.param("topic").to_string()));
            }
            RequestSpec {
                method: Method::POST,
                url: format!("https://{}/api/v1/messages", d.field("host")),
                headers: Vec::new(),
                basic_auth: Some((
                    d.field("botmail").replace("%40", "@"),
                    d.field("botkey").to_string(),
                )),
                body: Body::Form(form),
            }
        }
        "generic" => {
            let method = match d.param("requestmethod").to_uppercase().as_str() {
                "GET" => Method::GET,
                "PUT" => Method::PUT,
                "PATCH" => Method::PATCH,
                "DELETE" => Method::DELETE,
                _ => Method::POST,
            };
            let mut url = https_base(d);
            if let Some(query) = json_pairs(d.field("query_vars")) {
                if !query.is_empty() {
                    url.push('?');
                    url.push_str(
                        &query
                            .iter()
                            .map(|(k, v)| format!("{k}={v}"))
                            .collect::<Vec<_>>()
                            .join("&"),
                    );
                }
            }
            let mut payload = serde_json::Map::new();
            payload.insert(
                d.param("titlekey").to_string(),
                Value::String(title.to_string()),
            );
            payload.insert(
                d.param("messagekey").to_string(),
                Value::String(message.to_string()),
            );
            if let Some(vars) = json_pairs(d.field("json_payload_vars")) {
                for (key, value) in vars {
                    payload.insert(key, Value::String(value));
                }
            }
            let headers = json_pairs(d.field("custom_headers")).unwrap_or_default();
            RequestSpec {
                method,
                url,
                headers,
                basic_auth: None,
                body: Body::Json(Value::Object(payload)),
            }
        }
        "raw" => {
            let raw = d.field("raw");
            let url = if raw.contains("://") {
                raw.to_string()
            } else {
                format!("https://{raw}")
            };
            RequestSpec::post_json(url, json!({"title": title, "message": message}))
        }
        other => return Err(SendError::UnsupportedScheme(other.to_string())),
    };

    Ok(spec)
}

fn json_pairs(raw: &str) -> Option<Vec<(String, String)>> {
    if raw.is_empty() {
        return Some(Vec::new());
    }
    let map: std::collections::BTreeMap<String, String> = serde_json::from_str(raw).ok()?;
    Some(map.into_iter().collect())
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn delivery(kind: &str, fields: &[(&str, &str)], params: &[(&str, &str)]) -> Delivery {
        Delivery {
            id: kind.to_string(),
            kind: kind.to_string(),
            url: format!("{kind}://test"),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            message: "hello".to_string(),
        }
    }

    #[test]
    fn gotify_request_targets_message_endpoint() {
        let spec = request_for(&delivery(
            "gotify",
            &[("host", "gotify.example.com"), ("port", "8443"), ("token", "T")],
            &[("title", "Vigil")],
        ))
        .unwrap();
        assert_eq!(spec.method, Method::POST);
        assert_eq!(spec.url, "https://gotify.example.com:8443/message?token=T");
        match spec.body {
            Body::Json(payload) => {
                assert_eq!(payload["title"], "Vigil");
                assert_eq!(payload["message"], "hello");
            }
            _ => panic!("expected json body"),
        }
    }

    #[test]
    fn slack_webhook_token_expands_to_path() {
        let spec = request_for(&delivery(
            "slack",
            &[("token", "T00-B00-XXX"), ("channel", "webhook")],
            &[],
        ))
        .unwrap();
        assert_eq!(spec.url, "https://hooks.slack.com/services/T00/B00/XXX");
    }

    #[test]
    fn slack_bot_token_uses_api() {
        let spec = request_for(&delivery(
            "slack",
            &[("token", "xoxb-123"), ("channel", "C01")],
            &[],
        ))
        .unwrap();
        assert_eq!(spec.url, "https://slack.com/api/chat.postMessage");
        assert!(spec
            .headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer xoxb-123"));
    }

    #[test]
    fn ntfy_carries_message_as_text_body() {
        let spec = request_for(&delivery(
            "ntfy",
            &[("host", "ntfy.sh"), ("topic", "alerts")],
            &[("title", "Vigil")],
        ))
        .unwrap();
        assert_eq!(spec.url, "https://ntfy.sh/alerts");
        assert!(matches!(spec.body, Body::Text(ref t) if t == "hello"));
        assert!(spec.headers.iter().any(|(k, v)| k == "Title" && v == "Vigil"));
    }

    #[test]
    fn generic_honours_method_keys_and_vars() {
        let spec = request_for(&delivery(
            "generic",
            &[
                ("host", "example.com"),
                ("query_vars", r#"{"env":"prod"}"#),
                ("json_payload_vars", r#"{"source":"vigil"}"#),
                ("custom_headers", r#"{"X-Auth":"s"}"#),
            ],
            &[
                ("requestmethod", "PUT"),
                ("titlekey", "subject"),
                ("messagekey", "body"),
                ("title", "Vigil"),
            ],
        ))
        .unwrap();
        assert_eq!(spec.method, Method::PUT);
        assert_eq!(spec.url, "https://example.com?env=prod");
        assert!(spec.headers.iter().any(|(k, v)| k == "X-Auth" && v == "s"));
        match spec.body {
            Body::Json(payload) => {
                assert_eq!(payload["subject"], "Vigil");
                assert_eq!(payload["body"], "hello");
                assert_eq!(payload["source"], "vigil");
            }
            _ => panic!("expected json body"),
        }
    }

    #[test]
    fn every_kind_maps_to_a_request() {
        for kind in crate::adapter::supported_kinds() {
            if kind == "smtp" {
                continue;
            }
            assert!(
                request_for(&delivery(kind, &[("host", "h")], &[])).is_ok(),
                "no request mapping for {kind}"
            );
        }
    }

    #[test]
    fn urlencode_escapes_reserved_bytes() {
        assert_eq!(urlencode("a b&c"), "a%20b%26c");
        assert_eq!(urlencode("plain-text_1.2~"), "plain-text_1.2~");
    }
}
