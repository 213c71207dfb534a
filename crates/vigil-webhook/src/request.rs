//! Outbound webhook request construction.
//!
//! GitHub-style webhooks POST a simulated push payload, HMAC-signed with
//! both the legacy SHA-1 and the current SHA-256 header, under the full
//! set of headers a real GitHub hook delivery carries. GitLab-style
//! webhooks POST an empty form body and carry the secret and a fixed ref
//! as query parameters, preserving whatever query the caller configured.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;
use sha2::Sha256;
use url::Url;
use uuid::Uuid;

use vigil_core::template::render_template;
use vigil_core::util::{rand_hex, rand_numeric};
use vigil_core::ServiceInfo;

use crate::config::WebHook;
use crate::error::WebhookError;

/// The simulated push payload of a GitHub-style webhook.
#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    /// Always `refs/heads/master`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Random 40-char hex blob standing in for the previous commit.
    pub before: String,
    /// Random 40-char hex blob standing in for the new commit.
    pub after: String,
}

impl PushPayload {
    /// A payload with fresh random commit ids.
    pub fn random() -> Self {
        Self {
            git_ref: "refs/heads/master".to_string(),
            before: rand_hex(40),
            after: rand_hex(40),
        }
    }
}

/// HMAC hex digests of `payload`: `(sha1, sha256)`.
pub fn signatures(payload: &[u8], secret: &str) -> Result<(String, String), WebhookError> {
    let build_err = |err: &dyn std::fmt::Display| WebhookError::Build {
        id: String::new(),
        reason: format!("failed to sign payload: {err}"),
    };

    let mut sha1 =
        Hmac::<Sha1>::new_from_slice(secret.as_bytes()).map_err(|e| build_err(&e))?;
    sha1.update(payload);
    let sha1_hex = hex::encode(sha1.finalize().into_bytes());

    let mut sha256 =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|e| build_err(&e))?;
    sha256.update(payload);
    let sha256_hex = hex::encode(sha256.finalize().into_bytes());

    Ok((sha1_hex, sha256_hex))
}

/// Adds `token` and `ref=master` to a GitLab-style URL.
///
/// Pre-existing query parameters are preserved and a key the caller
/// already set is never duplicated. The final query is sorted by key.
pub fn gitlab_url(base: &str, secret: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base)?;

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if !pairs.iter().any(|(key, _)| key == "token") {
        pairs.push(("token".to_string(), secret.to_string()));
    }
    if !pairs.iter().any(|(key, _)| key == "ref") {
        pairs.push(("ref".to_string(), "master".to_string()));
    }
    pairs.sort();

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url.into())
}

impl WebHook {
    /// Builds the ready-to-send request for this webhook.
    pub fn build_request(
        &self,
        info: &ServiceInfo,
    ) -> Result<reqwest::RequestBuilder, WebhookError> {
        let url = self.url(info);

        let mut builder = match self.kind().as_str() {
            "gitlab" => {
                let url = gitlab_url(&url, &self.secret()).map_err(|err| WebhookError::Build {
                    id: self.id().to_string(),
                    reason: format!("invalid url {url:?}: {err}"),
                })?;
                self.client
                    .post(url)
                    .header("Content-Type", "application/x-www-form-urlencoded")
            }
            _ => {
                let payload = PushPayload::random();
                let body = serde_json::to_vec(&payload).map_err(|err| WebhookError::Build {
                    id: self.id().to_string(),
                    reason: format!("failed to encode payload: {err}"),
                })?;
                let (sha1_hex, sha256_hex) = signatures(&body, &self.secret())?;

                self.client
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .header("X-GitHub-Event", "push")
                    .header("X-GitHub-Hook-ID", rand_numeric(9))
                    .header("X-GitHub-Delivery", Uuid::new_v4().to_string())
                    .header("X-GitHub-Hook-Installation-Target-ID", rand_numeric(9))
                    .header("X-GitHub-Hook-Installation-Target-Type", "repository")
                    .header("X-Hub-Signature", format!("sha1={sha1_hex}"))
                    .header("X-Hub-Signature-256", format!("sha256={sha256_hex}"))
                    .body(body)
            }
        };

        for header in self.custom_headers() {
            builder = builder.header(&header.key, render_template(&header.value, info));
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_payload() -> Vec<u8> {
        serde_json::to_vec(&PushPayload {
            git_ref: "refs/heads/master".to_string(),
            before: "0123456789012345678901234567890123456789".to_string(),
            after: "0123456789012345678901234567890123456789".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn payload_serializes_in_push_order() {
        assert_eq!(
            String::from_utf8(fixed_payload()).unwrap(),
            r#"{"ref":"refs/heads/master","before":"0123456789012345678901234567890123456789","after":"0123456789012345678901234567890123456789"}"#
        );
    }

    #[test]
    fn random_payload_commit_ids_are_40_hex() {
        let payload = PushPayload::random();
        assert_eq!(payload.git_ref, "refs/heads/master");
        for blob in [&payload.before, &payload.after] {
            assert_eq!(blob.len(), 40);
            assert!(blob.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn signatures_match_pinned_digests() {
        let (sha1_hex, sha256_hex) = signatures(&fixed_payload(), "123").unwrap();
        assert_eq!(sha1_hex, "26e156e13c636012c7ce94e42af9aafcf14f1db9");
        assert_eq!(
            sha256_hex,
            "bdbb868fefc12db787237d2241c8c1bb9828a7849ce4b9eecc198a321cd0b429"
        );
    }

    #[test]
    fn gitlab_url_preserves_and_sorts_query() {
        let url = gitlab_url("https://example.com?test=123", "secret").unwrap();
        assert_eq!(url, "https://example.com/?ref=master&test=123&token=secret");
    }

    #[test]
    fn gitlab_url_never_duplicates_caller_keys() {
        let url = gitlab_url("https://example.com?token=mine&ref=main", "secret").unwrap();
        assert_eq!(url, "https://example.com/?ref=main&token=mine");
    }

    #[test]
    fn gitlab_url_rejects_garbage() {
        assert!(gitlab_url("not a url", "secret").is_err());
    }
}
