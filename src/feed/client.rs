//! HTTP client for the update feed.
//!
//! One GET per call against `{base}/update-info`, no retry, no caching.
//! The endpoint wraps the raw descriptor document in a JSON envelope:
//! `{"success": true, "data": "<yaml text>", "message": ...}`.

use crate::error::FetchError;
use crate::feed::descriptor::VersionDescriptor;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout for a single feed request.
const FEED_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON envelope the feed endpoint wraps descriptor text in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEnvelope {
    /// Whether the publisher could read the descriptor document.
    pub success: bool,
    /// Raw descriptor document text (present on success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Human-readable status message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error detail (present on failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client for the feed endpoint.
pub struct FeedClient {
    base_url: String,
    http: reqwest::Client,
}

impl FeedClient {
    /// Create a client for a feed base URL (e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        // Connect timeout only: the client is shared with artifact
        // downloads, which must not be capped by a whole-request timeout.
        let http = reqwest::Client::builder()
            .connect_timeout(FEED_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http,
        }
    }

    /// The configured feed base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared HTTP client, reused for artifact downloads.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch and parse the latest version descriptor.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Unreachable`] on transport failure, non-2xx status,
    ///   or a `success: false` envelope.
    /// - [`FetchError::MalformedDocument`] when the envelope or the
    ///   descriptor text does not parse.
    pub async fn fetch_latest(&self) -> Result<VersionDescriptor, FetchError> {
        let url = format!("{}/update-info", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(FEED_TIMEOUT)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unreachable(format!(
                "GET {url} returned status {status}"
            )));
        }

        let envelope: FeedEnvelope = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedDocument(format!("envelope parse failed: {e}")))?;

        if !envelope.success {
            return Err(FetchError::Unreachable(format!(
                "feed reported failure: {}",
                envelope
                    .error
                    .or(envelope.message)
                    .unwrap_or_else(|| "no detail".to_owned())
            )));
        }

        let text = envelope.data.ok_or_else(|| {
            FetchError::MalformedDocument("envelope has no data field".to_owned())
        })?;

        VersionDescriptor::parse(&text)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope_body(yaml: &str) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "data": yaml,
            "message": "ok"
        })
    }

    #[test]
    fn base_url_trailing_slash_stripped() {
        let client = FeedClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn fetch_latest_parses_envelope_and_descriptor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/update-info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope_body("version: 1.2.0\npath: app-setup.exe\n")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = FeedClient::new(server.uri());
        let descriptor = client.fetch_latest().await.unwrap();
        assert_eq!(descriptor.version.to_string(), "1.2.0");
        assert_eq!(descriptor.path, "app-setup.exe");
    }

    #[tokio::test]
    async fn fetch_latest_maps_500_to_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/update-info"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "success": false,
                "message": "read failed",
                "error": "ENOENT"
            })))
            .mount(&server)
            .await;

        let client = FeedClient::new(server.uri());
        let result = client.fetch_latest().await;
        assert!(matches!(result, Err(FetchError::Unreachable(_))));
    }

    #[tokio::test]
    async fn fetch_latest_maps_failure_envelope_to_unreachable() {
        // A 200 carrying success: false still counts as unreachable.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/update-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": "descriptor unreadable"
            })))
            .mount(&server)
            .await;

        let client = FeedClient::new(server.uri());
        let result = client.fetch_latest().await;
        assert!(matches!(result, Err(FetchError::Unreachable(_))));
    }

    #[tokio::test]
    async fn fetch_latest_maps_bad_yaml_to_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/update-info"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope_body("{oops ::::")),
            )
            .mount(&server)
            .await;

        let client = FeedClient::new(server.uri());
        let result = client.fetch_latest().await;
        assert!(matches!(result, Err(FetchError::MalformedDocument(_))));
    }

    #[tokio::test]
    async fn fetch_latest_maps_non_json_body_to_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/update-info"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = FeedClient::new(server.uri());
        let result = client.fetch_latest().await;
        assert!(matches!(result, Err(FetchError::MalformedDocument(_))));
    }

    #[tokio::test]
    async fn fetch_latest_unreachable_host() {
        // Port 1 is essentially guaranteed closed.
        let client = FeedClient::new("http://127.0.0.1:1");
        let result = client.fetch_latest().await;
        assert!(matches!(result, Err(FetchError::Unreachable(_))));
    }
}
