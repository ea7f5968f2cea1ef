//! HTTP client for the Xray REST API.
//!
//! Mutations (PUT/POST) are sent exactly once. Reads follow a [`RetryPolicy`]:
//! the client's configured transient policy by default, or an explicit
//! [`RetryPolicy::Never`] when a caller must see the first answer, e.g. when
//! checking that something is really gone.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{debug, warn};
use url::Url;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

/// Maximum length of response body to log.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Delay before the first retry of a read.
const BASE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Upper bound for a single backoff step.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How a read reacts to transient failures (connect errors, timeouts, 429, 5xx).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Send once and report whatever comes back.
    Never,
    /// Retry up to `max_retries` times with exponential backoff.
    Transient {
        /// Retries after the first attempt.
        max_retries: usize,
        /// Delay before the first retry; doubled for each further retry.
        base_delay: Duration,
    },
}

impl RetryPolicy {
    /// Transient retries with the default base delay.
    pub fn transient(max_retries: usize) -> Self {
        Self::Transient {
            max_retries,
            base_delay: BASE_RETRY_DELAY,
        }
    }

    /// The delays between attempts.
    pub fn backoff(self) -> std::iter::Take<ExponentialBackoff> {
        match self {
            Self::Never => ExponentialBackoff::from_millis(2).take(0),
            Self::Transient {
                max_retries,
                base_delay,
            } => {
                let factor = (base_delay.as_millis() as u64 / 2).max(1);
                ExponentialBackoff::from_millis(2)
                    .factor(factor)
                    .max_delay(MAX_RETRY_DELAY)
                    .take(max_retries)
            },
        }
    }
}

/// Authenticated client bound to one JFrog platform URL.
#[derive(Clone)]
pub struct XrayClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: String,
    read_retry: RetryPolicy,
}

impl std::fmt::Debug for XrayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XrayClient")
            .field("base_url", &self.base_url.as_str())
            .field("read_retry", &self.read_retry)
            .finish_non_exhaustive()
    }
}

impl XrayClient {
    /// Create a client from resolved provider settings.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("xray-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            access_token: config.access_token.clone(),
            read_retry: RetryPolicy::transient(config.max_retries),
        })
    }

    /// The retry policy used by reads unless a caller overrides it.
    pub fn read_retry(&self) -> RetryPolicy {
        self.read_retry
    }

    /// Build an endpoint URL from path segments (each one percent-encoded) and query pairs.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::Configuration(format!("'{}' cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// GET a JSON document. Anything but `200 OK` is an error.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        policy: RetryPolicy,
    ) -> Result<T, ProviderError> {
        let text = self
            .send(Method::GET, &url, None, policy, |status| status == StatusCode::OK)
            .await?;
        parse_body(&text)
    }

    /// PUT a JSON body. Never retried.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<Value, ProviderError> {
        let body = serde_json::to_value(body)?;
        let text = self
            .send(Method::PUT, &url, Some(&body), RetryPolicy::Never, |status| {
                status.is_success()
            })
            .await?;
        parse_body(&text)
    }

    /// POST a JSON body and decode the answer. Never retried.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ProviderError> {
        let body = serde_json::to_value(body)?;
        let text = self
            .send(Method::POST, &url, Some(&body), RetryPolicy::Never, |status| {
                status.is_success()
            })
            .await?;
        parse_body(&text)
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        policy: RetryPolicy,
        accept: fn(StatusCode) -> bool,
    ) -> Result<String, ProviderError> {
        RetryIf::start(
            policy.backoff(),
            || self.attempt(method.clone(), url, body, accept),
            |err: &ProviderError| {
                let retry = err.is_transient();
                if retry {
                    debug!(%method, %url, error = %err, "retrying request");
                }
                retry
            },
        )
        .await
    }

    async fn attempt(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        accept: fn(StatusCode) -> bool,
    ) -> Result<String, ProviderError> {
        debug!(%method, %url, "sending request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&self.access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !accept(status) {
            warn!(%method, %url, %status, body = %sanitize_for_log(&text), "API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ProviderError> {
    if text.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(text)?)
}

/// Truncate a response body for logging. Callers still get the full body.
fn sanitize_for_log(body: &str) -> String {
    let truncated: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
    let truncated = if truncated.len() < body.len() {
        format!("{}... [truncated, {} bytes total]", truncated, body.len())
    } else {
        truncated
    };
    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> XrayClient {
        let config = ProviderConfig::new(url, "token").unwrap();
        XrayClient::new(&config).unwrap()
    }

    #[test]
    fn test_never_has_no_retries() {
        assert_eq!(RetryPolicy::Never.backoff().count(), 0);
    }

    #[test]
    fn test_transient_backoff_doubles() {
        let delays: Vec<Duration> = RetryPolicy::transient(3).backoff().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[test]
    fn test_transient_backoff_is_capped() {
        let delays: Vec<Duration> = RetryPolicy::transient(12).backoff().collect();
        assert_eq!(delays.len(), 12);
        assert!(delays.iter().all(|d| *d <= MAX_RETRY_DELAY));
    }

    #[test]
    fn test_read_retry_follows_config() {
        let config = ProviderConfig::new("https://x.example", "t")
            .unwrap()
            .with_max_retries(1);
        let client = XrayClient::new(&config).unwrap();
        assert_eq!(client.read_retry(), RetryPolicy::transient(1));
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let url = client("https://acme.jfrog.io")
            .endpoint(&["xray", "api", "v1", "repos_config", "libs-release"], &[])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://acme.jfrog.io/xray/api/v1/repos_config/libs-release"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes() {
        let url = client("https://acme.example/platform")
            .endpoint(&["xray", "api", "v1", "repos_config", "my repo/x"], &[])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://acme.example/platform/xray/api/v1/repos_config/my%20repo%2Fx"
        );
    }

    #[test]
    fn test_endpoint_query() {
        let url = client("https://acme.example")
            .endpoint(&["xray", "api", "v1", "reports", "7"], &[("projectKey", "proj")])
            .unwrap();
        assert_eq!(url.query(), Some("projectKey=proj"));
    }

    #[test]
    fn test_parse_body_empty_is_null() {
        let value: Value = parse_body("").unwrap();
        assert_eq!(value, Value::Null);
        let value: Value = parse_body("{\"info\":\"ok\"}").unwrap();
        assert_eq!(value["info"], "ok");
    }

    #[test]
    fn test_sanitize_for_log_truncates() {
        let body = "x".repeat(500);
        let logged = sanitize_for_log(&body);
        assert!(logged.contains("[truncated, 500 bytes total]"));
        assert_eq!(sanitize_for_log("short body"), "short body");
    }

    #[tokio::test]
    async fn test_get_retries_until_success() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xray/api/v1/reports/1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/xray/api/v1/reports/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":1}"))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let url = client.endpoint(&["xray", "api", "v1", "reports", "1"], &[]).unwrap();
        let policy = RetryPolicy::Transient {
            max_retries: 2,
            base_delay: Duration::from_millis(2),
        };

        let value: Value = client.get(url, policy).await.unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_never_policy_sends_once() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let url = client.endpoint(&["xray", "api", "v1", "reports", "1"], &[]).unwrap();
        let err = client.get::<Value>(url, RetryPolicy::Never).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }
}
