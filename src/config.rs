//! Provider configuration.
//!
//! The host hands the provider block over as JSON. `url` and `access_token`
//! may be left out there and taken from the environment instead:
//!
//! - `XRAY_URL`, then `JFROG_URL`
//! - `XRAY_ACCESS_TOKEN`, then `JFROG_ACCESS_TOKEN`

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::ProviderError;
use crate::schema::{Attribute, Constraint, Schema};

const URL_ENV_VARS: [&str; 2] = ["XRAY_URL", "JFROG_URL"];
const TOKEN_ENV_VARS: [&str; 2] = ["XRAY_ACCESS_TOKEN", "JFROG_ACCESS_TOKEN"];

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default number of retries for read requests.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Resolved provider settings.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    /// Base URL of the JFrog platform, e.g. `https://acme.jfrog.io`.
    pub url: Url,
    /// Bearer token sent with every request.
    pub access_token: String,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// How many times a failed read is retried on transient errors.
    pub max_retries: usize,
}

// The token stays out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url.as_str())
            .field("access_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    url: Option<String>,
    access_token: Option<String>,
    request_timeout: Option<u64>,
    max_retries: Option<usize>,
}

impl ProviderConfig {
    /// Build a configuration directly, with default timeout and retries.
    pub fn new(url: &str, access_token: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            url: parse_base_url(url)?,
            access_token: access_token.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Set the number of read retries.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve the provider block, falling back to the process environment.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve the provider block with an explicit environment lookup.
    pub fn resolve(
        config: &Value,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProviderError> {
        let raw: RawConfig = match config {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other.clone())?,
        };

        let lookup = |explicit: Option<String>, vars: &[&str]| {
            explicit
                .filter(|v| !v.is_empty())
                .or_else(|| vars.iter().find_map(|name| env(*name).filter(|v| !v.is_empty())))
        };

        let url = lookup(raw.url, &URL_ENV_VARS[..]).ok_or_else(|| {
            ProviderError::Configuration(
                "url must be set in the provider block or via XRAY_URL/JFROG_URL".to_string(),
            )
        })?;
        let access_token = lookup(raw.access_token, &TOKEN_ENV_VARS[..]).ok_or_else(|| {
            ProviderError::Configuration(
                "access_token must be set in the provider block or via XRAY_ACCESS_TOKEN/JFROG_ACCESS_TOKEN"
                    .to_string(),
            )
        })?;

        Ok(Self {
            url: parse_base_url(&url)?,
            access_token,
            request_timeout: Duration::from_secs(
                raw.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            max_retries: raw.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }

    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("JFrog Xray provider configuration")
            .with_attribute(
                "url",
                Attribute::optional_string()
                    .with_constraint(Constraint::NotEmpty)
                    .with_description("JFrog platform URL. Falls back to XRAY_URL or JFROG_URL."),
            )
            .with_attribute(
                "access_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_constraint(Constraint::NotEmpty)
                    .with_description(
                        "Access token. Falls back to XRAY_ACCESS_TOKEN or JFROG_ACCESS_TOKEN.",
                    ),
            )
            .with_attribute(
                "request_timeout",
                Attribute::optional_int64()
                    .with_default(json!(DEFAULT_REQUEST_TIMEOUT_SECS))
                    .with_constraint(Constraint::AtLeast(1))
                    .with_description("HTTP request timeout in seconds."),
            )
            .with_attribute(
                "max_retries",
                Attribute::optional_int64()
                    .with_default(json!(DEFAULT_MAX_RETRIES))
                    .with_constraint(Constraint::AtLeast(0))
                    .with_description("Retries for read requests on transient failures."),
            )
    }
}

/// Parse a base URL, making sure it ends with a slash so endpoints append to it.
fn parse_base_url(raw: &str) -> Result<Url, ProviderError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ProviderError::Configuration(format!("invalid url '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ProviderError::Configuration(format!(
            "invalid url '{}': not a base URL",
            raw
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
