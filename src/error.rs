//! Error types for the Xray provider.

use thiserror::Error;

use crate::schema::{Diagnostic, DiagnosticSeverity};

/// Errors that can occur while running a resource operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The configuration was rejected locally, before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider itself is misconfigured or not configured yet.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request never produced a response (connect failure, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with an unexpected status. The body is kept verbatim.
    #[error("API request failed with status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns a reference to the error message for any variant.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Api { body, .. } => body,
            Self::FailedPrecondition(msg) => msg,
        }
    }

    /// The HTTP status of an API error, if the remote side answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a read may be retried after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_connect() || err.is_timeout(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Collapse error diagnostics into a single validation error.
    ///
    /// Warnings are dropped. Summaries and details are kept so that messages
    /// such as `Only one of ...` reach the caller unchanged.
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let message = diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .map(|d| match (&d.attribute, &d.detail) {
                (Some(attr), Some(detail)) => format!("{} (at {}): {}", d.summary, attr, detail),
                (Some(attr), None) => format!("{} (at {})", d.summary, attr),
                (None, Some(detail)) => format!("{}: {}", d.summary, detail),
                (None, None) => d.summary.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation(message)
    }

    /// Render this error as an error diagnostic for the host.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string())
    }
}
