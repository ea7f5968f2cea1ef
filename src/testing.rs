//! Testing utilities for provider implementations.
//!
//! This module provides utilities to drive a `ProviderService` through whole
//! resource lifecycles and to check the diagnostics it returns.
//!
//! # Example
//!
//! ```ignore
//! use xray_provider::testing::ProviderTester;
//! use xray_provider::XrayProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_repository_config() {
//!     let tester = ProviderTester::new(XrayProvider::new());
//!     tester.configure(json!({"url": server.uri(), "access_token": "test"})).await.unwrap();
//!
//!     let data = tester.create("xray_repository_config", json!({
//!         "repo_name": "libs-release-local",
//!         "config": [{}]
//!     })).await.unwrap();
//!
//!     assert_eq!(data.id(), Some("libs-release-local"));
//! }
//! ```

use crate::client::{RetryPolicy, XrayClient};
use crate::error::ProviderError;
use crate::resources::report::get_report;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::ResourceData;
use serde_json::Value;

/// A test harness for provider implementations.
///
/// This wraps a `ProviderService` implementation and provides
/// simplified methods for lifecycle tests.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Create a new resource from configuration.
    pub async fn create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<ResourceData, ProviderError> {
        let mut data = ResourceData::new(config);
        self.provider.create(resource_type, &mut data).await?;
        Ok(data)
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider.read(resource_type, data).await
    }

    /// Replace the configuration of an existing resource and apply it.
    pub async fn update(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        data.set_state(config);
        self.provider.update(resource_type, data).await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider.delete(resource_type, data).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<ResourceData, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: create → read.
    ///
    /// Returns the data after the final read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<ResourceData, ProviderError> {
        let mut data = self.create(resource_type, config).await?;
        self.read(resource_type, &mut data).await?;
        Ok(data)
    }

    /// Run a full update lifecycle: update → read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
        config: Value,
    ) -> Result<(), ProviderError> {
        self.update(resource_type, data, config).await?;
        self.read(resource_type, data).await?;
        Ok(())
    }

    /// Run a full CRUD lifecycle: create → read → update → read → delete.
    ///
    /// Returns the data as it was after the update (before delete) and the
    /// diagnostics of the delete.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<(ResourceData, Vec<Diagnostic>), ProviderError> {
        let mut data = self.lifecycle_create(resource_type, initial_config).await?;
        self.lifecycle_update(resource_type, &mut data, updated_config)
            .await?;

        let updated = data.clone();
        let diagnostics = self.delete(resource_type, &mut data).await?;
        Ok((updated, diagnostics))
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
    /// A remote object that should be gone is still there.
    StillExists(String),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
            TestError::StillExists(id) => write!(f, "{} still exists", id),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Check that a report is gone on the remote side.
///
/// Sends a single GET with [`RetryPolicy::Never`]: a 404 means the report is
/// gone, a 200 means it still exists, anything else is returned as is.
pub async fn verify_report_deleted(client: &XrayClient, report_id: &str) -> Result<(), TestError> {
    match get_report(client, report_id, None, RetryPolicy::Never).await {
        Ok(_) => Err(TestError::StillExists(format!("report {}", report_id))),
        Err(e) if e.status() == Some(404) => Ok(()),
        Err(e) => Err(TestError::Provider(e)),
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain a warning with the given summary substring.
///
/// # Panics
///
/// Panics if no warning diagnostic contains the given substring.
pub fn assert_has_warning(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_warning = diagnostics.iter().any(|d| {
        matches!(d.severity, DiagnosticSeverity::Warning) && d.summary.contains(substring)
    });

    assert!(
        has_matching_warning,
        "Expected a warning containing '{}', but got: {:?}",
        substring,
        diagnostics.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}
