//! The `ProviderService` trait: the surface a host runtime drives.
//!
//! Every resource operation works on the caller's [`ResourceData`] and
//! returns diagnostics. Errors that stop an operation come back as
//! [`ProviderError`]; warnings travel in the diagnostics.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ProviderMetadata, ResourceData};
use crate::validation::validate;

/// Trait that provider implementations must implement.
///
/// # Example
///
/// ```ignore
/// use xray_provider::{ProviderService, XrayProvider};
/// use serde_json::json;
///
/// let provider = XrayProvider::new();
/// provider.configure(json!({"url": "https://acme.jfrog.io", "access_token": "..."})).await?;
///
/// let mut data = ResourceData::new(json!({"repo_name": "libs", "config": [{}]}));
/// provider.create("xray_repository_config", &mut data).await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.schema().resources.keys().cloned().collect(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration. No network calls are made.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource_schema = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validate(resource_schema, &config))
    }

    /// Create a resource from `data`'s state.
    async fn create(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Refresh `data` from the remote object.
    async fn read(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Apply `data`'s changed state.
    async fn update(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Remove the resource from management.
    async fn delete(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<ResourceData, ProviderError> {
        let _ = id;
        Err(ProviderError::UnknownResource(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}
