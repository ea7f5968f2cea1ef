//! The Xray provider: configuration plus dispatch to the resource registry.

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::client::XrayClient;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::{registry, Resource};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::ResourceData;
use crate::validation::validate;

/// JFrog Xray provider.
///
/// Holds the resource registry and, once configured, an [`XrayClient`]. The
/// client sits behind an async lock so independent resource instances can be
/// driven concurrently.
pub struct XrayProvider {
    resources: Vec<Box<dyn Resource>>,
    client: RwLock<Option<XrayClient>>,
}

impl XrayProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self {
            resources: registry(),
            client: RwLock::new(None),
        }
    }

    /// A provider that is already configured with `client`.
    pub fn with_client(client: XrayClient) -> Self {
        Self {
            resources: registry(),
            client: RwLock::new(Some(client)),
        }
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .iter()
            .find(|r| r.type_name() == resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    async fn client(&self) -> Result<XrayClient, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider is not configured".to_string())
        })
    }
}

impl Default for XrayProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for XrayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XrayProvider")
            .field(
                "resources",
                &self.resources.iter().map(|r| r.type_name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ProviderService for XrayProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources.iter().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, resource| schema.with_resource(resource.type_name(), resource.schema()),
        )
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("Configure called");
        let diagnostics = validate(&ProviderConfig::schema(), &config);
        if has_errors(&diagnostics) {
            warn!(
                diagnostics = diagnostics.len(),
                "Configure completed with errors"
            );
            return Ok(diagnostics);
        }

        let settings = ProviderConfig::from_value(&config)?;
        let client = XrayClient::new(&settings)?;
        *self.client.write().await = Some(client);

        info!(url = %settings.url, max_retries = settings.max_retries, "Configure completed successfully");
        Ok(diagnostics)
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        *self.client.write().await = None;
        info!("Stop completed successfully");
        Ok(())
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = self.resource(resource_type)?.validate(&config);
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "ValidateResourceConfig completed with errors");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, data), name = "provider.create")]
    async fn create(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        info!("Create called");

        match resource.create(&client, data).await {
            Ok(diagnostics) => {
                info!(id = data.id().unwrap_or_default(), "Create completed successfully");
                Ok(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "Create failed");
                Err(e)
            },
        }
    }

    #[instrument(skip(self, data), name = "provider.read")]
    async fn read(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        debug!(id = data.id().unwrap_or_default(), "Read called");

        resource.read(&client, data).await.map_err(|e| {
            error!(error = %e, "Read failed");
            e
        })
    }

    #[instrument(skip(self, data), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        info!(id = data.id().unwrap_or_default(), "Update called");

        resource.update(&client, data).await.map_err(|e| {
            error!(error = %e, "Update failed");
            e
        })
    }

    #[instrument(skip(self, data), name = "provider.delete")]
    async fn delete(
        &self,
        resource_type: &str,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(resource.delete(data))
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<ResourceData, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let data = resource.import(&client, id).await.map_err(|e| {
            error!(error = %e, "ImportResourceState failed");
            e
        })?;
        info!("ImportResourceState completed successfully");
        Ok(data)
    }
}
