//! Resource implementations.
//!
//! Every resource follows the same lifecycle:
//!
//! - **create**: validate, fill in schema defaults, unpack into the wire
//!   payload, send it, record the identifier, then read back.
//! - **read**: fetch by identifier. A non-200 answer clears the identifier so
//!   the host schedules a recreation; the error is still returned.
//! - **update**: same path as create.
//! - **delete**: the API has no delete endpoint. The identifier is cleared
//!   locally and a warning is returned; nothing is sent.

pub mod report;
pub mod repository_config;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::client::XrayClient;
use crate::error::ProviderError;
use crate::schema::{has_errors, Diagnostic, Schema};
use crate::types::ResourceData;
use crate::validation::validate;

pub use report::{
    Licenses, OperationalRisks, ReportKind, ReportResource, Violations, Vulnerabilities,
};
pub use repository_config::RepositoryConfigResource;

/// Conversion between a typed configuration tree and its REST payload.
///
/// `unpack` drops blocks that were not supplied so the remote side applies its
/// own defaults; `pack` maps absent payload objects back to empty block lists.
/// For every valid configuration `pack(&x.unpack()) == x`.
pub trait WireMapping: Sized {
    /// The payload sent to or received from the API.
    type Wire: Serialize + DeserializeOwned + Send + Sync;

    /// Configuration to payload.
    fn unpack(&self) -> Self::Wire;

    /// Payload to configuration.
    fn pack(wire: &Self::Wire) -> Self;
}

/// A managed resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The resource type name, e.g. `xray_repository_config`.
    fn type_name(&self) -> &'static str;

    /// The configuration schema.
    fn schema(&self) -> Schema;

    /// Validate a configuration tree without touching the network.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate(&self.schema(), config)
    }

    /// Create the remote object from `data`'s state and read it back.
    async fn create(
        &self,
        client: &XrayClient,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Refresh `data` from the remote object.
    async fn read(
        &self,
        client: &XrayClient,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Apply changed configuration. Same as create.
    async fn update(
        &self,
        client: &XrayClient,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.create(client, data).await
    }

    /// Forget the instance locally. The remote object is left as it is.
    fn delete(&self, data: &mut ResourceData) -> Vec<Diagnostic> {
        warn!(
            resource_type = self.type_name(),
            id = data.id().unwrap_or_default(),
            "no delete endpoint in the API, removing from state only"
        );
        data.clear_id();

        vec![Diagnostic::warning("No delete functionality provided by API").with_detail(
            "The resource was removed from state. The actual configuration in Xray remains unchanged.",
        )]
    }

    /// Adopt an existing remote object by identifier.
    async fn import(&self, client: &XrayClient, id: &str) -> Result<ResourceData, ProviderError>;
}

/// Every resource served by the provider.
pub fn registry() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(RepositoryConfigResource),
        Box::new(ReportResource::<Licenses>::new()),
        Box::new(ReportResource::<OperationalRisks>::new()),
        Box::new(ReportResource::<Violations>::new()),
        Box::new(ReportResource::<Vulnerabilities>::new()),
    ]
}

/// Validate a state tree, apply schema defaults and decode it.
pub(crate) fn decode_config<M: DeserializeOwned>(
    schema: &Schema,
    state: &Value,
) -> Result<M, ProviderError> {
    let diagnostics = validate(schema, state);
    if has_errors(&diagnostics) {
        return Err(ProviderError::from_diagnostics(&diagnostics));
    }

    let mut config = state.clone();
    schema.apply_defaults(&mut config);
    Ok(serde_json::from_value(config)?)
}

/// The identifier of an instance that must already exist.
pub(crate) fn require_id(data: &ResourceData, type_name: &str) -> Result<String, ProviderError> {
    data.id().map(str::to_owned).ok_or_else(|| {
        ProviderError::FailedPrecondition(format!("{} has no identifier to read", type_name))
    })
}

/// Clear the identifier when the API answered a read with a non-200 status.
pub(crate) fn forget_on_api_error(data: &mut ResourceData, err: &ProviderError, type_name: &str) {
    if let Some(status) = err.status() {
        if status != 200 {
            error!(
                resource_type = type_name,
                id = data.id().unwrap_or_default(),
                status,
                "remote object missing or unreadable, removing from state"
            );
            data.clear_id();
        }
    }
}

/// The first item of a single-item block list.
pub(crate) fn first<M: WireMapping>(blocks: &[M]) -> Option<M::Wire> {
    blocks.first().map(WireMapping::unpack)
}

/// An optional payload object as a block list.
pub(crate) fn block<M: WireMapping>(wire: Option<&M::Wire>) -> Vec<M> {
    wire.map(M::pack).into_iter().collect()
}
