//! JFrog Xray provider
//!
//! This crate manages JFrog Xray configuration objects as declarative
//! resources. A host runtime drives it through the [`ProviderService`] trait;
//! every call validates the resource configuration against its schema, maps
//! it to the Xray REST payload and talks to the API with an authenticated
//! [`XrayClient`].
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Schema types**: builder types describing provider and resource
//!   configuration, including defaults and mutually exclusive attributes
//! - **Validation**: local checks of a configuration tree against its schema
//! - **Resources**: `xray_repository_config` and the four report resources
//!   (`xray_licenses_report`, `xray_operational_risks_report`,
//!   `xray_violations_report`, `xray_vulnerabilities_report`)
//! - **HTTP client**: bearer-token client with retries for reads
//! - **Error types**: one error enum for every failure the provider reports
//! - **Logging**: integration with `tracing` for structured logging
//! - **Testing**: a harness for driving resource lifecycles in tests
//!
//! # Quick Start
//!
//! ```ignore
//! use xray_provider::{init_logging, ProviderService, ResourceData, XrayProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = XrayProvider::new();
//!     provider
//!         .configure(json!({"url": "https://acme.jfrog.io", "access_token": "..."}))
//!         .await?;
//!
//!     let mut data = ResourceData::new(json!({
//!         "name": "weekly-licenses",
//!         "resources": [{"repository": [{"name": "libs-release-local"}]}],
//!         "filters": [{"unknown": false, "license_names": ["MIT"]}]
//!     }));
//!     provider.create("xray_licenses_report", &mut data).await?;
//!     println!("report id: {:?}", data.id());
//!     Ok(())
//! }
//! ```
//!
//! # Lifecycle
//!
//! - **ValidateProviderConfig / Configure**: check and apply the provider block
//! - **Stop**: drop the configured client
//! - **ValidateResourceConfig**: schema checks, no network calls
//! - **Create/Read/Update**: send the configuration and read it back
//! - **Delete**: Xray has no delete endpoint for these objects; the instance
//!   is removed from state with a warning
//! - **ImportResourceState**: adopt an existing object by identifier

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{RetryPolicy, XrayClient};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::XrayProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{ProviderMetadata, ResourceData};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
