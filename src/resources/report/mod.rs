//! Report resources: licenses, operational risks, violations and
//! vulnerabilities.
//!
//! All four share one lifecycle and differ only in their endpoint and their
//! `filters` block, captured by [`ReportKind`]. A report is generated once by
//! `POST xray/api/v1/reports/{kind}` and identified by the returned
//! `report_id`; every configuration attribute forces a new report.

pub mod filters;
pub mod selectors;

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use self::filters::{
    LicensesFilters, OperationalRisksFilters, ViolationsFilters, VulnerabilitiesFilters,
};
use self::selectors::{resources_block, ReportResources, ResourcesPayload};
use super::{block, decode_config, first, forget_on_api_error, require_id, Resource, WireMapping};
use crate::client::{RetryPolicy, XrayClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, Constraint, Diagnostic, NestedBlock, Schema};
use crate::types::ResourceData;

const REPORTS_PATH: [&str; 4] = ["xray", "api", "v1", "reports"];

/// What distinguishes one report type from another.
pub trait ReportKind: Send + Sync + 'static {
    /// Resource type name, e.g. `xray_licenses_report`.
    const TYPE_NAME: &'static str;
    /// Last path segment of the creation endpoint.
    const ENDPOINT: &'static str;
    /// Human readable description.
    const DESCRIPTION: &'static str;

    /// Typed `filters` block.
    type Filters: WireMapping + Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync;

    /// Schema of the `filters` block.
    fn filters_block() -> Block;
}

/// Licenses report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Licenses;

impl ReportKind for Licenses {
    const TYPE_NAME: &'static str = "xray_licenses_report";
    const ENDPOINT: &'static str = "licenses";
    const DESCRIPTION: &'static str = "Creates an Xray licenses report.";
    type Filters = LicensesFilters;

    fn filters_block() -> Block {
        LicensesFilters::block()
    }
}

/// Operational risks report.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationalRisks;

impl ReportKind for OperationalRisks {
    const TYPE_NAME: &'static str = "xray_operational_risks_report";
    const ENDPOINT: &'static str = "operationalRisks";
    const DESCRIPTION: &'static str = "Creates an Xray operational risks report.";
    type Filters = OperationalRisksFilters;

    fn filters_block() -> Block {
        OperationalRisksFilters::block()
    }
}

/// Violations report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Violations;

impl ReportKind for Violations {
    const TYPE_NAME: &'static str = "xray_violations_report";
    const ENDPOINT: &'static str = "violations";
    const DESCRIPTION: &'static str = "Creates an Xray violations report.";
    type Filters = ViolationsFilters;

    fn filters_block() -> Block {
        ViolationsFilters::block()
    }
}

/// Vulnerabilities report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vulnerabilities;

impl ReportKind for Vulnerabilities {
    const TYPE_NAME: &'static str = "xray_vulnerabilities_report";
    const ENDPOINT: &'static str = "vulnerabilities";
    const DESCRIPTION: &'static str = "Creates an Xray vulnerabilities report.";
    type Filters = VulnerabilitiesFilters;

    fn filters_block() -> Block {
        VulnerabilitiesFilters::block()
    }
}

/// Configuration of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>"))]
pub struct ReportConfig<F> {
    /// Report name.
    pub name: String,
    /// Project the report belongs to, sent as the `projectKey` query parameter.
    pub project_key: Option<String>,
    /// What the report covers, exactly one item.
    #[serde(default)]
    pub resources: Vec<ReportResources>,
    /// Report type specific filters, exactly one item.
    #[serde(default)]
    pub filters: Vec<F>,
    /// Identifier assigned by Xray.
    pub report_id: Option<i64>,
    /// Generation status reported by Xray.
    pub status: Option<String>,
}

/// Body of `POST xray/api/v1/reports/{kind}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "W: Deserialize<'de>"))]
pub struct ReportRequest<W> {
    /// Report name.
    pub name: String,
    /// Travels in the query string, not in the body.
    #[serde(skip)]
    pub project_key: Option<String>,
    /// What the report covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesPayload>,
    /// Report type specific filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<W>,
}

/// Answer of the creation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCreated {
    /// New report identifier.
    pub report_id: i64,
    /// Initial status, e.g. `pending`.
    pub status: String,
}

/// Answer of `GET xray/api/v1/reports/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetails {
    /// Report identifier.
    pub id: i64,
    /// Report name.
    pub name: String,
    /// Report type, e.g. `vulnerability`.
    #[serde(default)]
    pub report_type: Option<String>,
    /// Generation status.
    #[serde(default)]
    pub status: Option<String>,
    /// Artifacts the report covers.
    #[serde(default)]
    pub total_artifacts: Option<i64>,
    /// Rows generated so far.
    #[serde(default)]
    pub number_of_rows: Option<i64>,
}

impl ReportDetails {
    /// Copy the fields Xray is authoritative for into a state tree.
    ///
    /// Filters and resources are not echoed by the API, so the configured
    /// values stay as they are.
    pub fn refresh(&self, state: &mut Value) {
        if !state.is_object() {
            *state = json!({});
        }
        if let Value::Object(map) = state {
            map.insert("name".to_string(), json!(self.name));
            map.insert("report_id".to_string(), json!(self.id));
            map.insert("status".to_string(), json!(self.status));
        }
    }
}

impl<F: WireMapping> WireMapping for ReportConfig<F> {
    type Wire = ReportRequest<F::Wire>;

    fn unpack(&self) -> Self::Wire {
        ReportRequest {
            name: self.name.clone(),
            project_key: self.project_key.clone(),
            resources: first(&self.resources),
            filters: first(&self.filters),
        }
    }

    fn pack(wire: &Self::Wire) -> Self {
        Self {
            name: wire.name.clone(),
            project_key: wire.project_key.clone(),
            resources: block(wire.resources.as_ref()),
            filters: block(wire.filters.as_ref()),
            report_id: None,
            status: None,
        }
    }
}

fn report_url(
    client: &XrayClient,
    last: &str,
    project_key: Option<&str>,
) -> Result<url::Url, ProviderError> {
    let mut segments = REPORTS_PATH.to_vec();
    segments.push(last);
    let query: Vec<(&str, &str)> = project_key.map(|key| ("projectKey", key)).into_iter().collect();
    client.endpoint(&segments, &query)
}

/// Fetch a report by identifier with an explicit retry policy.
pub async fn get_report(
    client: &XrayClient,
    report_id: &str,
    project_key: Option<&str>,
    policy: RetryPolicy,
) -> Result<ReportDetails, ProviderError> {
    let url = report_url(client, report_id, project_key)?;
    client.get(url, policy).await
}

/// Schema shared by every report type.
pub fn report_schema(description: &str, filters: Block) -> Schema {
    Schema::v0()
        .with_description(description)
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_constraint(Constraint::NotEmpty)
                .with_force_new()
                .with_description("Name of the report."),
        )
        .with_attribute(
            "project_key",
            Attribute::optional_string()
                .with_constraint(Constraint::NotEmpty)
                .with_force_new()
                .with_description("Project key the report is created in."),
        )
        .with_attribute(
            "report_id",
            Attribute::computed_int64().with_description("Report identifier."),
        )
        .with_attribute(
            "status",
            Attribute::computed_string().with_description("Report generation status."),
        )
        .with_block(
            "resources",
            NestedBlock::single(resources_block()).with_min_items(1),
        )
        .with_block("filters", NestedBlock::single(filters).with_min_items(1))
}

/// A report resource of kind `K`.
pub struct ReportResource<K> {
    kind: PhantomData<fn() -> K>,
}

impl<K: ReportKind> ReportResource<K> {
    /// Create the resource.
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<K: ReportKind> Default for ReportResource<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ReportKind> Debug for ReportResource<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportResource")
            .field("type_name", &K::TYPE_NAME)
            .finish()
    }
}

#[async_trait]
impl<K: ReportKind> Resource for ReportResource<K> {
    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        report_schema(K::DESCRIPTION, K::filters_block())
    }

    async fn create(
        &self,
        client: &XrayClient,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut config: ReportConfig<K::Filters> = decode_config(&self.schema(), data.state())?;
        let request = config.unpack();

        let url = report_url(client, K::ENDPOINT, request.project_key.as_deref())?;
        let created: ReportCreated = client.post(url, &request).await?;
        info!(
            resource_type = K::TYPE_NAME,
            report_id = created.report_id,
            status = %created.status,
            "report created"
        );

        config.report_id = Some(created.report_id);
        config.status = Some(created.status);
        data.set_state(serde_json::to_value(&config)?);
        data.set_id(created.report_id.to_string());

        self.read(client, data).await
    }

    async fn read(
        &self,
        client: &XrayClient,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let report_id = require_id(data, K::TYPE_NAME)?;
        let project_key = data
            .state()
            .get("project_key")
            .and_then(Value::as_str)
            .map(str::to_owned);

        match get_report(client, &report_id, project_key.as_deref(), client.read_retry()).await {
            Ok(details) => {
                debug!(resource_type = K::TYPE_NAME, report_id = %report_id, "report read");
                let mut state = data.state().clone();
                details.refresh(&mut state);
                data.set_state(state);
                Ok(vec![])
            },
            Err(err) => {
                forget_on_api_error(data, &err, K::TYPE_NAME);
                Err(err)
            },
        }
    }

    async fn import(&self, client: &XrayClient, id: &str) -> Result<ResourceData, ProviderError> {
        if id.parse::<i64>().is_err() {
            return Err(ProviderError::Validation(format!(
                "report id must be an integer, got '{}'",
                id
            )));
        }

        let mut data = ResourceData::with_id(id, json!({}));
        self.read(client, &mut data).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    fn licenses_config() -> Value {
        json!({
            "name": "terraform-licenses-report",
            "resources": [{
                "repository": [{
                    "name": "repository-name",
                    "include_path_patterns": ["pattern1", "pattern12"],
                    "exclude_path_patterns": ["pattern1", "pattern12"]
                }]
            }],
            "filters": [{
                "component": "component-name",
                "artifact": "impacted-artifact",
                "unknown": false,
                "unrecognized": true,
                "license_names": ["Apache", "MIT"],
                "scan_date": [{"start": "2020-06-29T12:22:16Z", "end": "2020-07-29T12:22:16Z"}]
            }]
        })
    }

    #[test]
    fn test_schema_requires_resources_and_filters() {
        let schema = ReportResource::<Licenses>::new().schema();
        let diagnostics = validate(&schema, &json!({"name": "weekly"}));
        assert_eq!(diagnostics.len(), 2);

        assert!(schema.block.attributes["name"].force_new);
        assert!(schema.block.attributes["project_key"].force_new);
        assert!(schema.block.attributes["report_id"].flags.computed);
    }

    #[test]
    fn test_license_conflict_rejected_by_decode() {
        let mut value = licenses_config();
        value["filters"][0]["license_patterns"] = json!(["*Apache*", "The Apache*"]);

        let schema = ReportResource::<Licenses>::new().schema();
        let err = decode_config::<ReportConfig<LicensesFilters>>(&schema, &value).unwrap_err();
        assert!(err.message().starts_with("Only one of license_names, license_patterns"));
    }

    #[test]
    fn test_request_body() {
        let schema = ReportResource::<Licenses>::new().schema();
        let mut value = licenses_config();
        value["project_key"] = json!("proj");
        let config: ReportConfig<LicensesFilters> = decode_config(&schema, &value).unwrap();
        let request = config.unpack();

        assert_eq!(request.project_key.as_deref(), Some("proj"));
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("project_key").is_none());
        assert_eq!(body["name"], "terraform-licenses-report");
        assert_eq!(body["resources"]["repositories"][0]["name"], "repository-name");
        assert_eq!(body["filters"]["license_names"], json!(["Apache", "MIT"]));
        assert_eq!(body["filters"]["scan_date"]["start"], "2020-06-29T12:22:16Z");
        assert!(body["resources"].get("builds").is_none());
    }

    #[test]
    fn test_builds_default_latest_versions_in_body() {
        let schema = ReportResource::<Vulnerabilities>::new().schema();
        let config: ReportConfig<VulnerabilitiesFilters> = decode_config(
            &schema,
            &json!({
                "name": "vulns",
                "resources": [{"builds": [{"names": ["build1"]}]}],
                "filters": [{"severities": ["Critical"]}]
            }),
        )
        .unwrap();

        let body = serde_json::to_value(config.unpack()).unwrap();
        assert_eq!(
            body["resources"]["builds"],
            json!({"names": ["build1"], "number_of_latest_versions": 1})
        );
    }

    #[test]
    fn test_generic_config_and_request_deserialize() {
        let config: ReportConfig<ViolationsFilters> =
            serde_json::from_value(json!({"name": "pending", "report_id": 3})).unwrap();
        assert!(config.filters.is_empty());
        assert!(config.resources.is_empty());
        assert_eq!(config.report_id, Some(3));

        let request: ReportRequest<filters::ViolationsFiltersPayload> =
            serde_json::from_value(json!({
                "name": "violations",
                "filters": {"type": "security", "security_filters": {"issue_id": "XRAY-87343"}}
            }))
            .unwrap();
        assert_eq!(request.project_key, None);
        assert!(request.resources.is_none());
        assert_eq!(
            ViolationsFilters::pack(request.filters.as_ref().unwrap()).security_filters[0]
                .issue_id
                .as_deref(),
            Some("XRAY-87343")
        );
    }

    #[test]
    fn test_pack_inverts_unpack() {
        let schema = ReportResource::<Licenses>::new().schema();
        let config: ReportConfig<LicensesFilters> =
            decode_config(&schema, &licenses_config()).unwrap();
        assert_eq!(ReportConfig::pack(&config.unpack()), config);
    }

    #[test]
    fn test_refresh_keeps_configuration() {
        let details: ReportDetails = serde_json::from_value(json!({
            "id": 42,
            "name": "terraform-licenses-report",
            "report_type": "license",
            "status": "completed",
            "total_artifacts": 3
        }))
        .unwrap();

        let mut state = licenses_config();
        details.refresh(&mut state);
        assert_eq!(state["report_id"], 42);
        assert_eq!(state["status"], "completed");
        assert_eq!(state["filters"][0]["license_names"], json!(["Apache", "MIT"]));
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(Licenses::ENDPOINT, "licenses");
        assert_eq!(OperationalRisks::ENDPOINT, "operationalRisks");
        assert_eq!(Violations::ENDPOINT, "violations");
        assert_eq!(Vulnerabilities::ENDPOINT, "vulnerabilities");
    }
}
