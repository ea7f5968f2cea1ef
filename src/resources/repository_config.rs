//! `xray_repository_config`: indexing and retention settings of one repository.
//!
//! A repository is configured either with a flat `config` block or with
//! `paths_config`, a list of path patterns plus a catch-all rule. The two
//! forms are mutually exclusive. The repository name is the identifier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{
    block, decode_config, first, forget_on_api_error, require_id, Resource, WireMapping,
};
use crate::client::XrayClient;
use crate::error::ProviderError;
use crate::schema::{
    Attribute, Block, Constraint, Diagnostic, ExclusiveGroup, NestedBlock, Schema,
};
use crate::types::ResourceData;

/// Resource type name.
pub const TYPE_NAME: &str = "xray_repository_config";

/// Retention applied when a block leaves `retention_in_days` out.
pub const DEFAULT_RETENTION_IN_DAYS: i64 = 90;

const REPOS_CONFIG_PATH: [&str; 4] = ["xray", "api", "v1", "repos_config"];

// ---------------------------------------------------------------------------
// Configuration tree
// ---------------------------------------------------------------------------

/// Configuration of one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository name.
    pub repo_name: String,
    /// Flat configuration, at most one item.
    #[serde(default)]
    pub config: Vec<GeneralConfig>,
    /// Path based configuration, at most one item.
    #[serde(default)]
    pub paths_config: Vec<PathsConfig>,
}

/// Repository wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enables vulnerability contextual analysis (SaaS only).
    pub vuln_contextual_analysis: Option<bool>,
    /// Days to keep scan data after an artifact is scanned.
    pub retention_in_days: Option<i64>,
}

/// Path specific settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Pattern rules, applied in order.
    #[serde(default)]
    pub pattern: Vec<Pattern>,
    /// Rule for everything no pattern matched, exactly one item.
    #[serde(default)]
    pub all_other_artifacts: Vec<OtherArtifacts>,
}

/// One path rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Include glob.
    pub include: String,
    /// Exclude glob.
    pub exclude: Option<String>,
    /// Scan artifacts added under the path from now on.
    pub index_new_artifacts: Option<bool>,
    /// Days to keep scan data.
    pub retention_in_days: Option<i64>,
}

/// Catch-all rule for artifacts outside every pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherArtifacts {
    /// Scan newly added artifacts.
    pub index_new_artifacts: Option<bool>,
    /// Days to keep scan data.
    pub retention_in_days: Option<i64>,
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Body of `PUT xray/api/v1/repos_config` and answer of the matching GET.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfiguration {
    /// Repository name.
    pub repo_name: String,
    /// Flat configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_config: Option<RepoConfiguration>,
    /// Path based configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_paths_config: Option<PathsConfiguration>,
}

/// Payload form of [`GeneralConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfiguration {
    /// Not supported by self-hosted installations, so never sent when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vuln_contextual_analysis: Option<bool>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i64>,
}

/// Payload form of [`PathsConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfiguration {
    #[allow(missing_docs)]
    #[serde(default)]
    pub patterns: Vec<PathPattern>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_other_artifacts: Option<AllOtherArtifacts>,
}

/// Payload form of [`Pattern`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct PathPattern {
    pub include: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_new_artifacts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i64>,
}

/// Payload form of [`OtherArtifacts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AllOtherArtifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_new_artifacts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i64>,
}

impl WireMapping for RepositoryConfig {
    type Wire = RepositoryConfiguration;

    fn unpack(&self) -> RepositoryConfiguration {
        RepositoryConfiguration {
            repo_name: self.repo_name.clone(),
            repo_config: first(&self.config),
            repo_paths_config: first(&self.paths_config),
        }
    }

    fn pack(wire: &RepositoryConfiguration) -> Self {
        Self {
            repo_name: wire.repo_name.clone(),
            config: block(wire.repo_config.as_ref()),
            paths_config: block(wire.repo_paths_config.as_ref()),
        }
    }
}

impl WireMapping for GeneralConfig {
    type Wire = RepoConfiguration;

    fn unpack(&self) -> RepoConfiguration {
        RepoConfiguration {
            vuln_contextual_analysis: self.vuln_contextual_analysis,
            retention_in_days: self.retention_in_days,
        }
    }

    fn pack(wire: &RepoConfiguration) -> Self {
        Self {
            vuln_contextual_analysis: wire.vuln_contextual_analysis,
            retention_in_days: wire.retention_in_days,
        }
    }
}

impl WireMapping for PathsConfig {
    type Wire = PathsConfiguration;

    fn unpack(&self) -> PathsConfiguration {
        PathsConfiguration {
            patterns: self.pattern.iter().map(Pattern::unpack).collect(),
            all_other_artifacts: first(&self.all_other_artifacts),
        }
    }

    fn pack(wire: &PathsConfiguration) -> Self {
        Self {
            pattern: wire.patterns.iter().map(Pattern::pack).collect(),
            all_other_artifacts: block(wire.all_other_artifacts.as_ref()),
        }
    }
}

impl WireMapping for Pattern {
    type Wire = PathPattern;

    fn unpack(&self) -> PathPattern {
        PathPattern {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            index_new_artifacts: self.index_new_artifacts,
            retention_in_days: self.retention_in_days,
        }
    }

    fn pack(wire: &PathPattern) -> Self {
        Self {
            include: wire.include.clone(),
            exclude: wire.exclude.clone(),
            index_new_artifacts: wire.index_new_artifacts,
            retention_in_days: wire.retention_in_days,
        }
    }
}

impl WireMapping for OtherArtifacts {
    type Wire = AllOtherArtifacts;

    fn unpack(&self) -> AllOtherArtifacts {
        AllOtherArtifacts {
            index_new_artifacts: self.index_new_artifacts,
            retention_in_days: self.retention_in_days,
        }
    }

    fn pack(wire: &AllOtherArtifacts) -> Self {
        Self {
            index_new_artifacts: wire.index_new_artifacts,
            retention_in_days: wire.retention_in_days,
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn retention_in_days() -> Attribute {
    Attribute::optional_int64()
        .with_default(json!(DEFAULT_RETENTION_IN_DAYS))
        .with_constraint(Constraint::AtLeast(0))
        .with_description("Days the scan data of an artifact is retained after it is scanned.")
}

fn index_new_artifacts() -> Attribute {
    Attribute::optional_bool()
        .with_default(json!(true))
        .with_description("Scan artifacts newly added under the path. Existing artifacts are not rescanned.")
}

/// Schema of `xray_repository_config`.
pub fn schema() -> Schema {
    let general = Block::new()
        .with_description("Single repository configuration. Only one of 'config' or 'paths_config' can be set.")
        .with_attribute(
            "vuln_contextual_analysis",
            Attribute::optional_bool()
                .with_description("Enables vulnerability contextual analysis. Only for SaaS instances."),
        )
        .with_attribute("retention_in_days", retention_in_days());

    let pattern = Block::new()
        .with_attribute(
            "include",
            Attribute::required_string()
                .with_constraint(Constraint::NotEmpty)
                .with_description("Include pattern."),
        )
        .with_attribute(
            "exclude",
            Attribute::optional_string()
                .with_constraint(Constraint::NotEmpty)
                .with_description("Exclude pattern."),
        )
        .with_attribute("index_new_artifacts", index_new_artifacts())
        .with_attribute("retention_in_days", retention_in_days());

    let other_artifacts = Block::new()
        .with_description("Retention for all artifacts not matched by a pattern.")
        .with_attribute("index_new_artifacts", index_new_artifacts())
        .with_attribute("retention_in_days", retention_in_days());

    let paths = Block::new()
        .with_description("Path pattern specific retention and indexing.")
        .with_block("pattern", NestedBlock::list(pattern).with_min_items(1))
        .with_block(
            "all_other_artifacts",
            NestedBlock::single(other_artifacts).with_min_items(1),
        );

    Schema::v0()
        .with_description("Xray indexing and retention configuration of a repository.")
        .with_attribute(
            "repo_name",
            Attribute::required_string()
                .with_constraint(Constraint::NotEmpty)
                .with_description("Repository name."),
        )
        .with_block("config", NestedBlock::single(general))
        .with_block("paths_config", NestedBlock::single(paths))
        .with_exclusive_group(ExclusiveGroup::of(&["config", "paths_config"]))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Fetch the current configuration of a repository.
pub async fn get_repository_config(
    client: &XrayClient,
    repo_name: &str,
) -> Result<RepositoryConfiguration, ProviderError> {
    let url = client.endpoint(&["xray", "api", "v1", "repos_config", repo_name], &[])?;
    client.get(url, client.read_retry()).await
}

/// The `xray_repository_config` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryConfigResource;

#[async_trait]
impl Resource for RepositoryConfigResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(
        &self,
        client: &XrayClient,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let config: RepositoryConfig = decode_config(&self.schema(), data.state())?;
        let payload = config.unpack();

        let url = client.endpoint(&REPOS_CONFIG_PATH, &[])?;
        client.put(url, &payload).await?;
        info!(repo_name = %payload.repo_name, "repository configuration applied");

        data.set_id(payload.repo_name);
        self.read(client, data).await
    }

    async fn read(
        &self,
        client: &XrayClient,
        data: &mut ResourceData,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let repo_name = require_id(data, TYPE_NAME)?;

        match get_repository_config(client, &repo_name).await {
            Ok(wire) => {
                debug!(repo_name = %repo_name, "repository configuration read");
                data.set_state(serde_json::to_value(RepositoryConfig::pack(&wire))?);
                Ok(vec![])
            },
            Err(err) => {
                forget_on_api_error(data, &err, TYPE_NAME);
                Err(err)
            },
        }
    }

    async fn import(&self, client: &XrayClient, id: &str) -> Result<ResourceData, ProviderError> {
        let mut data = ResourceData::with_id(id, json!({ "repo_name": id }));
        self.read(client, &mut data).await?;
        Ok(data)
    }
}
