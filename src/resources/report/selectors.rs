//! The `resources` block shared by every report type: which repositories,
//! builds, release bundles or projects a report covers.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::resources::{block, first, WireMapping};
use crate::schema::{Attribute, Block, Constraint, ExclusiveGroup, NestedBlock};

/// Versions scanned per build, bundle or project when not configured.
pub const DEFAULT_NUMBER_OF_LATEST_VERSIONS: i64 = 1;

/// What a report covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResources {
    /// Repositories, by name and path patterns.
    #[serde(default)]
    pub repository: Vec<RepositorySelector>,
    /// Builds, at most one item.
    #[serde(default)]
    pub builds: Vec<NamedSelector>,
    /// Release bundles, at most one item.
    #[serde(default)]
    pub release_bundles: Vec<NamedSelector>,
    /// Projects, at most one item.
    #[serde(default)]
    pub projects: Vec<ProjectsSelector>,
}

/// Payload form of [`ReportResources`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcesPayload {
    /// Repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<RepositorySelector>>,
    /// Builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builds: Option<NamedSelector>,
    /// Release bundles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_bundles: Option<NamedSelector>,
    /// Projects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<ProjectsSelector>,
}

/// One repository and the paths inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySelector {
    /// Repository name.
    pub name: String,
    /// Paths to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_path_patterns: Option<Vec<String>>,
    /// Paths to exclude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_path_patterns: Option<Vec<String>>,
}

/// Builds or release bundles, either by name or by pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSelector {
    /// Exact names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    /// Name patterns to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_patterns: Option<Vec<String>>,
    /// Name patterns to exclude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<Vec<String>>,
    /// Latest versions to include per name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_latest_versions: Option<i64>,
}

/// Projects, either by key or by key pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectsSelector {
    /// Project keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    /// Project key patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_key_patterns: Option<Vec<String>>,
    /// Latest versions to include per project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_latest_versions: Option<i64>,
}

impl WireMapping for ReportResources {
    type Wire = ResourcesPayload;

    fn unpack(&self) -> ResourcesPayload {
        ResourcesPayload {
            repositories: (!self.repository.is_empty()).then(|| self.repository.clone()),
            builds: first(&self.builds),
            release_bundles: first(&self.release_bundles),
            projects: first(&self.projects),
        }
    }

    fn pack(wire: &ResourcesPayload) -> Self {
        Self {
            repository: wire.repositories.clone().unwrap_or_default(),
            builds: block(wire.builds.as_ref()),
            release_bundles: block(wire.release_bundles.as_ref()),
            projects: block(wire.projects.as_ref()),
        }
    }
}

impl WireMapping for NamedSelector {
    type Wire = NamedSelector;

    fn unpack(&self) -> NamedSelector {
        self.clone()
    }

    fn pack(wire: &NamedSelector) -> Self {
        wire.clone()
    }
}

impl WireMapping for ProjectsSelector {
    type Wire = ProjectsSelector;

    fn unpack(&self) -> ProjectsSelector {
        self.clone()
    }

    fn pack(wire: &ProjectsSelector) -> Self {
        wire.clone()
    }
}

fn string_list(description: &str) -> Attribute {
    Attribute::optional_string_list()
        .with_constraint(Constraint::NotEmpty)
        .with_description(description)
}

fn number_of_latest_versions() -> Attribute {
    Attribute::optional_int64()
        .with_default(json!(DEFAULT_NUMBER_OF_LATEST_VERSIONS))
        .with_constraint(Constraint::AtLeast(0))
        .with_description("Number of latest versions to include.")
}

fn named_selector(kind: &str) -> Block {
    Block::new()
        .with_attribute("names", string_list(&format!("{} names.", kind)))
        .with_attribute(
            "include_patterns",
            string_list(&format!("{} name patterns to include.", kind)),
        )
        .with_attribute(
            "exclude_patterns",
            string_list(&format!("{} name patterns to exclude.", kind)),
        )
        .with_attribute("number_of_latest_versions", number_of_latest_versions())
        .with_exclusive_group(
            ExclusiveGroup::of(&["names"]).with_member(&["include_patterns", "exclude_patterns"]),
        )
}

/// Schema of the `resources` block.
pub fn resources_block() -> Block {
    let repository = Block::new()
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_constraint(Constraint::NotEmpty)
                .with_description("Repository name."),
        )
        .with_attribute(
            "include_path_patterns",
            string_list("Path patterns to include."),
        )
        .with_attribute(
            "exclude_path_patterns",
            string_list("Path patterns to exclude."),
        );

    let projects = Block::new()
        .with_attribute("names", string_list("Project keys."))
        .with_attribute(
            "include_key_patterns",
            string_list("Project key patterns to include."),
        )
        .with_attribute("number_of_latest_versions", number_of_latest_versions())
        .with_exclusive_group(ExclusiveGroup::of(&["names", "include_key_patterns"]));

    Block::new()
        .with_description("Artifacts the report covers.")
        .with_block("repository", NestedBlock::set(repository))
        .with_block("builds", NestedBlock::single(named_selector("Build")))
        .with_block(
            "release_bundles",
            NestedBlock::single(named_selector("Release bundle")),
        )
        .with_block("projects", NestedBlock::single(projects))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::validation::validate;

    fn schema() -> Schema {
        Schema {
            version: 0,
            block: resources_block(),
        }
    }

    #[test]
    fn test_builds_by_names_or_patterns() {
        let by_names = json!({"builds": [{"names": ["build1", "build2"], "number_of_latest_versions": 2}]});
        let by_patterns = json!({"builds": [{
            "include_patterns": ["pattern1", "pattern12"],
            "exclude_patterns": ["pattern1", "pattern12"]
        }]});

        assert!(validate(&schema(), &by_names).is_empty());
        assert!(validate(&schema(), &by_patterns).is_empty());
    }

    #[test]
    fn test_names_and_patterns_conflict() {
        for selector in ["builds", "release_bundles"] {
            let value = json!({ selector: [{
                "names": ["a"],
                "include_patterns": ["p1"],
                "exclude_patterns": ["p2"]
            }]});
            let diagnostics = validate(&schema(), &value);
            assert_eq!(diagnostics.len(), 1, "{}", selector);
            assert_eq!(
                diagnostics[0].summary,
                "Only one of names, include_patterns/exclude_patterns can be set"
            );
            assert_eq!(diagnostics[0].attribute, Some(format!("{}.0", selector)));
        }
    }

    #[test]
    fn test_projects_conflict() {
        let diagnostics = validate(
            &schema(),
            &json!({"projects": [{"names": ["p1"], "include_key_patterns": ["inc*"]}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("names, include_key_patterns"));
    }

    #[test]
    fn test_repository_requires_name() {
        let diagnostics = validate(
            &schema(),
            &json!({"repository": [{"include_path_patterns": ["a/**"]}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("repository.0.name"));
    }

    #[test]
    fn test_unpack_omits_unset_selectors() {
        let resources = ReportResources {
            repository: vec![RepositorySelector {
                name: "repository-name".to_string(),
                include_path_patterns: Some(vec!["pattern1".to_string()]),
                exclude_path_patterns: None,
            }],
            builds: vec![],
            release_bundles: vec![],
            projects: vec![],
        };

        let body = serde_json::to_value(resources.unpack()).unwrap();
        assert_eq!(
            body,
            json!({"repositories": [{"name": "repository-name", "include_path_patterns": ["pattern1"]}]})
        );
    }

    #[test]
    fn test_defaults_fill_latest_versions() {
        let mut value = json!({"projects": [{"include_key_patterns": ["inc*"]}]});
        schema().apply_defaults(&mut value);
        assert_eq!(value["projects"][0]["number_of_latest_versions"], 1);
    }
}
