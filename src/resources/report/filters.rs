//! The `filters` block of each report type.
//!
//! Each report type narrows its rows differently. Several filter fields are
//! alternatives of each other (names or patterns, CVE or issue id, severities
//! or CVSS range); those are declared as exclusive groups on the block.

use serde::{Deserialize, Serialize};

use crate::resources::{block, first, WireMapping};
use crate::schema::{Attribute, Block, Constraint, ExclusiveGroup, NestedBlock};

/// Accepted severities.
pub const SEVERITIES: [&str; 4] = ["Low", "Medium", "High", "Critical"];

/// Accepted operational risk levels.
pub const RISKS: [&str; 4] = ["None", "Low", "Medium", "High"];

/// Accepted violation types.
pub const VIOLATION_TYPES: [&str; 3] = ["security", "license", "operational_risk"];

// ---------------------------------------------------------------------------
// Shared leaves
// ---------------------------------------------------------------------------

/// A time window given as RFC 3339 timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    /// Window start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Window end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// A CVSS score window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvssScore {
    /// Lowest score included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    /// Highest score included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
}

impl WireMapping for DateRange {
    type Wire = DateRange;

    fn unpack(&self) -> DateRange {
        self.clone()
    }

    fn pack(wire: &DateRange) -> Self {
        wire.clone()
    }
}

impl WireMapping for CvssScore {
    type Wire = CvssScore;

    fn unpack(&self) -> CvssScore {
        self.clone()
    }

    fn pack(wire: &CvssScore) -> Self {
        wire.clone()
    }
}

fn date_range(description: &str) -> NestedBlock {
    let timestamp = |what: &str| {
        Attribute::optional_string()
            .with_constraint(Constraint::Rfc3339)
            .with_description(format!("{} of the window, RFC 3339.", what))
    };

    NestedBlock::single(
        Block::new()
            .with_description(description)
            .with_attribute("start", timestamp("Start"))
            .with_attribute("end", timestamp("End")),
    )
}

fn cvss_score() -> NestedBlock {
    let score = |what: &str| {
        Attribute::optional_float64()
            .with_constraint(Constraint::Between(0.0, 10.0))
            .with_description(format!("{} CVSS score.", what))
    };

    NestedBlock::single(
        Block::new()
            .with_description("CVSS score range.")
            .with_attribute("min_score", score("Minimum"))
            .with_attribute("max_score", score("Maximum")),
    )
}

fn string(description: &str) -> Attribute {
    Attribute::optional_string().with_description(description)
}

fn string_list(description: &str) -> Attribute {
    Attribute::optional_string_list()
        .with_constraint(Constraint::NotEmpty)
        .with_description(description)
}

fn enum_list(values: &[&str], description: &str) -> Attribute {
    Attribute::optional_string_list()
        .with_constraint(Constraint::one_of(values))
        .with_description(description)
}

fn flag(description: &str) -> Attribute {
    Attribute::optional_bool().with_description(description)
}

// ---------------------------------------------------------------------------
// Licenses
// ---------------------------------------------------------------------------

/// Filters of a licenses report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct LicensesFilters {
    pub component: Option<String>,
    pub artifact: Option<String>,
    pub unknown: Option<bool>,
    pub unrecognized: Option<bool>,
    pub license_names: Option<Vec<String>>,
    pub license_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub scan_date: Vec<DateRange>,
}

/// Payload form of [`LicensesFilters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct LicensesFiltersPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrecognized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_date: Option<DateRange>,
}

impl LicensesFilters {
    /// Schema of the block.
    pub fn block() -> Block {
        Block::new()
            .with_description("Licenses report filters.")
            .with_attribute("component", string("Artifact's component."))
            .with_attribute("artifact", string("Artifact name."))
            .with_attribute("unknown", flag("Include unknown licenses."))
            .with_attribute("unrecognized", flag("Include unrecognized licenses."))
            .with_attribute("license_names", string_list("License names."))
            .with_attribute("license_patterns", string_list("License name patterns."))
            .with_block("scan_date", date_range("Scan date window."))
            .with_exclusive_group(ExclusiveGroup::of(&["license_names", "license_patterns"]))
    }
}

impl WireMapping for LicensesFilters {
    type Wire = LicensesFiltersPayload;

    fn unpack(&self) -> LicensesFiltersPayload {
        LicensesFiltersPayload {
            component: self.component.clone(),
            artifact: self.artifact.clone(),
            unknown: self.unknown,
            unrecognized: self.unrecognized,
            license_names: self.license_names.clone(),
            license_patterns: self.license_patterns.clone(),
            scan_date: first(&self.scan_date),
        }
    }

    fn pack(wire: &LicensesFiltersPayload) -> Self {
        Self {
            component: wire.component.clone(),
            artifact: wire.artifact.clone(),
            unknown: wire.unknown,
            unrecognized: wire.unrecognized,
            license_names: wire.license_names.clone(),
            license_patterns: wire.license_patterns.clone(),
            scan_date: block(wire.scan_date.as_ref()),
        }
    }
}

// ---------------------------------------------------------------------------
// Operational risks
// ---------------------------------------------------------------------------

/// Filters of an operational risks report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct OperationalRisksFilters {
    pub component: Option<String>,
    pub artifact: Option<String>,
    pub risks: Option<Vec<String>>,
    #[serde(default)]
    pub scan_date: Vec<DateRange>,
}

/// Payload form of [`OperationalRisksFilters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct OperationalRisksFiltersPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_date: Option<DateRange>,
}

impl OperationalRisksFilters {
    /// Schema of the block.
    pub fn block() -> Block {
        Block::new()
            .with_description("Operational risks report filters.")
            .with_attribute("component", string("Artifact's component."))
            .with_attribute("artifact", string("Artifact name."))
            .with_attribute("risks", enum_list(&RISKS, "Operational risk levels."))
            .with_block("scan_date", date_range("Scan date window."))
    }
}

impl WireMapping for OperationalRisksFilters {
    type Wire = OperationalRisksFiltersPayload;

    fn unpack(&self) -> OperationalRisksFiltersPayload {
        OperationalRisksFiltersPayload {
            component: self.component.clone(),
            artifact: self.artifact.clone(),
            risks: self.risks.clone(),
            scan_date: first(&self.scan_date),
        }
    }

    fn pack(wire: &OperationalRisksFiltersPayload) -> Self {
        Self {
            component: wire.component.clone(),
            artifact: wire.artifact.clone(),
            risks: wire.risks.clone(),
            scan_date: block(wire.scan_date.as_ref()),
        }
    }
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// Filters of a violations report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ViolationsFilters {
    #[serde(rename = "type")]
    pub violation_type: Option<String>,
    pub watch_names: Option<Vec<String>>,
    pub watch_patterns: Option<Vec<String>>,
    pub component: Option<String>,
    pub artifact: Option<String>,
    pub policy_names: Option<Vec<String>>,
    pub severities: Option<Vec<String>>,
    #[serde(default)]
    pub updated: Vec<DateRange>,
    #[serde(default)]
    pub security_filters: Vec<SecurityFilters>,
    #[serde(default)]
    pub license_filters: Vec<LicenseFilters>,
}

/// Payload form of [`ViolationsFilters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ViolationsFiltersPayload {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub violation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_filters: Option<SecurityFiltersPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_filters: Option<LicenseFilters>,
}

/// Security violation filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct SecurityFilters {
    pub cve: Option<String>,
    pub issue_id: Option<String>,
    #[serde(default)]
    pub cvss_score: Vec<CvssScore>,
    pub summary_contains: Option<String>,
    pub has_remediation: Option<bool>,
}

/// Payload form of [`SecurityFilters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct SecurityFiltersPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss_score: Option<CvssScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_remediation: Option<bool>,
}

/// License violation filters. Same shape in configuration and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct LicenseFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrecognized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_patterns: Option<Vec<String>>,
}

impl ViolationsFilters {
    /// Schema of the block.
    pub fn block() -> Block {
        let security = Block::new()
            .with_description("Security violation filters.")
            .with_attribute("cve", string("CVE identifier."))
            .with_attribute("issue_id", string("Xray issue id."))
            .with_block("cvss_score", cvss_score())
            .with_attribute("summary_contains", string("Text the issue summary contains."))
            .with_attribute("has_remediation", flag("Only issues with a remediation."))
            .with_exclusive_group(ExclusiveGroup::of(&["cve", "issue_id"]))
            .with_exclusive_group(ExclusiveGroup::of(&["cve", "cvss_score"]));

        let license = Block::new()
            .with_description("License violation filters.")
            .with_attribute("unknown", flag("Include unknown licenses."))
            .with_attribute("unrecognized", flag("Include unrecognized licenses."))
            .with_attribute("license_names", string_list("License names."))
            .with_attribute("license_patterns", string_list("License name patterns."))
            .with_exclusive_group(ExclusiveGroup::of(&["license_names", "license_patterns"]));

        Block::new()
            .with_description("Violations report filters.")
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_constraint(Constraint::one_of(&VIOLATION_TYPES))
                    .with_description("Violation type."),
            )
            .with_attribute("watch_names", string_list("Watch names."))
            .with_attribute("watch_patterns", string_list("Watch name patterns."))
            .with_attribute("component", string("Impacted component."))
            .with_attribute("artifact", string("Impacted artifact."))
            .with_attribute("policy_names", string_list("Policy names."))
            .with_attribute("severities", enum_list(&SEVERITIES, "Severities."))
            .with_block("updated", date_range("Last update window."))
            .with_block("security_filters", NestedBlock::single(security))
            .with_block("license_filters", NestedBlock::single(license))
            .with_exclusive_group(ExclusiveGroup::of(&["watch_names", "watch_patterns"]))
    }
}

impl WireMapping for ViolationsFilters {
    type Wire = ViolationsFiltersPayload;

    fn unpack(&self) -> ViolationsFiltersPayload {
        ViolationsFiltersPayload {
            violation_type: self.violation_type.clone(),
            watch_names: self.watch_names.clone(),
            watch_patterns: self.watch_patterns.clone(),
            component: self.component.clone(),
            artifact: self.artifact.clone(),
            policy_names: self.policy_names.clone(),
            severities: self.severities.clone(),
            updated: first(&self.updated),
            security_filters: first(&self.security_filters),
            license_filters: first(&self.license_filters),
        }
    }

    fn pack(wire: &ViolationsFiltersPayload) -> Self {
        Self {
            violation_type: wire.violation_type.clone(),
            watch_names: wire.watch_names.clone(),
            watch_patterns: wire.watch_patterns.clone(),
            component: wire.component.clone(),
            artifact: wire.artifact.clone(),
            policy_names: wire.policy_names.clone(),
            severities: wire.severities.clone(),
            updated: block(wire.updated.as_ref()),
            security_filters: block(wire.security_filters.as_ref()),
            license_filters: block(wire.license_filters.as_ref()),
        }
    }
}

impl WireMapping for SecurityFilters {
    type Wire = SecurityFiltersPayload;

    fn unpack(&self) -> SecurityFiltersPayload {
        SecurityFiltersPayload {
            cve: self.cve.clone(),
            issue_id: self.issue_id.clone(),
            cvss_score: first(&self.cvss_score),
            summary_contains: self.summary_contains.clone(),
            has_remediation: self.has_remediation,
        }
    }

    fn pack(wire: &SecurityFiltersPayload) -> Self {
        Self {
            cve: wire.cve.clone(),
            issue_id: wire.issue_id.clone(),
            cvss_score: block(wire.cvss_score.as_ref()),
            summary_contains: wire.summary_contains.clone(),
            has_remediation: wire.has_remediation,
        }
    }
}

impl WireMapping for LicenseFilters {
    type Wire = LicenseFilters;

    fn unpack(&self) -> LicenseFilters {
        self.clone()
    }

    fn pack(wire: &LicenseFilters) -> Self {
        wire.clone()
    }
}

// ---------------------------------------------------------------------------
// Vulnerabilities
// ---------------------------------------------------------------------------

/// Filters of a vulnerabilities report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct VulnerabilitiesFilters {
    pub vulnerable_component: Option<String>,
    pub impacted_artifact: Option<String>,
    pub has_remediation: Option<bool>,
    pub cve: Option<String>,
    pub issue_id: Option<String>,
    pub severities: Option<Vec<String>>,
    #[serde(default)]
    pub cvss_score: Vec<CvssScore>,
    #[serde(default)]
    pub published: Vec<DateRange>,
    #[serde(default)]
    pub scan_date: Vec<DateRange>,
}

/// Payload form of [`VulnerabilitiesFilters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct VulnerabilitiesFiltersPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerable_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impacted_artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_remediation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss_score: Option<CvssScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_date: Option<DateRange>,
}

impl VulnerabilitiesFilters {
    /// Schema of the block.
    pub fn block() -> Block {
        Block::new()
            .with_description("Vulnerabilities report filters.")
            .with_attribute("vulnerable_component", string("Vulnerable component."))
            .with_attribute("impacted_artifact", string("Impacted artifact."))
            .with_attribute("has_remediation", flag("Only vulnerabilities with a remediation."))
            .with_attribute("cve", string("CVE identifier."))
            .with_attribute("issue_id", string("Xray issue id."))
            .with_attribute("severities", enum_list(&SEVERITIES, "Severities."))
            .with_block("cvss_score", cvss_score())
            .with_block("published", date_range("Publication window."))
            .with_block("scan_date", date_range("Scan date window."))
            .with_exclusive_group(ExclusiveGroup::of(&["cve", "issue_id"]))
            .with_exclusive_group(ExclusiveGroup::of(&["severities", "cvss_score"]))
    }
}

impl WireMapping for VulnerabilitiesFilters {
    type Wire = VulnerabilitiesFiltersPayload;

    fn unpack(&self) -> VulnerabilitiesFiltersPayload {
        VulnerabilitiesFiltersPayload {
            vulnerable_component: self.vulnerable_component.clone(),
            impacted_artifact: self.impacted_artifact.clone(),
            has_remediation: self.has_remediation,
            cve: self.cve.clone(),
            issue_id: self.issue_id.clone(),
            severities: self.severities.clone(),
            cvss_score: first(&self.cvss_score),
            published: first(&self.published),
            scan_date: first(&self.scan_date),
        }
    }

    fn pack(wire: &VulnerabilitiesFiltersPayload) -> Self {
        Self {
            vulnerable_component: wire.vulnerable_component.clone(),
            impacted_artifact: wire.impacted_artifact.clone(),
            has_remediation: wire.has_remediation,
            cve: wire.cve.clone(),
            issue_id: wire.issue_id.clone(),
            severities: wire.severities.clone(),
            cvss_score: block(wire.cvss_score.as_ref()),
            published: block(wire.published.as_ref()),
            scan_date: block(wire.scan_date.as_ref()),
        }
    }
}
