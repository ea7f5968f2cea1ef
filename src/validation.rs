//! Schema validation helpers.
//!
//! This module validates a configuration tree (`serde_json::Value`) against a
//! [`Schema`] before anything is transformed or sent over the network.
//! Besides types, required fields and block item counts it enforces value
//! constraints and exclusive groups.
//!
//! Exclusivity is decided by presence, not by value: a field counts as
//! supplied when its key is present and not `null`. A supplied empty list is
//! still supplied. A nested block with zero items is not.
//!
//! # Example
//!
//! ```
//! use xray_provider::schema::{Attribute, ExclusiveGroup, Schema};
//! use xray_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("license_names", Attribute::optional_string_list())
//!     .with_attribute("license_patterns", Attribute::optional_string_list())
//!     .with_exclusive_group(ExclusiveGroup::of(&["license_names", "license_patterns"]));
//!
//! assert!(validate(&schema, &json!({"license_names": ["MIT"]})).is_empty());
//!
//! let diagnostics = validate(
//!     &schema,
//!     &json!({"license_names": ["MIT"], "license_patterns": ["*Apache*"]}),
//! );
//! assert_eq!(diagnostics.len(), 1);
//! assert!(diagnostics[0].summary.starts_with("Only one of"));
//! ```

use crate::schema::{
    Attribute, AttributeType, Block, Constraint, Diagnostic, DiagnosticSeverity, ExclusiveGroup,
    NestedBlock, Schema,
};
use serde_json::{Map, Value};

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }

    for group in &block.exclusive_groups {
        validate_exclusive_group(block, group, obj, path, diagnostics);
    }
}

fn validate_exclusive_group(
    block: &Block,
    group: &ExclusiveGroup,
    obj: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let supplied: Vec<String> = group
        .members
        .iter()
        .filter(|member| member.0.iter().any(|field| is_supplied(block, obj, field)))
        .map(ToString::to_string)
        .collect();

    if supplied.len() > 1 {
        diagnostics.push(
            Diagnostic::error(format!(
                "Only one of {} can be set",
                group.member_names()
            ))
            .with_detail(format!("Conflicting fields supplied: {}", supplied.join(", ")))
            .with_attribute_if_not_empty(path),
        );
    }
}

/// Whether `field` was explicitly supplied in `obj`.
fn is_supplied(block: &Block, obj: &Map<String, Value>, field: &str) -> bool {
    match obj.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) if block.blocks.contains_key(field) => !items.is_empty(),
        Some(_) => true,
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes are set by the provider
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                for constraint in &attr.constraints {
                    validate_constraint(constraint, v, path, diagnostics);
                }
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
    }
}

fn validate_constraint(
    constraint: &Constraint,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match constraint {
        Constraint::NotEmpty => {
            for (elem_path, s) in string_values(value, path) {
                if s.is_empty() {
                    diagnostics.push(
                        Diagnostic::error(format!("Attribute '{}' must not be empty", elem_path))
                            .with_attribute(elem_path),
                    );
                }
            }
        },
        Constraint::AtLeast(min) => {
            if let Some(n) = value.as_f64() {
                if n < *min as f64 {
                    diagnostics.push(
                        Diagnostic::error(format!("Attribute '{}' is out of range", path))
                            .with_detail(format!("Expected at least {}, got {}", min, value))
                            .with_attribute(path),
                    );
                }
            }
        },
        Constraint::Between(min, max) => {
            if let Some(n) = value.as_f64() {
                if n < *min || n > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Attribute '{}' is out of range", path))
                            .with_detail(format!(
                                "Expected a value between {} and {}, got {}",
                                min, max, value
                            ))
                            .with_attribute(path),
                    );
                }
            }
        },
        Constraint::OneOf(allowed) => {
            for (elem_path, s) in string_values(value, path) {
                if !allowed.iter().any(|a| a == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", elem_path))
                            .with_detail(format!(
                                "Expected one of [{}], got \"{}\"",
                                allowed.join(", "),
                                s
                            ))
                            .with_attribute(elem_path),
                    );
                }
            }
        },
        Constraint::Rfc3339 => {
            for (elem_path, s) in string_values(value, path) {
                if chrono::DateTime::parse_from_rfc3339(s).is_err() {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid timestamp for attribute '{}'", elem_path))
                            .with_detail(format!("\"{}\" is not an RFC 3339 timestamp", s))
                            .with_attribute(elem_path),
                    );
                }
            }
        },
    }
}

/// String values with their paths: the value itself, or every list element.
fn string_values<'a>(value: &'a Value, path: &str) -> Vec<(String, &'a str)> {
    match value {
        Value::String(s) => vec![(path.to_string(), s.as_str())],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_str().map(|s| (format!("{}.{}", path, i), s)))
            .collect(),
        _ => Vec::new(),
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        },
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        },
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.as_i64().is_some()
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    fn license_filters() -> Schema {
        Schema::v0()
            .with_attribute("license_names", Attribute::optional_string_list())
            .with_attribute("license_patterns", Attribute::optional_string_list())
            .with_attribute("unknown", Attribute::optional_bool())
            .with_exclusive_group(ExclusiveGroup::of(&["license_names", "license_patterns"]))
    }

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("status", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"status": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute(
            "count",
            Attribute::new(AttributeType::Int64, AttributeFlags::required()),
        );

        assert!(validate(&schema, &json!({"count": 42})).is_empty());
        assert!(validate(&schema, &json!({"count": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"count": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"count": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_list_element_types() {
        let schema = Schema::v0().with_attribute("names", Attribute::optional_string_list());

        assert!(validate(&schema, &json!({"names": ["a", "b"]})).is_empty());
        assert!(validate(&schema, &json!({"names": []})).is_empty());

        let diagnostics = validate(&schema, &json!({"names": ["a", 123]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("names.1".to_string()));

        assert_eq!(validate(&schema, &json!({"names": "a"})).len(), 1);
    }

    #[test]
    fn test_exclusive_group_rejects_two_members() {
        let diagnostics = validate(
            &license_filters(),
            &json!({"license_names": ["Apache", "MIT"], "license_patterns": ["*Apache*"]}),
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].summary,
            "Only one of license_names, license_patterns can be set"
        );
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("Conflicting fields supplied: license_names, license_patterns")
        );
    }

    #[test]
    fn test_exclusive_group_allows_single_member() {
        assert!(validate(&license_filters(), &json!({"license_names": ["MIT"]})).is_empty());
        assert!(validate(&license_filters(), &json!({"license_patterns": ["*MIT*"]})).is_empty());
        assert!(validate(&license_filters(), &json!({})).is_empty());
    }

    #[test]
    fn test_exclusive_group_ignores_null() {
        let diagnostics = validate(
            &license_filters(),
            &json!({"license_names": ["MIT"], "license_patterns": null}),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_exclusive_group_counts_supplied_empty_list() {
        let diagnostics = validate(
            &license_filters(),
            &json!({"license_names": [], "license_patterns": ["*Apache*"]}),
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_exclusive_group_multi_field_member() {
        let schema = Schema::v0()
            .with_attribute("names", Attribute::optional_string_list())
            .with_attribute("include_patterns", Attribute::optional_string_list())
            .with_attribute("exclude_patterns", Attribute::optional_string_list())
            .with_exclusive_group(
                ExclusiveGroup::of(&["names"]).with_member(&["include_patterns", "exclude_patterns"]),
            );

        assert!(validate(
            &schema,
            &json!({"include_patterns": ["a"], "exclude_patterns": ["b"]})
        )
        .is_empty());

        let diagnostics = validate(&schema, &json!({"names": ["b1"], "exclude_patterns": ["b"]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .summary
            .contains("names, include_patterns/exclude_patterns"));
    }

    #[test]
    fn test_exclusive_group_over_blocks_ignores_empty_block_list() {
        let schema = Schema::v0()
            .with_block("config", NestedBlock::single(Block::new()))
            .with_block("paths_config", NestedBlock::single(Block::new()))
            .with_exclusive_group(ExclusiveGroup::of(&["config", "paths_config"]));

        assert!(validate(&schema, &json!({"config": [], "paths_config": [{}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"config": [{}], "paths_config": [{}]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("config, paths_config"));
    }

    #[test]
    fn test_exclusive_group_in_nested_block_reports_path() {
        let schema = Schema::v0().with_block(
            "filters",
            NestedBlock::single(license_filters().block).with_min_items(1),
        );

        let diagnostics = validate(
            &schema,
            &json!({"filters": [{"license_names": ["MIT"], "license_patterns": ["*"]}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("filters.0".to_string()));
    }

    #[test]
    fn test_constraint_not_empty() {
        let schema = Schema::v0()
            .with_attribute(
                "repo_name",
                Attribute::required_string().with_constraint(Constraint::NotEmpty),
            )
            .with_attribute(
                "names",
                Attribute::optional_string_list().with_constraint(Constraint::NotEmpty),
            );

        assert!(validate(&schema, &json!({"repo_name": "libs"})).is_empty());
        assert_eq!(validate(&schema, &json!({"repo_name": ""})).len(), 1);

        let diagnostics = validate(&schema, &json!({"repo_name": "libs", "names": ["a", ""]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("names.1".to_string()));
    }

    #[test]
    fn test_constraint_at_least() {
        let schema = Schema::v0().with_attribute(
            "retention_in_days",
            Attribute::optional_int64().with_constraint(Constraint::AtLeast(0)),
        );

        assert!(validate(&schema, &json!({"retention_in_days": 0})).is_empty());
        let diagnostics = validate(&schema, &json!({"retention_in_days": -1}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("out of range"));
    }

    #[test]
    fn test_constraint_between() {
        let schema = Schema::v0().with_attribute(
            "min_score",
            Attribute::optional_float64().with_constraint(Constraint::Between(0.0, 10.0)),
        );

        assert!(validate(&schema, &json!({"min_score": 6.3})).is_empty());
        assert!(validate(&schema, &json!({"min_score": 10})).is_empty());
        assert_eq!(validate(&schema, &json!({"min_score": 10.5})).len(), 1);
    }

    #[test]
    fn test_constraint_one_of() {
        let schema = Schema::v0().with_attribute(
            "severities",
            Attribute::optional_string_list()
                .with_constraint(Constraint::one_of(&["Low", "Medium", "High", "Critical"])),
        );

        assert!(validate(&schema, &json!({"severities": ["High", "Medium"]})).is_empty());
        let diagnostics = validate(&schema, &json!({"severities": ["High", "Severe"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("severities.1".to_string()));
    }

    #[test]
    fn test_constraint_rfc3339() {
        let schema = Schema::v0().with_attribute(
            "start",
            Attribute::optional_string().with_constraint(Constraint::Rfc3339),
        );

        assert!(validate(&schema, &json!({"start": "2020-06-29T12:22:16Z"})).is_empty());
        assert_eq!(validate(&schema, &json!({"start": "June 29th"})).len(), 1);
    }

    #[test]
    fn test_constraints_skipped_on_type_error() {
        let schema = Schema::v0().with_attribute(
            "retention_in_days",
            Attribute::optional_int64().with_constraint(Constraint::AtLeast(0)),
        );

        let diagnostics = validate(&schema, &json!({"retention_in_days": "ninety"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_nested_block_list() {
        let schema = Schema::v0().with_block(
            "pattern",
            NestedBlock::list(Block::new().with_attribute("include", Attribute::required_string()))
                .with_min_items(1),
        );

        assert!(validate(&schema, &json!({"pattern": [{"include": "a"}, {"include": "b"}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"pattern": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(&schema, &json!({"pattern": [{"include": 1}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("pattern.0.include".to_string()));

        let diagnostics = validate(&schema, &json!({"pattern": {"include": "a"}}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_validate_single_block_max_items() {
        let schema = Schema::v0().with_block("config", NestedBlock::single(Block::new()));

        let diagnostics = validate(&schema, &json!({"config": [{}, {}]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 1"));
    }

    #[test]
    fn test_is_valid_and_result_helpers() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(is_valid(&schema, &json!({"name": "test"})));
        assert!(!is_valid(&schema, &json!({})));

        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());
        let result = validate_result(&schema, &json!({}));
        assert_eq!(result.unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }
}
