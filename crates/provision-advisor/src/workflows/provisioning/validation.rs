//! Field-level validation of raw submission payloads.
//!
//! Every field of a [`ResourceRequest`] is required. `tags` and
//! `security_group.allowed_cidrs` may be empty. All problems are collected so a client
//! can fix a payload in one round trip.

use serde::Serialize;
use serde_json::{Map, Value};

use super::domain::ResourceRequest;

/// A single problem at a dotted location such as `security_group.allowed_cidrs.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub loc: String,
    pub message: String,
}

impl FieldIssue {
    fn new(loc: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{} validation error(s):{}", .issues.len(), describe(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(loc: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(loc, message)],
        }
    }

    pub fn locations(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.loc.as_str()).collect()
    }
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!(" {}: {};", issue.loc, issue.message))
        .collect()
}

const FIELD_REQUIRED: &str = "field required";

/// Check `payload` against the resource request shape and convert it.
pub fn validate_request(payload: &Value) -> Result<ResourceRequest, ValidationError> {
    let Some(body) = payload.as_object() else {
        return Err(ValidationError::single("body", "expected a JSON object"));
    };

    let mut issues = Vec::new();

    for field in ["resource_name", "environment", "instance_type"] {
        match body.get(field) {
            None => issues.push(FieldIssue::new(field, FIELD_REQUIRED)),
            Some(Value::String(_)) => {}
            Some(_) => issues.push(FieldIssue::new(field, "expected a string")),
        }
    }

    match body.get("encrypted") {
        None => issues.push(FieldIssue::new("encrypted", FIELD_REQUIRED)),
        Some(Value::Bool(_)) => {}
        Some(_) => issues.push(FieldIssue::new("encrypted", "expected a boolean")),
    }

    match body.get("tags") {
        None => issues.push(FieldIssue::new("tags", FIELD_REQUIRED)),
        Some(Value::Object(tags)) => check_tags(tags, &mut issues),
        Some(_) => issues.push(FieldIssue::new("tags", "expected an object")),
    }

    match body.get("security_group") {
        None => issues.push(FieldIssue::new("security_group", FIELD_REQUIRED)),
        Some(Value::Object(group)) => check_security_group(group, &mut issues),
        Some(_) => issues.push(FieldIssue::new("security_group", "expected an object")),
    }

    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }

    serde_json::from_value(payload.clone())
        .map_err(|err| ValidationError::single("body", err.to_string()))
}

fn check_tags(tags: &Map<String, Value>, issues: &mut Vec<FieldIssue>) {
    for (key, value) in tags {
        if !value.is_string() {
            issues.push(FieldIssue::new(format!("tags.{key}"), "expected a string"));
        }
    }
}

fn check_security_group(group: &Map<String, Value>, issues: &mut Vec<FieldIssue>) {
    match group.get("allowed_cidrs") {
        None => issues.push(FieldIssue::new(
            "security_group.allowed_cidrs",
            FIELD_REQUIRED,
        )),
        Some(Value::Array(cidrs)) => {
            for (index, cidr) in cidrs.iter().enumerate() {
                if !cidr.is_string() {
                    issues.push(FieldIssue::new(
                        format!("security_group.allowed_cidrs.{index}"),
                        "expected a string",
                    ));
                }
            }
        }
        Some(_) => issues.push(FieldIssue::new(
            "security_group.allowed_cidrs",
            "expected an array",
        )),
    }
}
