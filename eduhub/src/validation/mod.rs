use crate::error::{EduHubError, Result};
use crate::schema::{CollectionDefinition, FieldDefinition, FieldType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single way in which a document fails its collection's rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path of the offending field, e.g. `profile.skills[1]`
    pub field: String,
    pub reason: ViolationReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationReason {
    MissingField,
    WrongType {
        expected: FieldType,
        found: &'static str,
    },
    InvalidEnum {
        value: String,
    },
    UnexpectedField,
    NotAnObject,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, reason: ViolationReason) -> Self {
        SchemaViolation {
            field: field.into(),
            reason,
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = &self.field;
        match &self.reason {
            ViolationReason::MissingField => write!(f, "required field '{field}' is missing"),
            ViolationReason::WrongType { expected, found } => {
                write!(f, "field '{field}' expected {expected}, got {found}")
            }
            ViolationReason::InvalidEnum { value } => {
                write!(f, "field '{field}' value '{value}' is not in the allowed set")
            }
            ViolationReason::UnexpectedField => {
                write!(f, "unexpected field '{field}' (additional_properties is false)")
            }
            ViolationReason::NotAnObject => write!(f, "document must be an object"),
        }
    }
}

/// Result of validating a document
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub violations: Vec<SchemaViolation>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first(&self) -> Option<&SchemaViolation> {
        self.violations.first()
    }

    /// Surface the first violation as a typed error.
    pub fn into_result(self) -> Result<()> {
        match self.violations.into_iter().next() {
            Some(violation) => Err(EduHubError::SchemaViolation(violation)),
            None => Ok(()),
        }
    }
}

/// Validate a document against its collection's rule set.
/// Fields are visited in name order; nested objects are only inspected
/// when present.
pub fn validate_document(collection: &CollectionDefinition, data: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    match data.as_object() {
        Some(map) => validate_fields(
            "",
            &collection.fields,
            collection.additional_properties,
            map,
            &mut report,
        ),
        None => report
            .violations
            .push(SchemaViolation::new("$", ViolationReason::NotAnObject)),
    }

    report
}

fn validate_fields(
    prefix: &str,
    fields: &BTreeMap<String, FieldDefinition>,
    additional_properties: bool,
    map: &Map<String, Value>,
    report: &mut ValidationReport,
) {
    for (field_name, field_def) in fields {
        let path = join_path(prefix, field_name);
        match map.get(field_name) {
            None => {
                if field_def.required {
                    report
                        .violations
                        .push(SchemaViolation::new(path, ViolationReason::MissingField));
                }
            }
            // A null required field counts as missing; an optional field
            // may be omitted but never null.
            Some(Value::Null) if field_def.required => {
                report
                    .violations
                    .push(SchemaViolation::new(path, ViolationReason::MissingField));
            }
            Some(value) => validate_value(&path, field_def, value, report),
        }
    }

    if !additional_properties {
        for key in map.keys() {
            if !fields.contains_key(key) {
                report.violations.push(SchemaViolation::new(
                    join_path(prefix, key),
                    ViolationReason::UnexpectedField,
                ));
            }
        }
    }
}

fn validate_value(path: &str, field_def: &FieldDefinition, value: &Value, report: &mut ValidationReport) {
    let matches_type = match field_def.field_type {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Timestamp => value
            .as_str()
            .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
            .unwrap_or(false),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
    };

    if !matches_type {
        report.violations.push(SchemaViolation::new(
            path,
            ViolationReason::WrongType {
                expected: field_def.field_type,
                found: type_name(value),
            },
        ));
        return;
    }

    match value {
        Value::String(s) => {
            if let Some(allowed) = &field_def.enum_values {
                if !allowed.iter().any(|a| a == s) {
                    report.violations.push(SchemaViolation::new(
                        path,
                        ViolationReason::InvalidEnum { value: s.clone() },
                    ));
                }
            }
        }
        Value::Array(elements) => {
            if let Some(items) = &field_def.items {
                for (i, element) in elements.iter().enumerate() {
                    validate_value(&format!("{path}[{i}]"), items, element, report);
                }
            }
        }
        Value::Object(map) => {
            validate_fields(path, &field_def.fields, true, map, report);
        }
        _ => {}
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
