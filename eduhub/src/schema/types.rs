use crate::error::{EduHubError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level schema definition parsed from a schema YAML document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionDefinition>,
}

/// Validator rule set for a single collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDefinition {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
    #[serde(default = "default_true")]
    pub additional_properties: bool,
}

/// Definition of a single field, possibly nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Element definition for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldDefinition>>,
    /// Sub-field definitions for objects
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldDefinition>,
}

/// Field type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Timestamp,
    Array,
    Object,
}

fn default_true() -> bool {
    true
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SchemaDefinition {
    pub fn collection(&self, name: &str) -> Option<&CollectionDefinition> {
        self.collections.get(name)
    }

    /// Check every collection's rule set for well-formedness.
    pub fn check(&self) -> Result<()> {
        for (name, collection) in &self.collections {
            collection.check(name)?;
        }
        Ok(())
    }
}

impl CollectionDefinition {
    /// Reject rule sets that no document could satisfy or that a store
    /// could not interpret.
    pub fn check(&self, collection: &str) -> Result<()> {
        for (field_name, field_def) in &self.fields {
            field_def.check(collection, field_name)?;
        }
        Ok(())
    }

    /// Names of the required top-level fields, in name order.
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, def)| def.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl FieldDefinition {
    pub fn new(field_type: FieldType) -> Self {
        FieldDefinition {
            field_type,
            required: false,
            enum_values: None,
            items: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn check(&self, collection: &str, path: &str) -> Result<()> {
        let invalid = |reason: String| EduHubError::InvalidValidator {
            collection: collection.to_string(),
            reason,
        };

        if let Some(values) = &self.enum_values {
            if self.field_type != FieldType::String {
                return Err(invalid(format!(
                    "field '{path}' declares an enum but has type {}",
                    self.field_type
                )));
            }
            if values.is_empty() {
                return Err(invalid(format!("field '{path}' declares an empty enum")));
            }
        }

        match self.field_type {
            FieldType::Array => match &self.items {
                Some(items) => items.check(collection, &format!("{path}[]"))?,
                None => {
                    return Err(invalid(format!(
                        "array field '{path}' has no items definition"
                    )))
                }
            },
            _ if self.items.is_some() => {
                return Err(invalid(format!(
                    "field '{path}' has items but type {}",
                    self.field_type
                )));
            }
            _ => {}
        }

        if !self.fields.is_empty() && self.field_type != FieldType::Object {
            return Err(invalid(format!(
                "field '{path}' has sub-fields but type {}",
                self.field_type
            )));
        }
        for (sub_name, sub_def) in &self.fields {
            sub_def.check(collection, &format!("{path}.{sub_name}"))?;
        }

        Ok(())
    }
}
