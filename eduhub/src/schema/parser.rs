use crate::error::Result;
use super::types::SchemaDefinition;
use std::path::Path;

/// The schema shipped with the crate, covering every EduHub collection.
pub const EDUHUB_SCHEMA_YAML: &str = include_str!("eduhub.yaml");

/// Parse a schema YAML file into a SchemaDefinition
pub fn parse_schema(path: &Path) -> Result<SchemaDefinition> {
    let content = std::fs::read_to_string(path)?;
    parse_schema_str(&content)
}

/// Parse a schema YAML string into a SchemaDefinition
pub fn parse_schema_str(content: &str) -> Result<SchemaDefinition> {
    let schema: SchemaDefinition = serde_yaml::from_str(content)?;
    Ok(schema)
}

/// Parse the built-in EduHub schema
pub fn builtin_schema() -> Result<SchemaDefinition> {
    parse_schema_str(EDUHUB_SCHEMA_YAML)
}
