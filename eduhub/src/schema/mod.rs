mod parser;
mod types;

pub use parser::{builtin_schema, parse_schema, parse_schema_str, EDUHUB_SCHEMA_YAML};
pub use types::{CollectionDefinition, FieldDefinition, FieldType, SchemaDefinition};

use crate::error::{EduHubError, Result};
use crate::model::EntityKind;
use crate::validation::{self, ValidationReport};
use serde_json::Value;
use std::path::Path;

/// Declares the required shape of every entity collection and checks
/// documents against it before they reach the store.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schema: SchemaDefinition,
}

impl SchemaRegistry {
    /// Registry over the schema shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_definition(builtin_schema()?)
    }

    /// Registry over a schema YAML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        log::info!("Loading schema from {}", path.display());
        Self::from_definition(parse_schema(path)?)
    }

    /// Build a registry, rejecting schemas that are malformed or that leave
    /// an entity kind without a rule set.
    pub fn from_definition(schema: SchemaDefinition) -> Result<Self> {
        schema.check()?;
        for kind in EntityKind::ALL {
            if schema.collection(kind.collection()).is_none() {
                return Err(EduHubError::Schema(format!(
                    "no rule set for collection '{}'",
                    kind.collection()
                )));
            }
        }
        Ok(SchemaRegistry { schema })
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    /// The rule set attached to an entity kind's collection.
    pub fn definition(&self, kind: EntityKind) -> Result<&CollectionDefinition> {
        self.schema
            .collection(kind.collection())
            .ok_or_else(|| EduHubError::UnknownCollection(kind.collection().to_string()))
    }

    /// Full report of every violation in a document.
    pub fn validate_document(&self, kind: EntityKind, document: &Value) -> Result<ValidationReport> {
        let definition = self.definition(kind)?;
        Ok(validation::validate_document(definition, document))
    }

    /// Pass/fail check surfacing the first violation as a typed error.
    pub fn validate(&self, kind: EntityKind, document: &Value) -> Result<()> {
        self.validate_document(kind, document)?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_schema_covers_all_kinds() {
        let registry = SchemaRegistry::builtin().unwrap();
        for kind in EntityKind::ALL {
            assert!(registry.definition(kind).is_ok(), "missing {kind}");
        }
        assert_eq!(
            registry.definition(EntityKind::User).unwrap().required_fields(),
            vec!["dateJoined", "email", "firstName", "lastName", "role", "userId"]
        );
    }

    #[test]
    fn test_builtin_role_enum() {
        let schema = builtin_schema().unwrap();
        let role = &schema.collections["users"].fields["role"];
        assert_eq!(
            role.enum_values.as_deref(),
            Some(&["student".to_string(), "instructor".to_string()][..])
        );
    }

    #[test]
    fn test_missing_collection_rejected() {
        let schema = parse_schema_str(
            r#"
collections:
  users:
    fields:
      email: { type: string, required: true }
"#,
        )
        .unwrap();
        let err = SchemaRegistry::from_definition(schema).unwrap_err();
        assert!(matches!(err, EduHubError::Schema(_)));
    }

    #[test]
    fn test_empty_enum_rejected() {
        let schema = parse_schema_str(
            r#"
collections:
  users:
    fields:
      role: { type: string, enum: [] }
"#,
        )
        .unwrap();
        let err = schema.check().unwrap_err();
        assert!(matches!(err, EduHubError::InvalidValidator { ref collection, .. } if collection == "users"));
    }

    #[test]
    fn test_enum_on_non_string_rejected() {
        let schema = parse_schema_str(
            r#"
collections:
  lessons:
    fields:
      order: { type: integer, enum: ["1"] }
"#,
        )
        .unwrap();
        assert!(schema.check().is_err());
    }

    #[test]
    fn test_array_without_items_rejected() {
        let schema = parse_schema_str(
            r#"
collections:
  courses:
    fields:
      tags: { type: array }
"#,
        )
        .unwrap();
        let err = schema.check().unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn test_nested_invalid_field_rejected() {
        let schema = parse_schema_str(
            r#"
collections:
  users:
    fields:
      profile:
        type: object
        fields:
          skills: { type: array, items: { type: string, fields: { x: { type: string } } } }
"#,
        )
        .unwrap();
        let err = schema.check().unwrap_err();
        assert!(err.to_string().contains("profile.skills[]"));
    }

    #[test]
    fn test_unknown_field_type_is_parse_error() {
        let result = parse_schema_str(
            r#"
collections:
  users:
    fields:
      email: { type: email }
"#,
        );
        assert!(matches!(result, Err(EduHubError::Yaml(_))));
    }

    #[test]
    fn test_registry_from_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("schema.yaml");
        std::fs::write(&path, EDUHUB_SCHEMA_YAML).unwrap();

        let registry = SchemaRegistry::from_path(&path).unwrap();
        assert_eq!(registry.schema(), &builtin_schema().unwrap());
    }
}
