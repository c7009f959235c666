//! Index plan: which field combinations each collection indexes, and which
//! of those indexes carry a uniqueness constraint.
//!
//! The plan only declares. The write gateway checks unique keys before a
//! write; the store's unique index arbitrates concurrent writers.

use crate::config::PolicyConfig;
use crate::document::field_value;
use crate::error::Result;
use crate::model::EntityKind;
use crate::store::{DocumentStore, Filter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }

    /// The `1` / `-1` suffix used in index names.
    pub fn direction(&self) -> i8 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    pub field: String,
    pub order: SortOrder,
}

/// One declared index over an ordered field combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub collection: String,
    pub keys: Vec<IndexKey>,
    pub unique: bool,
}

impl IndexSpec {
    /// Non-unique index with every key ascending.
    pub fn ascending(collection: &str, fields: &[&str]) -> Self {
        IndexSpec {
            collection: collection.to_string(),
            keys: fields
                .iter()
                .map(|f| IndexKey {
                    field: f.to_string(),
                    order: SortOrder::Ascending,
                })
                .collect(),
            unique: false,
        }
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Conventional name, e.g. `email_1` or `title_1_category_1`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{}_{}", k.field, k.order.direction()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// The indexed fields joined by commas, as reported in duplicate-key errors.
    pub fn field_label(&self) -> String {
        self.keys
            .iter()
            .map(|k| k.field.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// The key values a document carries for this index, or `None` when any
    /// part of the key is absent or null.
    pub fn key_values(&self, document: &Value) -> Option<Vec<Value>> {
        self.keys
            .iter()
            .map(|k| match field_value(document, &k.field) {
                None | Some(Value::Null) => None,
                Some(v) => Some(v.clone()),
            })
            .collect()
    }

    /// Equality filter matching documents that share the given key values.
    pub fn key_filter(&self, values: &[Value]) -> Filter {
        self.keys
            .iter()
            .zip(values)
            .fold(Filter::new(), |filter, (key, value)| filter.eq(&key.field, value.clone()))
    }
}

/// Render key values the way duplicate-key errors report them.
pub fn render_key(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// The full set of indexes that must exist before write traffic.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPlan {
    indexes: Vec<IndexSpec>,
}

impl IndexPlan {
    pub fn new(allow_duplicate_enrollment: bool) -> Self {
        IndexPlan {
            indexes: vec![
                IndexSpec::ascending(EntityKind::User.collection(), &["email"]).with_unique(true),
                IndexSpec::ascending(EntityKind::Course.collection(), &["title", "category"]),
                IndexSpec::ascending(EntityKind::Enrollment.collection(), &["studentId", "courseId"])
                    .with_unique(!allow_duplicate_enrollment),
                IndexSpec::ascending(EntityKind::Assignment.collection(), &["dueDate"]),
            ],
        }
    }

    /// A plan over an explicit set of indexes.
    pub fn with_indexes(indexes: Vec<IndexSpec>) -> Self {
        IndexPlan { indexes }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.allow_duplicate_enrollment)
    }

    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    pub fn for_collection<'a>(&'a self, collection: &'a str) -> impl Iterator<Item = &'a IndexSpec> + 'a {
        self.indexes.iter().filter(move |i| i.collection == collection)
    }

    pub fn unique_constraints<'a>(&'a self, collection: &'a str) -> impl Iterator<Item = &'a IndexSpec> + 'a {
        self.for_collection(collection).filter(|i| i.unique)
    }

    /// Create every declared index. Safe to run repeatedly.
    pub fn apply<S: DocumentStore + ?Sized>(&self, store: &S) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.indexes.len());
        for spec in &self.indexes {
            store.create_index(spec)?;
            log::debug!("Index {}.{} in place (unique: {})", spec.collection, spec.name(), spec.unique);
            names.push(format!("{}.{}", spec.collection, spec.name()));
        }
        Ok(names)
    }
}

impl Default for IndexPlan {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_default_plan() {
        let plan = IndexPlan::default();
        let declared: Vec<(String, String, bool)> = plan
            .indexes()
            .iter()
            .map(|i| (i.collection.clone(), i.name(), i.unique))
            .collect();
        assert_eq!(
            declared,
            vec![
                ("users".to_string(), "email_1".to_string(), true),
                ("courses".to_string(), "title_1_category_1".to_string(), false),
                ("enrollments".to_string(), "studentId_1_courseId_1".to_string(), false),
                ("assignments".to_string(), "dueDate_1".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_enrollment_uniqueness_follows_policy() {
        let plan = IndexPlan::new(false);
        let unique: Vec<String> = plan.unique_constraints("enrollments").map(|i| i.name()).collect();
        assert_eq!(unique, vec!["studentId_1_courseId_1".to_string()]);

        assert_eq!(IndexPlan::default().unique_constraints("enrollments").count(), 0);
        assert_eq!(IndexPlan::default().unique_constraints("users").count(), 1);
    }

    #[test]
    fn test_key_values() {
        let spec = IndexSpec::ascending("enrollments", &["studentId", "courseId"]);
        let doc = json!({ "studentId": "user2", "courseId": "course1" });
        let values = spec.key_values(&doc).unwrap();
        assert_eq!(render_key(&values), "user2,course1");
        assert_eq!(spec.field_label(), "studentId,courseId");

        let partial = json!({ "studentId": "user2", "courseId": null });
        assert_eq!(spec.key_values(&partial), None);
    }

    #[test]
    fn test_descending_name() {
        let mut spec = IndexSpec::ascending("assignments", &["dueDate"]);
        spec.keys[0].order = SortOrder::Descending;
        assert_eq!(spec.name(), "dueDate_-1");
    }

    #[test]
    fn test_key_filter() {
        let spec = IndexSpec::ascending("users", &["email"]);
        let filter = spec.key_filter(&[json!("user1@edu.africa")]);
        assert_eq!(filter.predicates().len(), 1);
        assert_eq!(filter.predicates()[0].field, "email");
    }
}
