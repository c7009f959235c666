//! The boundary with the persisted document store.
//!
//! Components take the store as an explicit `&S where S: DocumentStore`
//! handle; nothing in the crate holds a process-wide connection.

mod filter;
pub mod sqlite;

pub use filter::{check_field_path, Comparison, Filter, Predicate};
pub use sqlite::SqliteStore;

use crate::document::Document;
use crate::error::Result;
use crate::index::IndexSpec;
use crate::schema::CollectionDefinition;
use serde::Serialize;
use serde_json::Value;

/// Operations the data layer needs from a document store.
///
/// Implementations must provide atomic single-document writes, atomic
/// `insert_many`, unique-index enforcement that admits exactly one of two
/// racing writers, and reads that reflect every committed write.
pub trait DocumentStore {
    /// Create a named collection with the validator attached. Fails with
    /// `CollectionAlreadyExists` if the name is taken and with
    /// `InvalidValidator` if the rule set is malformed.
    fn create_collection(&self, name: &str, validator: &CollectionDefinition) -> Result<()>;

    fn list_collections(&self) -> Result<Vec<String>>;

    /// Insert one document, returning its store-assigned id.
    fn insert_one(&self, collection: &str, document: &Value) -> Result<String>;

    /// Insert every document or none of them.
    fn insert_many(&self, collection: &str, documents: &[Value]) -> Result<Vec<String>>;

    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<StoredDocument>>;

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;

    /// Group every document by `group_key` and count each group.
    fn aggregate_count(&self, collection: &str, group_key: &str) -> Result<Vec<GroupCount>>;

    /// Idempotent when the same index already exists.
    fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>>;

    /// The execution plan the store would use for `filter`.
    fn explain(&self, collection: &str, filter: &Filter) -> Result<QueryPlanDescription>;
}

pub type StoredDocument = Document<Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub key: Value,
    pub count: u64,
}

/// Opaque plan description, for diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlanDescription {
    pub collection: String,
    pub predicates: Vec<String>,
    /// Name of the index the plan selects, if any (e.g. `email_1`)
    pub selected_index: Option<String>,
    /// Raw plan steps as reported by the store
    pub steps: Vec<String>,
}

impl QueryPlanDescription {
    pub fn uses_index(&self, name: &str) -> bool {
        self.selected_index.as_deref() == Some(name)
    }

    pub fn is_collection_scan(&self) -> bool {
        self.selected_index.is_none()
    }
}
