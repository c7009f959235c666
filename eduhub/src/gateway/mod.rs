//! The single path by which documents enter the store.
//!
//! Every insert is validated against the schema registry and checked against
//! the unique indexes the plan declares before anything is written.

use crate::error::{EduHubError, Result};
use crate::index::{render_key, IndexPlan};
use crate::model::{Entity, EntityKind};
use crate::schema::SchemaRegistry;
use crate::store::DocumentStore;
use serde_json::Value;
use std::collections::HashSet;

pub struct WriteGateway<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    registry: &'a SchemaRegistry,
    plan: &'a IndexPlan,
}

impl<'a, S: DocumentStore + ?Sized> WriteGateway<'a, S> {
    pub fn new(store: &'a S, registry: &'a SchemaRegistry, plan: &'a IndexPlan) -> Self {
        WriteGateway {
            store,
            registry,
            plan,
        }
    }

    /// Insert one document, returning its store-assigned id.
    pub fn insert(&self, kind: EntityKind, document: &Value) -> Result<String> {
        self.registry.validate(kind, document)?;
        self.check_unique(kind, document)?;

        let id = self.store.insert_one(kind.collection(), document)?;
        log::debug!("Inserted {kind}/{id}");
        Ok(id)
    }

    /// Insert every document or none. Each document is validated and checked
    /// against stored keys and against earlier documents in the same batch
    /// before the store writes anything.
    pub fn insert_many(&self, kind: EntityKind, documents: &[Value]) -> Result<Vec<String>> {
        let mut batch_keys: HashSet<(String, String)> = HashSet::new();

        for (index, document) in documents.iter().enumerate() {
            let reject = |source: EduHubError| EduHubError::BatchRejected {
                index,
                source: Box::new(source),
            };

            self.registry.validate(kind, document).map_err(reject)?;
            self.check_unique(kind, document).map_err(reject)?;

            for spec in self.plan.unique_constraints(kind.collection()) {
                let Some(values) = spec.key_values(document) else {
                    continue;
                };
                let key = serde_json::to_string(&values)?;
                if !batch_keys.insert((spec.name(), key)) {
                    return Err(reject(EduHubError::DuplicateKey {
                        collection: kind.collection().to_string(),
                        field: spec.field_label(),
                        value: render_key(&values),
                    }));
                }
            }
        }

        let ids = self.store.insert_many(kind.collection(), documents)?;
        log::debug!("Inserted {} documents into {kind}", ids.len());
        Ok(ids)
    }

    pub fn insert_entity<T: Entity>(&self, entity: &T) -> Result<String> {
        self.insert(T::KIND, &serde_json::to_value(entity)?)
    }

    pub fn insert_entities<T: Entity>(&self, entities: &[T]) -> Result<Vec<String>> {
        let documents = entities
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.insert_many(T::KIND, &documents)
    }

    /// Fail with `DuplicateKey` if a stored document already holds this
    /// document's value for any declared unique index. Documents missing part
    /// of a key are not checked.
    fn check_unique(&self, kind: EntityKind, document: &Value) -> Result<()> {
        for spec in self.plan.unique_constraints(kind.collection()) {
            let Some(values) = spec.key_values(document) else {
                continue;
            };
            if self.store.count(kind.collection(), &spec.key_filter(&values))? > 0 {
                log::debug!("Rejected duplicate {}.{}", kind, spec.name());
                return Err(EduHubError::DuplicateKey {
                    collection: kind.collection().to_string(),
                    field: spec.field_label(),
                    value: render_key(&values),
                });
            }
        }
        Ok(())
    }
}
