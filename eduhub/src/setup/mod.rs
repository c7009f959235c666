//! Idempotent bootstrap: every entity collection with its validator, then
//! the index plan.

use crate::error::{EduHubError, Result};
use crate::index::IndexPlan;
use crate::model::EntityKind;
use crate::schema::SchemaRegistry;
use crate::store::DocumentStore;
use serde::Serialize;

/// What a bootstrap run created and what was already in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetupReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub indexes: Vec<String>,
}

/// Create a collection with its validator. Returns `false` when it already
/// exists with the same validator; a changed validator fails with
/// `ValidatorConflict` and every other failure propagates.
pub fn ensure_collection<S: DocumentStore + ?Sized>(
    store: &S,
    registry: &SchemaRegistry,
    kind: EntityKind,
) -> Result<bool> {
    match store.create_collection(kind.collection(), registry.definition(kind)?) {
        Ok(()) => Ok(true),
        Err(EduHubError::CollectionAlreadyExists { name }) => {
            log::info!("Collection '{name}' already exists");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Bring a store to the state the data layer expects. Safe to run repeatedly.
pub fn bootstrap<S: DocumentStore + ?Sized>(
    store: &S,
    registry: &SchemaRegistry,
    plan: &IndexPlan,
) -> Result<SetupReport> {
    let mut report = SetupReport::default();
    for kind in EntityKind::ALL {
        let name = kind.collection().to_string();
        if ensure_collection(store, registry, kind)? {
            report.created.push(name);
        } else {
            report.existing.push(name);
        }
    }
    report.indexes = plan.apply(store)?;
    Ok(report)
}
