//! `EduHub` bundles a store handle with the schema registry and index plan
//! so callers wire the components once.

use crate::config::EduHubConfig;
use crate::error::Result;
use crate::gateway::WriteGateway;
use crate::index::IndexPlan;
use crate::query::QueryService;
use crate::schema::SchemaRegistry;
use crate::setup::{bootstrap, SetupReport};
use crate::store::{DocumentStore, SqliteStore};

pub struct EduHub<S: DocumentStore = SqliteStore> {
    store: S,
    registry: SchemaRegistry,
    plan: IndexPlan,
}

impl EduHub<SqliteStore> {
    /// Open the SQLite store, schema and index plan a configuration names.
    /// Does not create collections; call [`EduHub::setup`] for that.
    pub fn open(config: &EduHubConfig) -> Result<Self> {
        config.validate()?;
        let registry = config.registry()?;
        let store = SqliteStore::from_config(&config.store)?;
        log::info!("EduHub store ready at {}", config.store.path.display());
        Ok(Self::new(store, registry, config.index_plan()))
    }
}

impl<S: DocumentStore> EduHub<S> {
    pub fn new(store: S, registry: SchemaRegistry, plan: IndexPlan) -> Self {
        EduHub {
            store,
            registry,
            plan,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn plan(&self) -> &IndexPlan {
        &self.plan
    }

    /// Create missing collections and indexes. Safe to run repeatedly.
    pub fn setup(&self) -> Result<SetupReport> {
        bootstrap(&self.store, &self.registry, &self.plan)
    }

    pub fn gateway(&self) -> WriteGateway<'_, S> {
        WriteGateway::new(&self.store, &self.registry, &self.plan)
    }

    pub fn queries(&self) -> QueryService<'_, S> {
        QueryService::new(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::seed::SeedGenerator;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn memory_config() -> EduHubConfig {
        EduHubConfig {
            store: StoreConfig {
                path: PathBuf::from(StoreConfig::IN_MEMORY),
                ..StoreConfig::default()
            },
            ..EduHubConfig::default()
        }
    }

    #[test]
    fn test_seed_and_query_round() {
        let hub = EduHub::open(&memory_config()).unwrap();
        hub.setup().unwrap();

        let seed = SeedGenerator::new();
        let gateway = hub.gateway();
        gateway.insert_entities(&seed.users(20)).unwrap();
        gateway.insert_entities(&seed.courses(8)).unwrap();
        gateway.insert_entities(&seed.enrollments(3)).unwrap();

        let queries = hub.queries();
        assert_eq!(queries.find_active_students().unwrap().len(), 10);
        assert_eq!(queries.course_enrollment_stats().unwrap()["course1"], 3);
        assert!(queries
            .explain_email_lookup("user1@edu.africa")
            .unwrap()
            .uses_index("email_1"));
    }

    #[test]
    fn test_open_persists_between_handles() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = EduHubConfig::default();
        config.store.path = tmp.path().join("eduhub.db");

        {
            let hub = EduHub::open(&config).unwrap();
            hub.setup().unwrap();
            hub.gateway()
                .insert_entities(&SeedGenerator::new().users(2))
                .unwrap();
        }

        let hub = EduHub::open(&config).unwrap();
        let report = hub.setup().unwrap();
        assert!(report.created.is_empty());
        assert!(hub
            .queries()
            .find_user_by_email("user2@edu.africa")
            .unwrap()
            .is_some());
    }
}
