pub mod config;
pub mod document;
pub mod error;
pub mod gateway;
pub mod hub;
pub mod index;
pub mod model;
pub mod query;
pub mod schema;
pub mod seed;
pub mod setup;
pub mod store;
pub mod validation;

pub use config::EduHubConfig;
pub use document::Document;
pub use error::{EduHubError, Result};
pub use gateway::WriteGateway;
pub use hub::EduHub;
pub use index::{IndexPlan, IndexSpec};
pub use model::{Entity, EntityKind};
pub use query::QueryService;
pub use schema::{SchemaDefinition, SchemaRegistry};
pub use seed::SeedGenerator;
pub use store::{DocumentStore, Filter, QueryPlanDescription, SqliteStore};
