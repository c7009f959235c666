use crate::validation::SchemaViolation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EduHubError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(SchemaViolation),

    #[error("Duplicate key in '{collection}': {field} = {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    #[error("Collection already exists: {name}")]
    CollectionAlreadyExists { name: String },

    #[error("Collection '{collection}' exists with a different validator")]
    ValidatorConflict { collection: String },

    #[error("Invalid validator for collection '{collection}': {reason}")]
    InvalidValidator { collection: String, reason: String },

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Batch rejected at document {index}: {source}")]
    BatchRejected {
        index: usize,
        #[source]
        source: Box<EduHubError>,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store call timed out after {waited_ms} ms")]
    StoreTimeout { waited_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl EduHubError {
    /// Only transport-level failures are worth retrying; every other kind
    /// needs the caller to change the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EduHubError::StoreUnavailable(_) | EduHubError::StoreTimeout { .. }
        )
    }

    /// True for a unique-constraint rejection, including one nested in a
    /// rejected batch.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            EduHubError::DuplicateKey { .. } => true,
            EduHubError::BatchRejected { source, .. } => source.is_duplicate_key(),
            _ => false,
        }
    }

    /// The schema violation behind this error, if any.
    pub fn violation(&self) -> Option<&SchemaViolation> {
        match self {
            EduHubError::SchemaViolation(v) => Some(v),
            EduHubError::BatchRejected { source, .. } => source.violation(),
            _ => None,
        }
    }
}

impl From<SchemaViolation> for EduHubError {
    fn from(violation: SchemaViolation) -> Self {
        EduHubError::SchemaViolation(violation)
    }
}

pub type Result<T> = std::result::Result<T, EduHubError>;
