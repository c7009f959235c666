// Stored documents and field-path lookup

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A loaded document: the store-assigned id plus typed data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    pub id: String,
    pub data: T,
}

impl Document<Value> {
    /// Deserialize the raw data into a typed entity.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Document<T>> {
        let data = serde_json::from_value(self.data)?;
        Ok(Document { id: self.id, data })
    }
}

/// Resolve a dot-separated field path (`profile.bio`) inside a document.
pub fn field_value<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}
