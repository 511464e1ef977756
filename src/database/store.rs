use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;
use crate::filter::{DocumentFilter, UID_FIELD};
use crate::types::Collection;

/// A stored document: free-form JSON fields plus an optional binary payload
/// (only images carry one).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub fields: Map<String, Value>,
    pub binary: Option<Vec<u8>>,
}

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields, binary: None }
    }

    /// Build from a JSON value; anything other than an object is rejected
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(fields)),
            _ => None,
        }
    }

    pub fn with_binary(mut self, binary: Option<Vec<u8>>) -> Self {
        self.binary = binary;
        self
    }

    pub fn uid(&self) -> Option<&str> {
        self.fields.get(UID_FIELD).and_then(Value::as_str)
    }

    pub(crate) fn require_uid(&self) -> Result<&str, DatabaseError> {
        match self.uid() {
            Some(uid) if !uid.is_empty() => Ok(uid),
            _ => Err(DatabaseError::QueryError("document is missing a uid".to_string())),
        }
    }
}

/// Storage collaborator scoped to a single partition.
///
/// Implementations must be safe to share across concurrent assemblies; none of
/// the read paths may mutate state.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Document>, DatabaseError>;

    async fn find_many(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError>;

    /// Insert a new document. A uid already present is a `Conflict`.
    async fn insert(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<Document, DatabaseError>;

    /// Replace the document stored under `uid`; `None` when there is nothing to replace
    async fn replace(
        &self,
        collection: Collection,
        uid: &str,
        document: Document,
    ) -> Result<Option<Document>, DatabaseError>;

    async fn delete(
        &self,
        collection: Collection,
        uid: &str,
    ) -> Result<Option<Document>, DatabaseError>;

    /// Cheap connectivity probe used by the health endpoint
    async fn ping(&self) -> Result<(), DatabaseError>;
}
