//! Store doubles for unit tests: call recording, injected faults and latency.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::database::manager::DatabaseError;
use crate::database::memory::MemoryDocumentStore;
use crate::database::store::{Document, DocumentStore};
use crate::filter::DocumentFilter;
use crate::types::Collection;

/// Build a document from a JSON literal
pub fn doc(value: serde_json::Value) -> Document {
    Document::from_value(value).expect("test documents must be JSON objects")
}

/// Wraps a store and records every call as `(collection, operation)`
pub struct CountingStore {
    inner: Arc<dyn DocumentStore>,
    calls: Mutex<Vec<(Collection, &'static str)>>,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self { inner, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(Collection, &'static str)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, collection: Collection) -> usize {
        self.calls().iter().filter(|(c, _)| *c == collection).count()
    }

    fn record(&self, collection: Collection, operation: &'static str) {
        self.calls.lock().unwrap().push((collection, operation));
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Document>, DatabaseError> {
        self.record(collection, "find_one");
        self.inner.find_one(collection, filter).await
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError> {
        self.record(collection, "find_many");
        self.inner.find_many(collection, filter).await
    }

    async fn insert(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<Document, DatabaseError> {
        self.record(collection, "insert");
        self.inner.insert(collection, document).await
    }

    async fn replace(
        &self,
        collection: Collection,
        uid: &str,
        document: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        self.record(collection, "replace");
        self.inner.replace(collection, uid, document).await
    }

    async fn delete(
        &self,
        collection: Collection,
        uid: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        self.record(collection, "delete");
        self.inner.delete(collection, uid).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }
}

/// Delegates to a memory store but fails every read of one collection
pub struct FailingStore {
    inner: MemoryDocumentStore,
    failing: Collection,
}

impl FailingStore {
    pub fn new(inner: MemoryDocumentStore, failing: Collection) -> Self {
        Self { inner, failing }
    }

    fn check(&self, collection: Collection) -> Result<(), DatabaseError> {
        if collection == self.failing {
            return Err(DatabaseError::QueryError(format!("{} is unavailable", collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Document>, DatabaseError> {
        self.check(collection)?;
        self.inner.find_one(collection, filter).await
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError> {
        self.check(collection)?;
        self.inner.find_many(collection, filter).await
    }

    async fn insert(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<Document, DatabaseError> {
        self.inner.insert(collection, document).await
    }

    async fn replace(
        &self,
        collection: Collection,
        uid: &str,
        document: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        self.inner.replace(collection, uid, document).await
    }

    async fn delete(
        &self,
        collection: Collection,
        uid: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        self.inner.delete(collection, uid).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::QueryError("unavailable".to_string()))
    }
}

/// Adds a fixed delay before every read of one collection
pub struct SlowStore {
    inner: MemoryDocumentStore,
    slow: Collection,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: MemoryDocumentStore, slow: Collection, delay: Duration) -> Self {
        Self { inner, slow, delay }
    }

    async fn pause(&self, collection: Collection) {
        if collection == self.slow {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Document>, DatabaseError> {
        self.pause(collection).await;
        self.inner.find_one(collection, filter).await
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError> {
        self.pause(collection).await;
        self.inner.find_many(collection, filter).await
    }

    async fn insert(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<Document, DatabaseError> {
        self.inner.insert(collection, document).await
    }

    async fn replace(
        &self,
        collection: Collection,
        uid: &str,
        document: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        self.inner.replace(collection, uid, document).await
    }

    async fn delete(
        &self,
        collection: Collection,
        uid: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        self.inner.delete(collection, uid).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }
}
