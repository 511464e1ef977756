//! In-process document store. Backs the `memory` storage backend and the tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::store::{Document, DocumentStore};
use crate::filter::DocumentFilter;
use crate::types::Collection;

/// Documents are kept per collection and listed in insertion order,
/// the same order the Postgres store gets from `created_at`
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Entries>>,
}

#[derive(Default)]
struct Entries {
    next_seq: u64,
    by_uid: HashMap<String, (u64, Document)>,
}

impl Entries {
    /// Insert or overwrite; an overwritten document keeps its position
    fn put(&mut self, uid: String, document: Document) {
        match self.by_uid.get_mut(&uid) {
            Some((_, slot)) => *slot = document,
            None => {
                self.by_uid.insert(uid, (self.next_seq, document));
                self.next_seq += 1;
            }
        }
    }

    fn matching<'a>(&'a self, filter: &DocumentFilter) -> Vec<&'a Document> {
        let mut found: Vec<&(u64, Document)> =
            self.by_uid.values().filter(|(_, doc)| filter.matches(doc)).collect();
        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, doc)| doc).collect()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite documents without conflict checks (fixtures, tests)
    pub async fn seed<I>(&self, collection: Collection, documents: I) -> Result<(), DatabaseError>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection).or_default();
        for document in documents {
            let uid = document.require_uid()?.to_string();
            entries.put(uid, document);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        let offset = filter.offset_value().unwrap_or(0).max(0) as usize;
        let found = collections
            .get(&collection)
            .and_then(|entries| entries.matching(filter).get(offset).map(|doc| (*doc).clone()));
        Ok(found)
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        let Some(entries) = collections.get(&collection) else {
            return Ok(vec![]);
        };

        let offset = filter.offset_value().unwrap_or(0).max(0) as usize;
        let limit = filter.limit_value().map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(entries
            .matching(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<Document, DatabaseError> {
        let uid = document.require_uid()?.to_string();
        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection).or_default();
        if entries.by_uid.contains_key(&uid) {
            let message = format!("{} '{}' already exists", collection, uid);
            return Err(DatabaseError::Conflict(message));
        }
        entries.put(uid, document.clone());
        Ok(document)
    }

    async fn replace(
        &self,
        collection: Collection,
        uid: &str,
        document: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(&collection).and_then(|entries| entries.by_uid.get_mut(uid)) {
            Some((_, slot)) => {
                *slot = document.clone();
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    async fn delete(
        &self,
        collection: Collection,
        uid: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .and_then(|entries| entries.by_uid.remove(uid))
            .map(|(_, document)| document))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
