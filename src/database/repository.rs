use std::sync::Arc;

use crate::database::manager::DatabaseError;
use crate::database::models::Entity;
use crate::database::store::{Document, DocumentStore};
use crate::filter::DocumentFilter;
use crate::types::Collection;

/// Untyped handle on one collection of a partition
#[derive(Clone)]
pub struct DocumentCollection {
    collection: Collection,
    store: Arc<dyn DocumentStore>,
}

impl DocumentCollection {
    pub fn new(collection: Collection, store: Arc<dyn DocumentStore>) -> Self {
        Self { collection, store }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub async fn select_any(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError> {
        self.store.find_many(self.collection, filter).await
    }

    pub async fn select_one(&self, uid: &str) -> Result<Option<Document>, DatabaseError> {
        self.store.find_one(self.collection, &DocumentFilter::by_uid(uid)).await
    }

    pub async fn create(&self, document: Document) -> Result<Document, DatabaseError> {
        self.store.insert(self.collection, document).await
    }

    pub async fn update(
        &self,
        uid: &str,
        document: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        self.store.replace(self.collection, uid, document).await
    }

    pub async fn delete(&self, uid: &str) -> Result<Option<Document>, DatabaseError> {
        self.store.delete(self.collection, uid).await
    }
}

/// Typed repository over the collection backing `T`
pub struct Repository<T> {
    documents: DocumentCollection,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            documents: self.documents.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            documents: DocumentCollection::new(T::COLLECTION, store),
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_one(&self, uid: &str) -> Result<Option<T>, DatabaseError> {
        self.documents.select_one(uid).await?.map(T::from_document).transpose()
    }

    /// Fan-out lookup: one set-membership query for all ids. No ids, no query.
    pub async fn select_ids(&self, uids: &[String]) -> Result<Vec<T>, DatabaseError> {
        if uids.is_empty() {
            return Ok(vec![]);
        }
        self.select_any(&DocumentFilter::uid_in(uids.iter().cloned())).await
    }

    pub async fn select_any(&self, filter: &DocumentFilter) -> Result<Vec<T>, DatabaseError> {
        self.documents
            .select_any(filter)
            .await?
            .into_iter()
            .map(T::from_document)
            .collect()
    }

    pub async fn select_all(&self) -> Result<Vec<T>, DatabaseError> {
        self.select_any(&DocumentFilter::all()).await
    }

    pub async fn create(&self, entity: T) -> Result<T, DatabaseError> {
        let document = self.documents.create(entity.into_document()?).await?;
        T::from_document(document)
    }
}
