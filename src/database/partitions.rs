//! Language partitions: the fixed mapping from language to its collections.
//! Built once at startup, never mutated afterwards.

use std::sync::Arc;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::memory::MemoryDocumentStore;
use crate::database::models::{Course, FinalQuiz, Image, Module, Program};
use crate::database::postgres::PgDocumentStore;
use crate::database::repository::{DocumentCollection, Repository};
use crate::database::store::DocumentStore;
use crate::types::{Collection, Language, ResourceKind, UnknownLanguage};

/// Typed repository handles over one language's store
#[derive(Clone)]
pub struct Partition {
    language: Language,
    store: Arc<dyn DocumentStore>,
    pub programs: Repository<Program>,
    pub courses: Repository<Course>,
    pub modules: Repository<Module>,
    pub final_quizzes: Repository<FinalQuiz>,
    pub images: Repository<Image>,
}

impl Partition {
    pub fn new(language: Language, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            language,
            programs: Repository::new(store.clone()),
            courses: Repository::new(store.clone()),
            modules: Repository::new(store.clone()),
            final_quizzes: Repository::new(store.clone()),
            images: Repository::new(store.clone()),
            store,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Untyped access for the generic resource endpoints
    pub fn documents(&self, kind: ResourceKind) -> DocumentCollection {
        DocumentCollection::new(kind.collection(), self.store.clone())
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.store.ping().await
    }
}

pub struct Partitions {
    am: Partition,
    or: Partition,
    en: Partition,
}

impl Partitions {
    pub fn new(am: Partition, or: Partition, en: Partition) -> Self {
        Self { am, or, en }
    }

    pub fn from_stores<F>(mut store_for: F) -> Self
    where
        F: FnMut(Language) -> Arc<dyn DocumentStore>,
    {
        Self::new(
            Partition::new(Language::Am, store_for(Language::Am)),
            Partition::new(Language::Or, store_for(Language::Or)),
            Partition::new(Language::En, store_for(Language::En)),
        )
    }

    /// Three independent in-memory partitions
    pub fn in_memory() -> Self {
        Self::from_stores(|_| Arc::new(MemoryDocumentStore::new()))
    }

    /// Connect every language partition concurrently; any failure aborts.
    pub async fn connect(manager: &DatabaseManager) -> Result<Self, DatabaseError> {
        let (am, or, en) = tokio::try_join!(
            connect_partition(manager, Language::Am),
            connect_partition(manager, Language::Or),
            connect_partition(manager, Language::En),
        )?;
        Ok(Self::new(am, or, en))
    }

    pub fn get(&self, language: Language) -> &Partition {
        match language {
            Language::Am => &self.am,
            Language::Or => &self.or,
            Language::En => &self.en,
        }
    }

    /// Resolve a path-supplied language code
    pub fn resolve(&self, code: &str) -> Result<&Partition, UnknownLanguage> {
        Ok(self.get(code.parse()?))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        [&self.am, &self.or, &self.en].into_iter()
    }
}

async fn connect_partition(
    manager: &DatabaseManager,
    language: Language,
) -> Result<Partition, DatabaseError> {
    let settings = manager.config().partitions.get(language);
    let pool = manager
        .partition_pool(&settings.name, settings.fallback_url.as_deref())
        .await?;
    let store = PgDocumentStore::new(settings.name.clone(), pool, manager.config());
    store.ensure_collections(&Collection::COURSE_CONTENT).await?;
    Ok(Partition::new(language, Arc::new(store)))
}

/// Store for the separate certificates database
pub async fn connect_certificates(
    manager: &DatabaseManager,
) -> Result<Arc<dyn DocumentStore>, DatabaseError> {
    let name = manager.config().certificates_db.clone();
    let pool = manager.partition_pool(&name, None).await?;
    let store = PgDocumentStore::new(name, pool, manager.config());
    store.ensure_collections(&[Collection::Certificates]).await?;
    Ok(Arc::new(store))
}
