pub mod manager;
pub mod memory;
pub mod models;
pub mod partitions;
pub mod postgres;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryDocumentStore;
pub use partitions::{Partition, Partitions};
pub use postgres::PgDocumentStore;
pub use repository::{DocumentCollection, Repository};
pub use store::{Document, DocumentStore};
