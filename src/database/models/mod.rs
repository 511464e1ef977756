pub mod certificate;
pub mod course;
pub mod final_quiz;
pub mod image;
pub mod module;
pub mod program;
pub mod references;

pub use certificate::Certificate;
pub use course::Course;
pub use final_quiz::FinalQuiz;
pub use image::Image;
pub use module::Module;
pub use program::Program;
pub use references::ReferenceSet;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::database::manager::DatabaseError;
use crate::database::store::Document;
use crate::types::Collection;

/// A typed view over the documents of one collection
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn from_document(document: Document) -> Result<Self, DatabaseError> {
        serde_json::from_value(Value::Object(document.fields))
            .map_err(|e| DatabaseError::Decode(format!("{}: {}", Self::COLLECTION, e)))
    }

    fn into_document(self) -> Result<Document, DatabaseError> {
        match serde_json::to_value(&self) {
            Ok(Value::Object(fields)) => Ok(Document::new(fields)),
            Ok(other) => Err(DatabaseError::Decode(format!(
                "{} serialized to a non-object: {}",
                Self::COLLECTION,
                other
            ))),
            Err(e) => Err(DatabaseError::Decode(format!("{}: {}", Self::COLLECTION, e))),
        }
    }
}
