use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Entity;
use crate::database::manager::DatabaseError;
use crate::database::store::Document;
use crate::types::Collection;

/// Wire name of the base64-encoded payload
pub const IMAGE_PAYLOAD_FIELD: &str = "coverImage";

/// Image metadata plus its raw bytes. The bytes travel beside the JSON fields,
/// never inside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

impl Entity for Image {
    const COLLECTION: Collection = Collection::Images;

    fn from_document(mut document: Document) -> Result<Self, DatabaseError> {
        document.fields.remove(IMAGE_PAYLOAD_FIELD);
        let payload = document.binary.take();
        let mut image: Image = serde_json::from_value(Value::Object(document.fields))
            .map_err(|e| DatabaseError::Decode(format!("{}: {}", Self::COLLECTION, e)))?;
        image.payload = payload;
        Ok(image)
    }

    fn into_document(mut self) -> Result<Document, DatabaseError> {
        let payload = self.payload.take();
        match serde_json::to_value(&self) {
            Ok(Value::Object(fields)) => Ok(Document::new(fields).with_binary(payload)),
            Ok(other) => Err(DatabaseError::Decode(format!(
                "image serialized to a non-object: {}",
                other
            ))),
            Err(e) => Err(DatabaseError::Decode(format!("{}: {}", Self::COLLECTION, e))),
        }
    }
}
