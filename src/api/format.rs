//! Wire format for stored documents and the binary asset encoder.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;
use crate::database::models::image::IMAGE_PAYLOAD_FIELD;
use crate::database::models::{Course, Entity, FinalQuiz, Image, Module, Program};
use crate::database::store::Document;
use crate::filter::UID_FIELD;
use crate::types::ResourceKind;

/// Errors turning API input into a storable document
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RecordError {
    #[error("Expected a JSON object")]
    NotAnObject,
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("Field '{field}' must be {expected}")]
    InvalidField { field: &'static str, expected: &'static str },
    #[error("Invalid base64 payload in '{0}'")]
    InvalidPayload(&'static str),
    #[error("Body uid '{body}' does not match path uid '{path}'")]
    UidMismatch { body: String, path: String },
    #[error("Malformed {kind} document: {reason}")]
    Malformed { kind: ResourceKind, reason: String },
}

/// Binary payload to transport text
pub fn encode_binary(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_binary(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text.trim())
}

/// Convert a stored document into its public JSON form.
/// Images expose their payload base64-encoded under `coverImage` (null when absent).
pub fn document_to_api_value(kind: ResourceKind, document: &Document) -> Value {
    let mut obj = document.fields.clone();
    if kind == ResourceKind::Images {
        let encoded = document
            .binary
            .as_deref()
            .map(|bytes| Value::String(encode_binary(bytes)))
            .unwrap_or(Value::Null);
        obj.insert(IMAGE_PAYLOAD_FIELD.to_string(), encoded);
    }
    Value::Object(obj)
}

pub fn documents_to_api_values(kind: ResourceKind, documents: &[Document]) -> Vec<Value> {
    documents.iter().map(|doc| document_to_api_value(kind, doc)).collect()
}

/// Parse an API body into a document for `kind`.
///
/// A non-empty string `uid` is required. Image bodies may carry a base64
/// `coverImage`, which becomes the binary payload; `created_at` defaults to now.
/// The result must decode as the typed model the assembler reads.
pub fn document_from_api_input(kind: ResourceKind, input: Value) -> Result<Document, RecordError> {
    let document = untyped_document(kind, input)?;
    check_shape(kind, &document)?;
    Ok(document)
}

fn untyped_document(kind: ResourceKind, input: Value) -> Result<Document, RecordError> {
    let Value::Object(mut fields) = input else {
        return Err(RecordError::NotAnObject);
    };

    match fields.get(UID_FIELD) {
        None | Some(Value::Null) => return Err(RecordError::MissingRequiredField(UID_FIELD)),
        Some(Value::String(uid)) if !uid.trim().is_empty() => {}
        Some(_) => {
            return Err(RecordError::InvalidField {
                field: UID_FIELD,
                expected: "a non-empty string",
            })
        }
    }

    if kind != ResourceKind::Images {
        return Ok(Document::new(fields));
    }

    let binary = match fields.remove(IMAGE_PAYLOAD_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(encoded)) => Some(
            decode_binary(&encoded).map_err(|_| RecordError::InvalidPayload(IMAGE_PAYLOAD_FIELD))?,
        ),
        Some(_) => {
            return Err(RecordError::InvalidField {
                field: IMAGE_PAYLOAD_FIELD,
                expected: "a base64 string",
            })
        }
    };
    fields
        .entry("created_at")
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

    Ok(Document::new(fields).with_binary(binary))
}

fn check_shape(kind: ResourceKind, document: &Document) -> Result<(), RecordError> {
    let document = document.clone();
    let decoded = match kind {
        ResourceKind::Programs => Program::from_document(document).map(drop),
        ResourceKind::Courses => Course::from_document(document).map(drop),
        ResourceKind::Modules => Module::from_document(document).map(drop),
        ResourceKind::FinalQuiz => FinalQuiz::from_document(document).map(drop),
        ResourceKind::Images => Image::from_document(document).map(drop),
    };
    decoded.map_err(|e| {
        let reason = match e {
            DatabaseError::Decode(msg) => msg,
            other => other.to_string(),
        };
        RecordError::Malformed { kind, reason }
    })
}

/// Like [`document_from_api_input`], for replacing the document stored under `path_uid`.
/// A missing body uid is taken from the path.
pub fn replacement_from_api_input(
    kind: ResourceKind,
    path_uid: &str,
    input: Value,
) -> Result<Document, RecordError> {
    let mut fields: Map<String, Value> = match input {
        Value::Object(fields) => fields,
        _ => return Err(RecordError::NotAnObject),
    };

    match fields.get(UID_FIELD) {
        None | Some(Value::Null) => {
            fields.insert(UID_FIELD.to_string(), Value::String(path_uid.to_string()));
        }
        Some(Value::String(body)) if body == path_uid => {}
        Some(other) => {
            return Err(RecordError::UidMismatch {
                body: other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string()),
                path: path_uid.to_string(),
            })
        }
    }

    document_from_api_input(kind, Value::Object(fields))
}
