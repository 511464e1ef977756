use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::references::{referenced_uids, ReferenceSet};
use super::Entity;
use crate::types::Collection;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses_ids: Option<ReferenceSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_quiz_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_index: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Program {
    pub fn course_uids(&self) -> Vec<String> {
        referenced_uids(self.courses_ids.as_ref())
    }

    /// The final quiz reference, treating an empty string as absent
    pub fn final_quiz_uid(&self) -> Option<&str> {
        self.final_quiz_id.as_deref().filter(|uid| !uid.is_empty())
    }
}

impl Entity for Program {
    const COLLECTION: Collection = Collection::Programs;
}
