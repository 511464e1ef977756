use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::references::{referenced_uids, ReferenceSet};
use super::Entity;
use crate::types::Collection;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_index: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_ids: Option<ReferenceSet>,
    /// uid of an image in the same partition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Course {
    pub fn module_uids(&self) -> Vec<String> {
        referenced_uids(self.module_ids.as_ref())
    }
}

impl Entity for Course {
    const COLLECTION: Collection = Collection::Courses;
}
