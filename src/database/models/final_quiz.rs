use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Entity;
use crate::types::Collection;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalQuiz {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for FinalQuiz {
    const COLLECTION: Collection = Collection::FinalQuiz;
}
