use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::types::{Collection, Language};

/// An issued completion certificate. `uid` is the certificate id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub uid: String,
    pub user_name: String,
    pub course_title: String,
    pub score: f64,
    pub issued_at: DateTime<Utc>,
    pub verification_url: String,
    pub lang: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl Entity for Certificate {
    const COLLECTION: Collection = Collection::Certificates;
}
