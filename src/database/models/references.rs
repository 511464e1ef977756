use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored reference set such as `courses_ids` or `module_ids`.
///
/// Stored as a mapping whose values are uids; keys carry no meaning. Arrays of
/// uids are accepted too. The raw value is kept so documents round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceSet(pub Value);

impl ReferenceSet {
    /// Referenced uids in first-seen order, duplicates and non-strings dropped
    pub fn uids(&self) -> Vec<String> {
        let candidates: Box<dyn Iterator<Item = &Value>> = match &self.0 {
            Value::Object(map) => Box::new(map.values()),
            Value::Array(items) => Box::new(items.iter()),
            _ => Box::new(std::iter::empty()),
        };

        let mut uids: Vec<String> = Vec::new();
        for uid in candidates.filter_map(Value::as_str) {
            if !uid.is_empty() && !uids.iter().any(|u| u == uid) {
                uids.push(uid.to_string());
            }
        }
        uids
    }
}

/// Uids of an optional reference set; a missing field is the empty set
pub fn referenced_uids(set: Option<&ReferenceSet>) -> Vec<String> {
    set.map(ReferenceSet::uids).unwrap_or_default()
}
