use std::collections::HashMap;

use serde_json::Value;

use crate::app::AppState;
use crate::database::repository::DocumentCollection;
use crate::error::ApiError;
use crate::filter::DocumentFilter;
use crate::types::ResourceKind;

/// Resolve `:lang` and `:resource` path segments into a collection handle
pub fn resolve_collection(
    state: &AppState,
    lang: &str,
    resource: &str,
) -> Result<(ResourceKind, DocumentCollection), ApiError> {
    let partition = state.partitions.resolve(lang)?;
    let kind: ResourceKind = resource.parse()?;
    Ok((kind, partition.documents(kind)))
}

/// Build a list filter from the query string: `limit`/`offset` page the
/// result, every other parameter is a string-equality condition.
pub fn list_filter(
    query: &HashMap<String, String>,
    max_limit: i64,
) -> Result<DocumentFilter, ApiError> {
    let mut filter = DocumentFilter::all();
    let mut keys: Vec<&String> = query.keys().collect();
    keys.sort();

    for key in keys {
        if key == "limit" || key == "offset" {
            continue;
        }
        filter = filter.field_eq(key, Value::String(query[key].clone()))?;
    }

    let limit = parse_page_param(query, "limit")?.unwrap_or(max_limit).min(max_limit);
    let offset = parse_page_param(query, "offset")?;
    Ok(filter.limit(limit, offset)?)
}

fn parse_page_param(query: &HashMap<String, String>, name: &str) -> Result<Option<i64>, ApiError> {
    match query.get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| {
                ApiError::field_error("Invalid query parameter", name, "Must be an integer")
            }),
    }
}
