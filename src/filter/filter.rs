use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, SqlParam, SqlResult, UID_FIELD};
use crate::database::store::Document;

/// Conditions understood by every document store. Postgres renders them to SQL,
/// the in-memory store evaluates them with [`DocumentFilter::matches`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    conditions: Vec<FilterOp>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl DocumentFilter {
    /// Matches every document in the collection
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_uid(uid: impl Into<String>) -> Self {
        Self {
            conditions: vec![FilterOp::UidEq(uid.into())],
            ..Default::default()
        }
    }

    /// Set-membership on `uid`. Duplicate ids collapse, an empty set matches nothing.
    pub fn uid_in<I, S>(uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for uid in uids {
            let uid = uid.into();
            if !unique.contains(&uid) {
                unique.push(uid);
            }
        }
        Self {
            conditions: vec![FilterOp::UidIn(unique)],
            ..Default::default()
        }
    }

    pub fn field_eq(mut self, field: &str, value: Value) -> Result<Self, FilterError> {
        Self::validate_field(field)?;
        let condition = match (field, value) {
            (UID_FIELD, Value::String(uid)) => FilterOp::UidEq(uid),
            (_, value) => FilterOp::FieldEq { field: field.to_string(), value },
        };
        self.conditions.push(condition);
        Ok(self)
    }

    pub fn limit(mut self, limit: i64, offset: Option<i64>) -> Result<Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn conditions(&self) -> &[FilterOp] {
        &self.conditions
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    /// True when the filter can never match, so stores may skip the round trip
    pub fn is_unsatisfiable(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| matches!(c, FilterOp::UidIn(uids) if uids.is_empty()))
            || self.limit == Some(0)
    }

    /// Evaluate the conditions against a document (limit and offset are not applied here)
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|condition| match condition {
            FilterOp::UidEq(uid) => document.uid() == Some(uid.as_str()),
            FilterOp::UidIn(uids) => document
                .uid()
                .map(|uid| uids.iter().any(|u| u == uid))
                .unwrap_or(false),
            FilterOp::FieldEq { field, value } => document.fields.get(field) == Some(value),
        })
    }

    /// Render a SELECT over a document table (`uid`, `doc`, `payload`, `created_at`)
    pub fn to_sql(&self, table_name: &str) -> Result<SqlResult, FilterError> {
        Self::validate_table_name(table_name)?;

        let mut params = Vec::new();
        let mut clauses = Vec::new();
        for condition in &self.conditions {
            match condition {
                FilterOp::UidEq(uid) => {
                    params.push(SqlParam::Text(uid.clone()));
                    clauses.push(format!("\"uid\" = ${}", params.len()));
                }
                FilterOp::UidIn(uids) => {
                    params.push(SqlParam::TextArray(uids.clone()));
                    clauses.push(format!("\"uid\" = ANY(${})", params.len()));
                }
                FilterOp::FieldEq { field, value } => {
                    Self::validate_field(field)?;
                    params.push(SqlParam::Json(value.clone()));
                    clauses.push(format!("\"doc\" -> '{}' = ${}", field, params.len()));
                }
            }
        }

        let query = [
            format!("SELECT \"uid\", \"doc\", \"payload\" FROM \"{}\"", table_name),
            if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            },
            "ORDER BY \"created_at\", \"uid\"".to_string(),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if !Self::is_identifier(name) {
            let message = format!("Invalid table name format: {}", name);
            return Err(FilterError::InvalidTableName(message));
        }
        Ok(())
    }

    fn validate_field(field: &str) -> Result<(), FilterError> {
        if !Self::is_identifier(field) {
            return Err(FilterError::InvalidField(format!("Invalid field name format: {}", field)));
        }
        Ok(())
    }

    fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn uid_in_renders_any_and_dedups() {
        let filter = DocumentFilter::uid_in(vec!["c1", "c2", "c1"]);
        let sql = filter.to_sql("courses").unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"uid\", \"doc\", \"payload\" FROM \"courses\" WHERE \"uid\" = ANY($1) ORDER BY \"created_at\", \"uid\""
        );
        assert_eq!(sql.params, vec![SqlParam::TextArray(vec!["c1".into(), "c2".into()])]);
    }

    #[test]
    fn field_filters_bind_jsonb_and_limit_is_inlined() {
        let filter = DocumentFilter::all()
            .field_eq("for", json!("course"))
            .unwrap()
            .limit(10, Some(20))
            .unwrap();
        let sql = filter.to_sql("images").unwrap();
        assert!(sql.query.contains("WHERE \"doc\" -> 'for' = $1"));
        assert!(sql.query.ends_with("LIMIT 10 OFFSET 20"));
        assert_eq!(sql.params, vec![SqlParam::Json(json!("course"))]);
    }

    #[test]
    fn rejects_unsafe_names() {
        assert!(DocumentFilter::all().field_eq("doc'; DROP", json!(1)).is_err());
        assert!(DocumentFilter::all().to_sql("images; --").is_err());
        assert!(DocumentFilter::all().limit(-1, None).is_err());
    }

    #[test]
    fn matches_evaluates_all_conditions() {
        let image = doc(json!({ "uid": "i1", "for": "course" }));
        assert!(DocumentFilter::by_uid("i1").matches(&image));
        assert!(DocumentFilter::uid_in(["x", "i1"]).matches(&image));
        assert!(!DocumentFilter::uid_in(Vec::<String>::new()).matches(&image));
        let by_field = DocumentFilter::all().field_eq("for", json!("program")).unwrap();
        assert!(!by_field.matches(&image));
    }

    #[test]
    fn empty_membership_is_unsatisfiable() {
        assert!(DocumentFilter::uid_in(Vec::<String>::new()).is_unsatisfiable());
        assert!(!DocumentFilter::uid_in(["a"]).is_unsatisfiable());
    }
}
