use serde_json::Value;

/// Name of the identifier field every document carries
pub const UID_FIELD: &str = "uid";

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// `uid = $n`
    UidEq(String),
    /// `uid = ANY($n)`, the fan-out set-membership query
    UidIn(Vec<String>),
    /// Equality on a top-level document field
    FieldEq { field: String, value: Value },
}

/// Bound parameter for a generated statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
    Json(Value),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
