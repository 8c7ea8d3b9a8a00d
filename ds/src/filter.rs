//! Query filters evaluated against top-level document fields

use std::cmp::Ordering;

use serde_json::Value;

use crate::Document;

/// Comparison operator for a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A typed value to compare a document field against
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for IndexValue {
    fn from(s: &str) -> Self {
        IndexValue::String(s.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(s: String) -> Self {
        IndexValue::String(s)
    }
}

impl From<i64> for IndexValue {
    fn from(v: i64) -> Self {
        IndexValue::Int(v)
    }
}

impl From<bool> for IndexValue {
    fn from(v: bool) -> Self {
        IndexValue::Bool(v)
    }
}

/// A single field condition. A list of filters is a conjunction.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: IndexValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality filter
    pub fn eq(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Check a document against this filter.
    ///
    /// A missing field or a type mismatch is incomparable: it satisfies `Ne`
    /// and nothing else.
    pub fn matches(&self, doc: &Document) -> bool {
        let ordering = doc.get(&self.field).and_then(|field| compare(field, &self.value));
        match (self.op, ordering) {
            (FilterOp::Ne, None) => true,
            (_, None) => false,
            (FilterOp::Eq, Some(ord)) => ord == Ordering::Equal,
            (FilterOp::Ne, Some(ord)) => ord != Ordering::Equal,
            (FilterOp::Gt, Some(ord)) => ord == Ordering::Greater,
            (FilterOp::Gte, Some(ord)) => ord != Ordering::Less,
            (FilterOp::Lt, Some(ord)) => ord == Ordering::Less,
            (FilterOp::Lte, Some(ord)) => ord != Ordering::Greater,
        }
    }
}

/// Check a document against every filter
pub(crate) fn matches_all(doc: &Document, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(doc))
}

fn compare(field: &Value, value: &IndexValue) -> Option<Ordering> {
    match (field, value) {
        (Value::String(a), IndexValue::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Number(n), IndexValue::Int(b)) => match n.as_i64() {
            Some(a) => Some(a.cmp(b)),
            None => n.as_f64().and_then(|a| a.partial_cmp(&(*b as f64))),
        },
        (Value::Bool(a), IndexValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
