//! Vector index subsystem.
//!
//! Defines the [`VectorIndex`] trait the pipeline consumes (upsert, query,
//! stats), the vector and match types, and the metadata coercion boundary
//! that keeps outgoing metadata inside the store's type constraints. The
//! REST implementation lives in [`pinecone`]; the write and read pipelines
//! live in [`upsert`] and [`search`].

pub mod pinecone;
pub mod search;
pub mod upsert;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::types::Record;

/// Failures from the vector store.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector store request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("vector store returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Metadata attached to one vector.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single metadata value as the store accepts it: strings, numbers,
/// booleans, or homogeneous string lists. The pipeline itself only ever
/// writes `Text` and `List` (scalars are stringified on the way out), but
/// reads tolerate the full range so foreign namespaces stay queryable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// One vector as upserted into the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// One similarity match as returned by the store, best first.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Index-wide vector counts.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub total_vector_count: u64,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceStats {
    pub vector_count: u64,
}

/// Trait for the namespaced vector store behind the pipeline.
///
/// Upserts are idempotent by vector id (the store overwrites), queries
/// return matches in descending-similarity order. Implementations are
/// injected into the pipelines at construction so tests can substitute an
/// in-memory fake.
pub trait VectorIndex: Send + Sync {
    fn upsert(&self, vectors: &[VectorRecord], namespace: &str) -> Result<(), IndexError>;

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
        namespace: &str,
    ) -> Result<Vec<QueryMatch>, IndexError>;

    fn describe_stats(&self) -> Result<IndexStats, IndexError>;
}

/// Coerce one attribute value into a store-safe metadata value.
///
/// Scalars are kept as strings (numbers and booleans stringified), lists
/// survive only when every element is already a string, and nulls and
/// nested objects are dropped entirely rather than sent.
pub fn coerce_value(value: &serde_json::Value) -> Option<MetadataValue> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::String(s) => Some(MetadataValue::Text(s.clone())),
        Value::Bool(b) => Some(MetadataValue::Text(b.to_string())),
        Value::Number(n) => Some(MetadataValue::Text(n.to_string())),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(String::from))
            .collect::<Option<Vec<String>>>()
            .map(MetadataValue::List),
        Value::Object(_) => None,
    }
}

/// Store-safe metadata for a record: every present attribute coerced via
/// [`coerce_value`], keyed by its attribute name. Identity fields are
/// included so query results can be deduplicated by identifier.
pub fn record_metadata(record: &Record) -> Metadata {
    let mut metadata = Metadata::new();
    let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(record) else {
        return metadata;
    };
    for (key, value) in fields {
        if let Some(coerced) = coerce_value(&value) {
            metadata.insert(key, coerced);
        }
    }
    metadata
}
