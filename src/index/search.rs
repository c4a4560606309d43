//! Semantic search over the indexed catalog.
//!
//! Wraps the raw query in a domain-context sentence (tunable), embeds it,
//! queries the store, and collapses name-variant matches so each catalog
//! record appears once, at its best rank.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::index::{IndexError, Metadata, MetadataValue, VectorIndex};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Tunables for one search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub namespace: String,
    pub top_k: usize,
    /// Wrap the raw query in the gastronomic-context template before
    /// embedding. Raw queries like "roll" embed poorly on their own.
    pub rewrite_query: bool,
}

/// One deduplicated search result. Order follows the store's ranking.
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub identifier: String,
    pub score: f32,
    pub metadata: Metadata,
}

/// The domain-context sentence a raw query is embedded as.
pub fn rewrite_query(query: &str) -> String {
    format!("Plato o postre gastronómico: {query}. Buscar equivalentes y similares.")
}

/// Search the namespace for records similar to `query`.
pub fn search(
    query: &str,
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    options: &SearchOptions,
) -> Result<Vec<RankedResult>, SearchError> {
    // 1. Optionally anchor the query in the catalog's domain.
    let effective = if options.rewrite_query {
        rewrite_query(query)
    } else {
        query.to_string()
    };
    debug!(query = %effective, "embedding search query");

    // 2. Embed and query, metadata included for dedup and display.
    let vector = embedder.embed(&effective)?;
    let matches = index.query(&vector, options.top_k, true, &options.namespace)?;

    // 3. Collapse name variants: the first (best-ranked) hit per identifier wins.
    let mut seen: HashSet<String> = HashSet::new();
    let mut results = Vec::new();
    for m in matches {
        let identifier = m
            .metadata
            .get("identifier")
            .and_then(MetadataValue::as_text)
            .map(str::to_owned)
            .unwrap_or_else(|| base_identifier(&m.id));
        if seen.insert(identifier.clone()) {
            results.push(RankedResult {
                identifier,
                score: m.score,
                metadata: m.metadata,
            });
        } else {
            debug!(identifier = %identifier, score = m.score, "variant match collapsed");
        }
    }
    Ok(results)
}

/// Fallback when a match carries no identifier metadata: strip the name
/// variant suffix from its vector id.
fn base_identifier(vector_id: &str) -> String {
    if let Some((base, suffix)) = vector_id.rsplit_once("_name_") {
        if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
            return base.to_string();
        }
    }
    vector_id.to_string()
}
