#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use pictovec::catalog::types::Record;
use pictovec::embedding::{EmbeddingError, EmbeddingProvider};
use pictovec::enrich::{EnrichError, EnrichmentModel, EnrichmentResult};
use pictovec::index::{
    IndexError, IndexStats, Metadata, NamespaceStats, QueryMatch, VectorIndex, VectorRecord,
};

/// A catalog record straight from an input file: identifier plus raw names.
pub fn record(identifier: &str, names: &[&str]) -> Record {
    Record::new(identifier, names.iter().map(|n| n.to_string()).collect())
}

/// A record as it looks after enrichment.
pub fn enriched_record(identifier: &str, name: &str, category: &str) -> Record {
    let mut record = record(identifier, &[name]);
    record.definition = Some(format!("{name} es un plato tradicional."));
    record.category = Some(category.to_string());
    record
}

/// A model result that fills a couple of attributes.
pub fn result_with(definition: &str, category: &str) -> EnrichmentResult {
    EnrichmentResult {
        definition: Some(definition.to_string()),
        category: Some(category.to_string()),
        ..EnrichmentResult::default()
    }
}

/// Scripted enrichment model. Pops one scripted response per call and logs
/// the names it was asked about; once the script runs out it answers with an
/// empty (valid) list.
pub struct FakeModel {
    responses: Mutex<VecDeque<Result<Vec<EnrichmentResult>, EnrichError>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeModel {
    pub fn new(responses: Vec<Result<Vec<EnrichmentResult>, EnrichError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl EnrichmentModel for FakeModel {
    fn enrich_batch(&self, names: &[String]) -> Result<Vec<EnrichmentResult>, EnrichError> {
        self.calls.lock().unwrap().push(names.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Delegating handle so a test can keep its [`FakeModel`] while the engine
/// owns the boxed trait object.
pub struct SharedModel(pub Arc<FakeModel>);

impl EnrichmentModel for SharedModel {
    fn enrich_batch(&self, names: &[String]) -> Result<Vec<EnrichmentResult>, EnrichError> {
        self.0.enrich_batch(names)
    }
}

/// Deterministic unit vector derived from the text bytes. Equal texts embed
/// equal; different texts almost surely point elsewhere.
pub fn embedding_for(text: &str, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    for (i, b) in text.bytes().enumerate() {
        v[i % dim] += (b as f32) / 255.0;
    }
    normalize(&mut v);
    v
}

pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Embedder producing deterministic 8-dim vectors from the text.
pub struct FakeEmbedder {
    pub dim: usize,
    fail_on: Option<String>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            dim: 8,
            fail_on: None,
        }
    }

    /// Fail any embed whose text contains `needle`.
    pub fn failing_on(needle: &str) -> Self {
        Self {
            dim: 8,
            fail_on: Some(needle.to_string()),
        }
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(needle) = &self.fail_on {
            if text.contains(needle) {
                return Err(EmbeddingError::Api {
                    status: 429,
                    body: "rate limited".into(),
                });
            }
        }
        Ok(embedding_for(text, self.dim))
    }
}

/// In-memory stand-in for the vector store: namespaced id -> vector maps,
/// cosine-ranked queries, and a log of upsert batch sizes.
#[derive(Default)]
pub struct InMemoryIndex {
    vectors: Mutex<BTreeMap<String, BTreeMap<String, VectorRecord>>>,
    upsert_sizes: Mutex<Vec<usize>>,
    fail_upserts: bool,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_upserts: true,
            ..Self::default()
        }
    }

    pub fn upsert_sizes(&self) -> Vec<usize> {
        self.upsert_sizes.lock().unwrap().clone()
    }

    pub fn ids_in(&self, namespace: &str) -> Vec<String> {
        self.vectors
            .lock()
            .unwrap()
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, namespace: &str, id: &str) -> Option<VectorRecord> {
        self.vectors
            .lock()
            .unwrap()
            .get(namespace)
            .and_then(|ns| ns.get(id))
            .cloned()
    }

    /// Seed a vector directly, bypassing the embedding pipeline.
    pub fn seed(&self, namespace: &str, id: &str, values: Vec<f32>, metadata: Metadata) {
        self.vectors
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .insert(
                id.to_string(),
                VectorRecord {
                    id: id.to_string(),
                    values,
                    metadata,
                },
            );
    }
}

impl VectorIndex for InMemoryIndex {
    fn upsert(&self, vectors: &[VectorRecord], namespace: &str) -> Result<(), IndexError> {
        self.upsert_sizes.lock().unwrap().push(vectors.len());
        if self.fail_upserts {
            return Err(IndexError::Api {
                status: 503,
                body: "store unavailable".into(),
            });
        }
        let mut map = self.vectors.lock().unwrap();
        let ns = map.entry(namespace.to_string()).or_default();
        for vector in vectors {
            ns.insert(vector.id.clone(), vector.clone());
        }
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
        namespace: &str,
    ) -> Result<Vec<QueryMatch>, IndexError> {
        let map = self.vectors.lock().unwrap();
        let mut matches: Vec<QueryMatch> = map
            .get(namespace)
            .into_iter()
            .flat_map(|ns| ns.values())
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine(vector, &record.values),
                metadata: if include_metadata {
                    record.metadata.clone()
                } else {
                    Metadata::new()
                },
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    fn describe_stats(&self) -> Result<IndexStats, IndexError> {
        let map = self.vectors.lock().unwrap();
        let mut stats = IndexStats::default();
        for (name, ns) in map.iter() {
            stats.total_vector_count += ns.len() as u64;
            stats.namespaces.insert(
                name.clone(),
                NamespaceStats {
                    vector_count: ns.len() as u64,
                },
            );
        }
        Ok(stats)
    }
}
