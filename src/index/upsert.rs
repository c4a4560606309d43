//! Vectorization pipeline: records in, vectors in the store out.
//!
//! Every record produces one vector for its composed document text plus one
//! per raw name, all sharing the record's metadata. Vectors are buffered
//! and flushed in batches. A record whose embedding fails, or a batch whose
//! flush fails, is recorded for the error report and never aborts the run.

use std::collections::BTreeSet;

use serde_json::json;
use tracing::{error, info, warn};

use crate::catalog::checkpoint::FailureEntry;
use crate::catalog::types::Record;
use crate::embedding::text::build_text;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::index::{record_metadata, VectorIndex, VectorRecord};

/// Tunables for one vectorization run.
#[derive(Debug, Clone)]
pub struct UpsertConfig {
    /// Namespace every vector is written into.
    pub namespace: String,
    /// Buffered vectors per upsert call.
    pub batch_size: usize,
}

/// What one vectorization run did.
#[derive(Debug, Default)]
pub struct UpsertSummary {
    pub records_total: usize,
    pub records_embedded: usize,
    pub vectors_upserted: usize,
    pub flushes: usize,
    /// Records that failed to embed plus per-identifier entries for every
    /// flush that the store rejected. Written to the error report by the
    /// caller.
    pub failures: Vec<FailureEntry>,
}

/// Vector id for the i-th raw name of a record. The document vector uses
/// the bare identifier.
pub fn name_variant_id(identifier: &str, i: usize) -> String {
    format!("{identifier}_name_{i}")
}

/// Embed and upsert every record into `config.namespace`.
pub fn upsert_all(
    records: &[Record],
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    config: &UpsertConfig,
) -> UpsertSummary {
    let batch_size = config.batch_size.max(1);
    let mut summary = UpsertSummary {
        records_total: records.len(),
        ..UpsertSummary::default()
    };
    let mut buffer: Vec<VectorRecord> = Vec::new();

    info!(
        records = records.len(),
        namespace = %config.namespace,
        "vectorizing catalog"
    );

    for record in records {
        // 1. Embed the record's document text and each raw name.
        let vectors = match vectors_for_record(record, embedder) {
            Ok(vectors) => vectors,
            Err(err) => {
                warn!(
                    identifier = %record.identifier,
                    error = %err,
                    "embedding failed, record goes to the error report"
                );
                summary.failures.push(FailureEntry {
                    record: serde_json::to_value(record).unwrap_or_else(|_| json!(null)),
                    error_message: err.to_string(),
                });
                continue;
            }
        };
        summary.records_embedded += 1;

        // 2. Buffer the vectors, flushing whenever a full batch accumulates.
        for vector in vectors {
            buffer.push(vector);
            if buffer.len() >= batch_size {
                flush(&mut buffer, index, &config.namespace, &mut summary);
            }
        }
    }

    // 3. Flush whatever remains.
    flush(&mut buffer, index, &config.namespace, &mut summary);

    info!(
        records = summary.records_embedded,
        vectors = summary.vectors_upserted,
        failures = summary.failures.len(),
        "vectorization finished"
    );
    summary
}

/// All vectors for one record: the composed document text first, then one
/// per raw name, every one carrying the same metadata.
fn vectors_for_record(
    record: &Record,
    embedder: &dyn EmbeddingProvider,
) -> Result<Vec<VectorRecord>, EmbeddingError> {
    let mut texts: Vec<String> = vec![build_text(record)];
    texts.extend(record.names.iter().cloned());
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();

    let embeddings = embedder.embed_batch(&text_refs)?;
    let metadata = record_metadata(record);

    Ok(embeddings
        .into_iter()
        .enumerate()
        .map(|(i, values)| {
            let id = if i == 0 {
                record.identifier.clone()
            } else {
                name_variant_id(&record.identifier, i - 1)
            };
            VectorRecord {
                id,
                values,
                metadata: metadata.clone(),
            }
        })
        .collect())
}

/// Upsert the buffered vectors and clear the buffer. On failure every
/// affected identifier is recorded once and the run keeps going.
fn flush(
    buffer: &mut Vec<VectorRecord>,
    index: &dyn VectorIndex,
    namespace: &str,
    summary: &mut UpsertSummary,
) {
    if buffer.is_empty() {
        return;
    }
    match index.upsert(buffer, namespace) {
        Ok(()) => {
            summary.vectors_upserted += buffer.len();
            summary.flushes += 1;
            info!(vectors = buffer.len(), "flushed vector batch");
        }
        Err(err) => {
            error!(
                vectors = buffer.len(),
                error = %err,
                "vector batch rejected, affected identifiers go to the error report"
            );
            let identifiers: BTreeSet<&str> = buffer
                .iter()
                .map(|vector| {
                    vector
                        .metadata
                        .get("identifier")
                        .and_then(|value| value.as_text())
                        .unwrap_or(vector.id.as_str())
                })
                .collect();
            for identifier in identifiers {
                summary.failures.push(FailureEntry {
                    record: json!({ "identifier": identifier }),
                    error_message: err.to_string(),
                });
            }
        }
    }
    buffer.clear();
}
