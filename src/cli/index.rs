use anyhow::{Context, Result};
use std::path::Path;

use crate::catalog::checkpoint::write_error_report;
use crate::config::PictovecConfig;
use crate::index::upsert::{upsert_all, UpsertConfig};
use crate::index::VectorIndex;

/// Embed an enriched catalog and upsert it into the vector store.
pub fn index(config: &PictovecConfig, input: &Path) -> Result<()> {
    let loaded = super::load_catalog(input)?;
    if !loaded.malformed.is_empty() {
        eprintln!(
            "Warning: {} malformed record(s) ignored",
            loaded.malformed.len()
        );
    }

    let embedder = super::openai_embedder(config)?;
    let store = super::pinecone_index(config)?;

    println!(
        "Indexing {} record(s) into namespace '{}'",
        loaded.records.len(),
        config.index.namespace
    );

    let summary = upsert_all(
        &loaded.records,
        &embedder,
        &store,
        &UpsertConfig {
            namespace: config.index.namespace.clone(),
            batch_size: config.index.upsert_batch_size,
        },
    );

    if !summary.failures.is_empty() {
        if let Some(report) = config.index.error_report_path() {
            write_error_report(&report, &summary.failures)
                .with_context(|| format!("failed to write error report: {}", report.display()))?;
            println!(
                "Wrote {} failure(s) to {}",
                summary.failures.len(),
                report.display()
            );
        }
    }

    println!("Indexing complete:");
    println!(
        "  Records embedded:  {}/{}",
        summary.records_embedded, summary.records_total
    );
    println!(
        "  Vectors upserted:  {} in {} flush(es)",
        summary.vectors_upserted, summary.flushes
    );

    // Post-run count so a truncated upsert is visible immediately
    match store.describe_stats() {
        Ok(stats) => {
            let count = stats
                .namespaces
                .get(&config.index.namespace)
                .map(|n| n.vector_count)
                .unwrap_or(0);
            println!(
                "  Namespace '{}' now holds {count} vector(s)",
                config.index.namespace
            );
        }
        Err(err) => eprintln!("Warning: could not read index stats: {err}"),
    }

    Ok(())
}
