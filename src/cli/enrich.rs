use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

use crate::catalog::checkpoint::{write_error_report, CheckpointStore};
use crate::config::PictovecConfig;
use crate::enrich::engine::{EngineConfig, EnrichmentEngine};
use crate::enrich::openai::OpenAiEnrichment;

/// Enrich a catalog file, resuming from whatever the output already holds.
pub fn enrich(config: &PictovecConfig, input: &Path, output: &Path, fresh: bool) -> Result<()> {
    let api_key = super::require_env("OPENAI_API_KEY")?;

    if fresh && output.exists() {
        let same_file = std::fs::canonicalize(input)
            .ok()
            .zip(std::fs::canonicalize(output).ok())
            .is_some_and(|(a, b)| a == b);
        anyhow::ensure!(
            !same_file,
            "refusing --fresh when input and output are the same file"
        );
        std::fs::remove_file(output)
            .with_context(|| format!("failed to remove previous output: {}", output.display()))?;
        println!("Discarded previous progress in {}", output.display());
    }

    let loaded = super::load_catalog(input)?;
    println!(
        "Enriching {} record(s) from {} into {}",
        loaded.records.len(),
        input.display(),
        output.display()
    );

    let model = OpenAiEnrichment::new(&config.model, &api_key)?;
    let engine = EnrichmentEngine::new(
        Box::new(model),
        CheckpointStore::new(output),
        EngineConfig {
            batch_size: config.enrichment.batch_size,
            max_attempts: config.enrichment.max_attempts,
            pacing: Duration::from_secs(config.enrichment.pacing_secs),
            checkpoint_interval: config.enrichment.checkpoint_interval,
        },
    );

    let summary = engine
        .run(loaded.records)
        .context("enrichment run failed")?;

    if !loaded.malformed.is_empty() {
        if let Some(report) = config.enrichment.error_report_path() {
            write_error_report(&report, &loaded.malformed)
                .with_context(|| format!("failed to write error report: {}", report.display()))?;
            println!(
                "Wrote {} malformed record(s) to {}",
                loaded.malformed.len(),
                report.display()
            );
        }
    }

    println!("Enrichment complete:");
    println!("  Input records:      {}", summary.total_input);
    println!("  Already enriched:   {}", summary.already_enriched);
    println!("  Processed this run: {}", summary.processed);
    println!("  Batches merged:     {}", summary.merged_batches);
    if summary.skipped_batches > 0 {
        println!("  Batches skipped:    {}", summary.skipped_batches);
    }
    if summary.unfilled_records > 0 {
        println!("  Records unfilled:   {}", summary.unfilled_records);
    }
    if !loaded.malformed.is_empty() {
        println!("  Malformed dropped:  {}", loaded.malformed.len());
    }

    Ok(())
}
