//! Batch enrichment engine.
//!
//! Drives the per-batch lifecycle `PENDING -> IN_FLIGHT -> {MERGED | SKIPPED}`:
//! partitions pending records into contiguous batches, calls the injected
//! [`EnrichmentModel`] with bounded retries, merges results positionally while
//! protecting identity fields, and checkpoints the accumulated record list to
//! the output file at interval boundaries. A rerun loads the checkpoint and
//! only batches records whose identifiers are not in it, so interrupted runs
//! pick up where they left off.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::catalog::checkpoint::{CheckpointError, CheckpointStore};
use crate::catalog::types::Record;
use crate::enrich::{EnrichmentModel, EnrichmentResult};

/// Engine tuning knobs. Defaults match the catalog sizes and rate limits this
/// pipeline was built for.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Records per model call.
    pub batch_size: usize,
    /// Model call attempts per batch before the batch is skipped.
    pub max_attempts: u32,
    /// Delay between successful batches; doubled while retrying.
    pub pacing: Duration,
    /// Checkpoint after this many processed records (and always at the end).
    pub checkpoint_interval: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_attempts: 3,
            pacing: Duration::from_secs(2),
            checkpoint_interval: 20,
        }
    }
}

/// Counters describing one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records in the input file.
    pub total_input: usize,
    /// Input records already present in the checkpoint and skipped.
    pub already_enriched: usize,
    /// Records dropped because they have no usable name.
    pub malformed: usize,
    /// Records whose batch completed this run (merged or skipped).
    pub processed: usize,
    pub merged_batches: usize,
    /// Batches abandoned after exhausting retries.
    pub skipped_batches: usize,
    /// Model results beyond the batch length, discarded.
    pub extra_results: usize,
    /// Records left unenriched because the model under-filled their batch.
    pub unfilled_records: usize,
}

struct MergeReport {
    applied: usize,
    extra: usize,
    missing: usize,
}

pub struct EnrichmentEngine {
    model: Box<dyn EnrichmentModel>,
    checkpoint: CheckpointStore,
    config: EngineConfig,
}

impl EnrichmentEngine {
    pub fn new(
        model: Box<dyn EnrichmentModel>,
        checkpoint: CheckpointStore,
        config: EngineConfig,
    ) -> Self {
        Self {
            model,
            checkpoint,
            config,
        }
    }

    /// Enrich every pending input record, checkpointing along the way.
    ///
    /// Returns counters for the run; fails only on checkpoint I/O, which has
    /// no safe continuation.
    pub fn run(&self, input: Vec<Record>) -> Result<RunSummary, CheckpointError> {
        let batch_size = self.config.batch_size.max(1);
        let interval = self.config.checkpoint_interval.max(1);

        let mut summary = RunSummary {
            total_input: input.len(),
            ..RunSummary::default()
        };

        // 1. Load previous progress and compute the pending set
        let existing = self.checkpoint.load_or_default()?;
        let done: HashSet<String> = existing.iter().map(|r| r.identifier.clone()).collect();

        // 2. Validate pending records; the prompt needs a primary name
        let mut pending = Vec::new();
        let mut names = Vec::new();
        for record in input {
            if done.contains(&record.identifier) {
                summary.already_enriched += 1;
                continue;
            }
            match record.primary_name() {
                Ok(primary) => {
                    names.push(primary);
                    pending.push(record);
                }
                Err(err) => {
                    warn!(identifier = %record.identifier, error = %err, "skipping malformed record");
                    summary.malformed += 1;
                }
            }
        }

        let total_pending = pending.len();
        if total_pending == 0 {
            info!(
                already_enriched = summary.already_enriched,
                "nothing to enrich"
            );
            return Ok(summary);
        }
        info!(
            pending = total_pending,
            already_enriched = summary.already_enriched,
            batch_size,
            "starting enrichment run"
        );

        let mut batch_start = 0;
        while batch_start < total_pending {
            let batch_end = (batch_start + batch_size).min(total_pending);
            let batch_index = batch_start / batch_size;

            // 3. Call the model, retrying on failure
            let mut merged = false;
            match self.enrich_with_retries(&names[batch_start..batch_end], batch_index) {
                Some(results) => {
                    // 4. Positional merge, identity fields protected
                    let report = merge_batch(&mut pending[batch_start..batch_end], results);
                    if report.extra > 0 {
                        warn!(
                            batch = batch_index,
                            extra = report.extra,
                            "more results than batch entries, discarding extras"
                        );
                        summary.extra_results += report.extra;
                    }
                    if report.missing > 0 {
                        warn!(
                            batch = batch_index,
                            returned = report.applied,
                            expected = batch_end - batch_start,
                            "model under-filled the batch, trailing records left unenriched"
                        );
                        summary.unfilled_records += report.missing;
                    }
                    summary.merged_batches += 1;
                    merged = true;
                    info!(
                        batch = batch_index,
                        records = report.applied,
                        "batch merged"
                    );
                }
                None => {
                    summary.skipped_batches += 1;
                    info!(
                        batch = batch_index,
                        identifiers = ?pending[batch_start..batch_end]
                            .iter()
                            .map(|r| r.identifier.as_str())
                            .collect::<Vec<_>>(),
                        "batch skipped, records kept unenriched"
                    );
                }
            }
            summary.processed = batch_end;

            // 5. Checkpoint when the processed count crosses an interval
            //    boundary, and always at the end of input
            let crossed_interval = batch_end / interval > batch_start / interval;
            let at_end = batch_end == total_pending;
            if crossed_interval || at_end {
                self.checkpoint
                    .save(existing.iter().chain(pending[..batch_end].iter()))?;
                info!(
                    records = existing.len() + batch_end,
                    path = %self.checkpoint.path().display(),
                    "checkpoint written"
                );
            }

            // 6. Pace between successful batches; a skipped batch moves on
            //    immediately
            if merged && !at_end && !self.config.pacing.is_zero() {
                thread::sleep(self.config.pacing);
            }
            batch_start = batch_end;
        }

        info!(
            processed = summary.processed,
            already_enriched = summary.already_enriched,
            merged_batches = summary.merged_batches,
            skipped_batches = summary.skipped_batches,
            unfilled_records = summary.unfilled_records,
            "enrichment run finished"
        );
        Ok(summary)
    }

    /// One batch's worth of model calls. `None` after `max_attempts` failures.
    fn enrich_with_retries(
        &self,
        names: &[String],
        batch_index: usize,
    ) -> Option<Vec<EnrichmentResult>> {
        let mut attempt = 1;
        loop {
            match self.model.enrich_batch(names) {
                Ok(results) => return Some(results),
                Err(err) if attempt >= self.config.max_attempts => {
                    error!(
                        batch = batch_index,
                        attempts = attempt,
                        error = %err,
                        "enrichment failed, batch will be skipped"
                    );
                    return None;
                }
                Err(err) => {
                    warn!(
                        batch = batch_index,
                        attempt,
                        error = %err,
                        "enrichment attempt failed, retrying"
                    );
                    let delay = self.config.pacing * 2;
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Apply results to the batch by position. Results beyond the batch length
/// are counted as extras; batch entries beyond the result length are counted
/// as missing and stay untouched.
fn merge_batch(batch: &mut [Record], results: Vec<EnrichmentResult>) -> MergeReport {
    let expected = batch.len();
    let mut report = MergeReport {
        applied: 0,
        extra: 0,
        missing: 0,
    };
    for (i, result) in results.into_iter().enumerate() {
        if i >= expected {
            report.extra += 1;
            continue;
        }
        apply_result(&mut batch[i], result);
        report.applied += 1;
    }
    report.missing = expected.saturating_sub(report.applied);
    report
}

/// Copy returned attributes onto the record. `identifier` has no counterpart
/// in the result schema and `name` is the model's echo of an identity field,
/// so neither can ever overwrite what the catalog provided.
fn apply_result(record: &mut Record, result: EnrichmentResult) {
    if let Some(value) = result.definition {
        record.definition = Some(value);
    }
    if let Some(value) = result.category {
        record.category = Some(value);
    }
    if let Some(value) = result.subcategory {
        record.subcategory = Some(value);
    }
    if let Some(value) = result.origin {
        record.origin = Some(value);
    }
    if let Some(value) = result.preparation_method {
        record.preparation_method = Some(value);
    }
    if let Some(value) = result.serving_style {
        record.serving_style = Some(value);
    }
    if let Some(value) = result.ingredients {
        record.ingredients = Some(value);
    }
    if let Some(value) = result.equivalents {
        record.equivalents = Some(value);
    }
}
