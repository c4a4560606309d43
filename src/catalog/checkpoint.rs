//! Durable run artifacts: the checkpoint/output file and the error report.
//!
//! The checkpoint is a JSON array of [`Record`]s rewritten wholesale at every
//! checkpoint interval. A crashed run resumes by reloading it and diffing
//! identifiers against the input, so partial writes must never corrupt an
//! existing snapshot: writes go to a sibling temp file first, then rename
//! over the target.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::catalog::types::Record;

/// Failures while reading or writing durable pipeline files. Always fatal to
/// the run: without reliable durable state there is no safe continuation.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint contains invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One irrecoverably failed record, as written to the error report file.
#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    /// The raw record as it appeared in the input.
    pub record: serde_json::Value,
    pub error_message: String,
}

/// Path-bound accessor for the checkpoint/output file.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpointed records, or an empty list when no checkpoint
    /// exists yet. A present-but-unreadable file is an error.
    pub fn load_or_default(&self) -> Result<Vec<Record>, CheckpointError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Rewrite the whole checkpoint with the given records, atomically.
    pub fn save<'a>(
        &self,
        records: impl IntoIterator<Item = &'a Record>,
    ) -> Result<(), CheckpointError> {
        let snapshot: Vec<&Record> = records.into_iter().collect();
        let json = serde_json::to_string_pretty(&snapshot)?;

        // Temp file in the same directory so the rename stays on one filesystem
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Loaded catalog input: usable records plus the entries that had to be
/// dropped before processing.
pub struct LoadedCatalog {
    pub records: Vec<Record>,
    pub malformed: Vec<FailureEntry>,
}

/// Read a catalog input file, tolerating malformed entries.
///
/// The file must be a JSON array; that much failing is fatal. Individual
/// elements that cannot be parsed as a [`Record`], or that have no usable
/// name, are warned about and collected into `malformed` instead of aborting
/// the run.
pub fn load_records(path: &Path) -> Result<LoadedCatalog, CheckpointError> {
    let contents = std::fs::read_to_string(path)?;
    let raw: Vec<serde_json::Value> = serde_json::from_str(&contents)?;

    let mut records = Vec::with_capacity(raw.len());
    let mut malformed = Vec::new();
    for (position, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<Record>(value.clone()) {
            Ok(record) => match record.normalize() {
                Ok(_) => records.push(record),
                Err(err) => {
                    warn!(
                        position,
                        identifier = %record.identifier,
                        "skipping record without a usable name"
                    );
                    malformed.push(FailureEntry {
                        record: value,
                        error_message: err.to_string(),
                    });
                }
            },
            Err(err) => {
                warn!(position, error = %err, "skipping unparseable record");
                malformed.push(FailureEntry {
                    record: value,
                    error_message: err.to_string(),
                });
            }
        }
    }

    Ok(LoadedCatalog { records, malformed })
}

/// Write the error report: a JSON array of `{record, error_message}`.
pub fn write_error_report(path: &Path, entries: &[FailureEntry]) -> Result<(), CheckpointError> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json)?;
    Ok(())
}
