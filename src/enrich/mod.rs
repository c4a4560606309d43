//! LLM-driven record enrichment.
//!
//! Provides the [`EnrichmentModel`] trait (one batched call per group of
//! food names), the [`EnrichmentResult`] schema the model must return, the
//! batch engine in [`engine`], and an OpenAI-compatible chat implementation
//! in [`openai`].

pub mod engine;
pub mod openai;

use serde::Deserialize;
use thiserror::Error;

/// Failures from one enrichment call. Both variants are retryable: the
/// engine treats them identically and skips the batch after exhausting its
/// attempts.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Transport, timeout, or non-success status from the model endpoint.
    #[error("model call failed: {0}")]
    ModelCall(String),
    /// Model output was not the expected JSON list after fence stripping.
    #[error("model response not parseable: {0}")]
    ResponseParse(String),
}

/// One record's worth of model-generated attributes.
///
/// Positionally aligned with the names sent in the prompt: `results[i]`
/// belongs to `batch[i]`. Unknown keys in the model output are ignored;
/// absent keys deserialize as `None` and leave the record field untouched
/// on merge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrichmentResult {
    /// The model's echo of the input name. Deliberately never merged back:
    /// record names are identity fields.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub preparation_method: Option<String>,
    #[serde(default)]
    pub serving_style: Option<String>,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub equivalents: Option<Vec<String>>,
}

/// Trait for the generative model behind enrichment.
///
/// One call covers one batch of primary names and must return one
/// [`EnrichmentResult`] per name, in input order. Implementations are
/// injected into the engine at construction so tests can substitute a
/// scripted fake.
pub trait EnrichmentModel: Send + Sync {
    fn enrich_batch(&self, names: &[String]) -> Result<Vec<EnrichmentResult>, EnrichError>;
}
