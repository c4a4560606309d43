pub mod enrich;
pub mod index;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use std::path::Path;

use crate::catalog::checkpoint::{self, LoadedCatalog};
use crate::config::PictovecConfig;
use crate::embedding::openai::OpenAiEmbeddings;
use crate::index::pinecone::PineconeIndex;

/// Read a catalog file, separating valid records from malformed entries.
fn load_catalog(path: &Path) -> Result<LoadedCatalog> {
    checkpoint::load_records(path)
        .with_context(|| format!("failed to read catalog: {}", path.display()))
}

/// Fetch a required secret from the environment.
fn require_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} is not set"))
}

/// Embedding client wired from config plus `OPENAI_API_KEY`.
fn openai_embedder(config: &PictovecConfig) -> Result<OpenAiEmbeddings> {
    let api_key = require_env("OPENAI_API_KEY")?;
    OpenAiEmbeddings::new(&config.embedding, &api_key)
}

/// Vector store client wired from config plus `PINECONE_API_KEY`.
fn pinecone_index(config: &PictovecConfig) -> Result<PineconeIndex> {
    let api_key = require_env("PINECONE_API_KEY")?;
    PineconeIndex::new(&config.index, &api_key)
}
