//! Batch enrichment and semantic indexing for a food pictogram catalog.
//!
//! Pictovec takes a catalog of pictogram records (an identifier plus one or
//! more names), asks a chat model to fill in gastronomic attributes for them
//! in batches, embeds the enriched records, and upserts the vectors into a
//! namespaced vector store where they can be searched by free-text query.
//!
//! # Architecture
//!
//! - **Enrichment**: batched chat completions merged positionally into the
//!   catalog, with retries, pacing, and a resumable checkpoint file
//! - **Embeddings**: OpenAI `text-embedding-ada-002` (1536 dimensions), one
//!   vector per record document plus one per raw name
//! - **Storage**: Pinecone-style REST vector store, namespaced, with
//!   metadata coerced to strings and string lists
//! - **Search**: domain-context query rewriting, then similarity search with
//!   name-variant matches collapsed per record
//!
//! # Modules
//!
//! - [`config`]: TOML configuration loading with environment overrides
//! - [`catalog`]: record model, validation, checkpoints, and error reports
//! - [`enrich`]: chat-model enrichment engine and its OpenAI client
//! - [`embedding`]: embedding provider trait, document text composition, and
//!   the OpenAI embeddings client
//! - [`index`]: vector store trait, Pinecone REST client, upsert and search
//!   pipelines
//! - [`cli`]: terminal commands wiring the pipelines together

pub mod catalog;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod enrich;
pub mod index;
