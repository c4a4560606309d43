//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, the deterministic embedding-text
//! builder in [`text`], and a remote OpenAI-compatible implementation in
//! [`openai`] (text-embedding-ada-002, 1536 dimensions).

pub mod openai;
pub mod text;

use thiserror::Error;

/// Number of dimensions in the embedding vectors (text-embedding-ada-002).
pub const EMBEDDING_DIM: usize = 1536;

/// Failures from the embedding endpoint.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("embedding endpoint returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("embedding endpoint returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

impl EmbeddingError {
    /// Whether a retry could plausibly succeed: connection-level failures,
    /// rate limits, and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.is_body()
                    || err.is_request()
                    || err.is_decode()
            }
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::CountMismatch { .. } => false,
        }
    }
}

/// Trait for embedding text into vectors.
///
/// Implementations produce fixed-width vectors; the remote provider emits
/// [`EMBEDDING_DIM`]. All methods are synchronous, the pipeline issues calls
/// sequentially.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed a batch of text strings. Implementations may override to issue
    /// one batched request instead of one per text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}
