use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PictovecConfig {
    pub log_level: String,
    pub model: ModelConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub enrichment: EnrichmentConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub debug_artifact: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub host: String,
    pub namespace: String,
    pub upsert_batch_size: usize,
    pub timeout_secs: u64,
    pub error_report: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub batch_size: usize,
    pub max_attempts: u32,
    pub pacing_secs: u64,
    pub checkpoint_interval: usize,
    pub error_report: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
    pub rewrite_query: bool,
}

impl Default for PictovecConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            model: ModelConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            enrichment: EnrichmentConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-3.5-turbo".into(),
            max_tokens: 1500,
            temperature: 0.7,
            timeout_secs: 120,
            debug_artifact: "last_model_response.txt".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "text-embedding-ada-002".into(),
            timeout_secs: 60,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            namespace: "pictogramas_ada".into(),
            upsert_batch_size: 100,
            timeout_secs: 60,
            error_report: "upsert_errors.json".into(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_attempts: 3,
            pacing_secs: 2,
            checkpoint_interval: 20,
            error_report: "enrich_errors.json".into(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            rewrite_query: true,
        }
    }
}

/// Returns `~/.pictovec/`
pub fn default_pictovec_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".pictovec")
}

/// Returns the default config file path: `~/.pictovec/config.toml`
pub fn default_config_path() -> PathBuf {
    default_pictovec_dir().join("config.toml")
}

impl PictovecConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            PictovecConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (PICTOVEC_INDEX_HOST,
    /// PICTOVEC_NAMESPACE, PICTOVEC_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PICTOVEC_INDEX_HOST") {
            self.index.host = val;
        }
        if let Ok(val) = std::env::var("PICTOVEC_NAMESPACE") {
            self.index.namespace = val;
        }
        if let Ok(val) = std::env::var("PICTOVEC_LOG_LEVEL") {
            self.log_level = val;
        }
    }
}

impl ModelConfig {
    /// Debug artifact path with `~` expanded. Empty string disables the artifact.
    pub fn debug_artifact_path(&self) -> Option<PathBuf> {
        if self.debug_artifact.is_empty() {
            None
        } else {
            Some(expand_tilde(&self.debug_artifact))
        }
    }
}

impl EnrichmentConfig {
    /// Error report path with `~` expanded. Empty string disables the report.
    pub fn error_report_path(&self) -> Option<PathBuf> {
        if self.error_report.is_empty() {
            None
        } else {
            Some(expand_tilde(&self.error_report))
        }
    }
}

impl IndexConfig {
    /// Error report path with `~` expanded. Empty string disables the report.
    pub fn error_report_path(&self) -> Option<PathBuf> {
        if self.error_report.is_empty() {
            None
        } else {
            Some(expand_tilde(&self.error_report))
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
