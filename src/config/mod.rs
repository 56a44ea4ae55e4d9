
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Placeholder values that must never be sent to the embedding service.
const PLACEHOLDER_API_KEYS: &[&str] = &["", "YOUR_API_KEY", "changeme"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory holding the markdown corpus and its cache file.
    pub docs_dir: PathBuf,
    /// Path to the base system instructions for the generation call.
    #[serde(default = "default_instructions_path")]
    pub instructions_path: PathBuf,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub batch_size: usize,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sambanova.ai/v1".to_string(),
            api_key: String::new(),
            model: "E5-Mistral-7B-Instruct".to_string(),
            batch_size: 16,
            dimension: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Documents shorter than this are kept as a single chunk.
    pub min_input_len: usize,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap budget in characters carried into the next chunk.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_input_len: 200,
            chunk_size: 800,
            overlap: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum number of passages returned to the caller.
    pub top_n: usize,
    /// Number of nearest neighbors fetched from the index before selection.
    pub candidate_pool: usize,
    /// Maximum passages taken from priority files before filling from the rest.
    pub priority_limit: usize,
    /// File names whose chunks are preferred during selection.
    pub priority_files: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            candidate_pool: 10,
            priority_limit: 2,
            priority_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-oss-120b".to_string(),
            temperature: 0.1,
            top_p: 0.1,
        }
    }
}

fn default_instructions_path() -> PathBuf {
    PathBuf::from("systemprompt.md")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Missing or placeholder API key")]
    MissingApiKey,
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(usize),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 8192)")]
    InvalidDimension(usize),
    #[error("Invalid chunk size: {0} (must be between 100 and 8192)")]
    InvalidChunkSize(usize),
    #[error("Invalid overlap: {0} (must be smaller than the chunk size {1})")]
    InvalidOverlap(usize, usize),
    #[error("Invalid minimum input length: {0} (must be smaller than the chunk size {1})")]
    InvalidMinInputLen(usize, usize),
    #[error("Invalid top-n: {0} (must be between 1 and the candidate pool {1})")]
    InvalidTopN(usize, usize),
    #[error("Invalid priority limit: {0} (must not exceed top-n {1})")]
    InvalidPriorityLimit(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Config {
    /// Load configuration from `<config_dir>/config.toml`, falling back to
    /// defaults when the file does not exist.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self::default_for(config_dir.as_ref().join("docs")));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// A default configuration rooted at the given docs directory.
    #[inline]
    pub fn default_for<P: Into<PathBuf>>(docs_dir: P) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            instructions_path: default_instructions_path(),
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.validate_chunking()?;
        self.validate_retrieval()?;
        Ok(())
    }

    /// Fail-fast check used at the top of a chat turn: a placeholder key must
    /// be reported to the caller, never silently defaulted.
    #[inline]
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        let key = self.embedding.api_key.trim();
        if PLACEHOLDER_API_KEYS.contains(&key) {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(key)
    }

    /// Path of the cache blob co-located with the documents.
    #[inline]
    pub fn cache_path(&self) -> PathBuf {
        crate::cache::cache_path(&self.docs_dir)
    }

    fn validate_chunking(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(100..=8192).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.overlap >= config.chunk_size {
            return Err(ConfigError::InvalidOverlap(
                config.overlap,
                config.chunk_size,
            ));
        }

        if config.min_input_len >= config.chunk_size {
            return Err(ConfigError::InvalidMinInputLen(
                config.min_input_len,
                config.chunk_size,
            ));
        }

        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let config = &self.retrieval;

        if config.top_n == 0 || config.top_n > config.candidate_pool {
            return Err(ConfigError::InvalidTopN(
                config.top_n,
                config.candidate_pool,
            ));
        }

        if config.priority_limit > config.top_n {
            return Err(ConfigError::InvalidPriorityLimit(
                config.priority_limit,
                config.top_n,
            ));
        }

        Ok(())
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=8192).contains(&self.dimension) {
            return Err(ConfigError::InvalidDimension(self.dimension));
        }

        Ok(())
    }

    pub fn embeddings_url(&self) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        join_endpoint(&base, "embeddings")
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }

    pub fn chat_completions_url(&self) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        join_endpoint(&base, "chat/completions")
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }
}

/// Join an endpoint onto a base URL whose path may lack a trailing slash,
/// e.g. `https://host/v1` + `embeddings` -> `https://host/v1/embeddings`.
fn join_endpoint(base: &Url, endpoint: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join(endpoint)
}
