
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::EmbeddingConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Pause between batches on the concurrent strategy. Throttling, not
/// parallelism: batches are issued sequentially on one session.
const INTER_BATCH_DELAY_MS: u64 = 500;
const RATE_LIMIT_STATUS: u16 = 429;
const BACKOFF_BASE_SECONDS: u64 = 2;

/// Client for a remote OpenAI-compatible embedding service.
///
/// Owned and reconstructed by the caller whenever credentials change; there
/// is no process-global client state.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    embeddings_url: Url,
    api_key: String,
    model: String,
    batch_size: usize,
    dimension: usize,
    agent: ureq::Agent,
    session: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let embeddings_url = config
            .embeddings_url()
            .context("Failed to build embeddings URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        let session = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build HTTP session")?;

        Ok(Self {
            embeddings_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            batch_size: config.batch_size,
            dimension: config.dimension,
            agent,
            session,
        })
    }

    /// Dimension of the vectors this client produces (and of the zero vectors
    /// substituted for failed batches).
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed texts with the concurrent strategy: batches issued sequentially
    /// through one shared session, with a short pause between batches to stay
    /// under provider rate limits.
    ///
    /// The output is always aligned 1:1 with the input. A batch that fails
    /// after backoff contributes zero vectors instead of aborting the corpus;
    /// those chunks become unreachable by similarity rather than sinking the
    /// whole pipeline.
    #[inline]
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts in async batches", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(Duration::from_millis(INTER_BATCH_DELAY_MS)).await;
            }
            results.extend(self.embed_batch(batch, batch_index).await);
        }

        debug_assert_eq!(results.len(), texts.len());
        Ok(results)
    }

    /// Embed texts with the synchronous strategy: one blocking call per
    /// batch. Same batching and failure policy as [`Self::embed`].
    #[inline]
    pub fn embed_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts in blocking batches", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            results.extend(self.embed_batch_blocking(batch, batch_index));
        }

        debug_assert_eq!(results.len(), texts.len());
        Ok(results)
    }

    /// Embed a query as a one-element batch through the identical code path
    /// as the corpus, so query and corpus vectors share model and
    /// normalization.
    #[inline]
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .context("Embedding service returned no vector for query")
    }

    /// Blocking twin of [`Self::embed_query`].
    #[inline]
    pub fn embed_query_blocking(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_blocking(&[text.to_string()])?;
        vectors
            .pop()
            .context("Embedding service returned no vector for query")
    }

    async fn embed_batch(&self, batch: &[String], batch_index: usize) -> Vec<Vec<f32>> {
        match self.request_batch(batch).await {
            Ok(vectors) => vectors,
            Err(BatchError::RateLimited) => {
                let delay = backoff_delay(batch_index);
                warn!(
                    "Rate limited on batch {batch_index}, backing off {}s",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;

                match self.request_batch(batch).await {
                    Ok(vectors) => vectors,
                    Err(e) => self.zero_batch(batch.len(), batch_index, &e),
                }
            }
            Err(e) => self.zero_batch(batch.len(), batch_index, &e),
        }
    }

    fn embed_batch_blocking(&self, batch: &[String], batch_index: usize) -> Vec<Vec<f32>> {
        match self.request_batch_blocking(batch) {
            Ok(vectors) => vectors,
            Err(BatchError::RateLimited) => {
                let delay = backoff_delay(batch_index);
                warn!(
                    "Rate limited on batch {batch_index}, backing off {}s",
                    delay.as_secs()
                );
                std::thread::sleep(delay);

                match self.request_batch_blocking(batch) {
                    Ok(vectors) => vectors,
                    Err(e) => self.zero_batch(batch.len(), batch_index, &e),
                }
            }
            Err(e) => self.zero_batch(batch.len(), batch_index, &e),
        }
    }

    async fn request_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, BatchError> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input: batch.to_vec(),
        };

        let response = self
            .session
            .post(self.embeddings_url.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BatchError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == RATE_LIMIT_STATUS {
            return Err(BatchError::RateLimited);
        }
        if !status.is_success() {
            return Err(BatchError::Status(status.as_u16()));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| BatchError::Malformed(e.to_string()))?;

        self.check_alignment(parsed, batch.len())
    }

    fn request_batch_blocking(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, BatchError> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input: batch.to_vec(),
        };

        let request_json =
            serde_json::to_string(&request).map_err(|e| BatchError::Malformed(e.to_string()))?;
        let authorization = format!("Bearer {}", self.api_key);

        let response_text = self
            .agent
            .post(self.embeddings_url.as_str())
            .header("Authorization", authorization.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) if status == RATE_LIMIT_STATUS => {
                    BatchError::RateLimited
                }
                ureq::Error::StatusCode(status) => BatchError::Status(status),
                other => BatchError::Transport(other.to_string()),
            })?;

        let parsed: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| BatchError::Malformed(e.to_string()))?;

        self.check_alignment(parsed, batch.len())
    }

    fn check_alignment(
        &self,
        response: EmbedResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, BatchError> {
        if response.data.len() != expected {
            return Err(BatchError::Malformed(format!(
                "requested {expected} embeddings, got {}",
                response.data.len()
            )));
        }

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn zero_batch(&self, len: usize, batch_index: usize, error: &BatchError) -> Vec<Vec<f32>> {
        warn!("Batch {batch_index} failed ({error}), substituting {len} zero vectors");
        vec![vec![0.0; self.dimension]; len]
    }
}

/// Failure modes of a single batch request. Only a rate-limit signal earns a
/// retry; everything else degrades straight to zero vectors.
#[derive(Debug, thiserror::Error)]
enum BatchError {
    #[error("rate limited")]
    RateLimited,
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Exponential backoff keyed by batch position: `2^batch_index` seconds,
/// implicitly capped by the number of batches.
fn backoff_delay(batch_index: usize) -> Duration {
    let exponent = u32::try_from(batch_index).unwrap_or(u32::MAX).min(6);
    Duration::from_secs(BACKOFF_BASE_SECONDS.pow(exponent))
}
