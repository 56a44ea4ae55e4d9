
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::{EmbeddingConfig, GenerationConfig};
use crate::retriever::RetrievedPassage;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Used when the instructions file cannot be read; the chat turn must still
/// carry a system role.
const FALLBACK_INSTRUCTIONS: &str =
    "You are a helpful assistant for Telebot Creator documentation.";

/// Load the base system instructions from a well-known file path, falling
/// back to a built-in default on any error.
#[inline]
pub fn load_system_instructions(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                "Failed to read instructions file {}: {e}, using fallback",
                path.display()
            );
            FALLBACK_INSTRUCTIONS.to_string()
        }
    }
}

/// Append the retrieved passages to the base instructions, each labeled with
/// a sequence number and its source file. When nothing was retrieved, an
/// explicit note is appended instead of silently omitting context.
#[inline]
pub fn build_grounding_context(instructions: &str, passages: &[RetrievedPassage]) -> String {
    let mut prompt = instructions.to_string();

    if passages.is_empty() {
        prompt.push_str("\n\nNo specific documentation found for this query.");
        return prompt;
    }

    prompt.push_str("\n\nRelevant Documentation Sections:\n");
    for (i, passage) in passages.iter().enumerate() {
        prompt.push_str(&format!(
            "\n--- Section {} (from {}) ---\n{}\n",
            i + 1,
            passage.metadata.file,
            passage.content
        ));
    }

    prompt
}

/// Thin client for the chat-completion boundary: one request, one response,
/// or a propagated error.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    chat_url: Url,
    api_key: String,
    model: String,
    temperature: f32,
    top_p: f32,
    session: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl GenerationClient {
    #[inline]
    pub fn new(service: &EmbeddingConfig, generation: &GenerationConfig) -> Result<Self> {
        let chat_url = service
            .chat_completions_url()
            .context("Failed to build chat completions URL from config")?;

        let session = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build HTTP session")?;

        Ok(Self {
            chat_url,
            api_key: service.api_key.clone(),
            model: generation.model.clone(),
            temperature: generation.temperature,
            top_p: generation.top_p,
            session,
        })
    }

    /// Issue a single chat-completion request grounded by the given system
    /// prompt and return the model's answer text.
    #[inline]
    pub async fn complete(&self, system_prompt: &str, user_query: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} ({} chars of context)",
            self.chat_url,
            system_prompt.len()
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_query.to_string(),
                },
            ],
            temperature: self.temperature,
            top_p: self.top_p,
        };

        let response = self
            .session
            .post(self.chat_url.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Chat completion returned HTTP {}", status.as_u16());
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Chat completion response contained no choices")
    }
}
