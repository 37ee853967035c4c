//! Ollama local model provider.
//!
//! Connects to a local Ollama instance for chat (`/api/chat`) and
//! embeddings (`/api/embed`).
//!
//! # Example
//!
//! ```ignore
//! use wellarch_models::providers::OllamaProvider;
//!
//! let provider = OllamaProvider::new();  // Uses localhost:11434
//! let provider = OllamaProvider::with_base_url("http://192.168.1.100:11434");
//! ```

use serde::{Deserialize, Serialize};

use super::{ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, Usage};

/// Default Ollama API base URL.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

// ────────────────────────────────────────────────────────────────────────────
// Ollama API Types
// ────────────────────────────────────────────────────────────────────────────

/// Message in an Ollama chat request/response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for Ollama's `/api/chat` endpoint.
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaChatOptions>,
}

impl OllamaChatRequest {
    /// Build the wire request from a provider-neutral chat request.
    pub fn from_chat(request: ChatRequest) -> Self {
        let messages = request
            .messages
            .iter()
            .map(|m| OllamaChatMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        Self {
            model: request.model,
            messages,
            stream: false,
            format: request.json_output.then(|| "json".to_string()),
            options,
        }
    }
}

/// Chat options for Ollama.
#[derive(Debug, Serialize)]
pub struct OllamaChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Response from Ollama's `/api/chat` endpoint.
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    pub model: String,
    pub message: OllamaChatMessage,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl From<OllamaChatResponse> for ChatResponse {
    fn from(response: OllamaChatResponse) -> Self {
        Self {
            content: response.message.content,
            model: Some(response.model),
            usage: Usage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
        }
    }
}

/// Request body for Ollama's `/api/embed` endpoint.
#[derive(Debug, Serialize)]
pub struct OllamaEmbedRequest {
    pub model: String,
    pub input: Vec<String>,
}

/// Response from Ollama's `/api/embed` endpoint.
#[derive(Debug, Deserialize)]
pub struct OllamaEmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
}

// ────────────────────────────────────────────────────────────────────────────
// OllamaProvider
// ────────────────────────────────────────────────────────────────────────────

/// Ollama local model provider.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default URL (localhost:11434).
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new Ollama provider with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Get the base URL for this provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a chat completion request.
    pub async fn chat(&self, request: ChatRequest) -> crate::Result<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest::from_chat(request);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| crate::Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::Error::ProviderApi(format!(
                "Ollama API returned {}: {}",
                status, body
            )));
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| crate::Error::Request(e.to_string()))?;

        Ok(ollama_response.into())
    }

    /// Generate embeddings for a batch of texts.
    pub async fn embed(&self, request: EmbedRequest) -> crate::Result<EmbedResponse> {
        let url = format!("{}/api/embed", self.base_url);
        let expected = request.texts.len();
        let body = OllamaEmbedRequest {
            model: request.model,
            input: request.texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| crate::Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::Error::ProviderApi(format!(
                "Ollama API returned {}: {}",
                status, body
            )));
        }

        let parsed: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| crate::Error::Request(e.to_string()))?;

        if parsed.embeddings.len() != expected {
            return Err(crate::Error::ProviderApi(format!(
                "Ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                expected
            )));
        }

        Ok(EmbedResponse {
            embeddings: parsed.embeddings,
            usage: Usage::new(parsed.prompt_eval_count.unwrap_or(0), 0),
        })
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl super::ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: ChatRequest) -> crate::Result<ChatResponse> {
        self.chat(request).await
    }

    async fn embed(&self, request: EmbedRequest) -> crate::Result<EmbedResponse> {
        self.embed(request).await
    }

    fn supports_embeddings(&self) -> bool {
        true
    }
}
