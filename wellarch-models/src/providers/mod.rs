//! Model provider trait and implementations.
//!
//! The [`ModelProvider`] trait defines the unified interface the assessment
//! engine uses for chat completions and embeddings, whether the model runs in
//! the cloud (Azure OpenAI) or locally (Ollama).
//!
//! # Example
//!
//! ```ignore
//! use wellarch_models::providers::{ChatRequest, Message, ModelProvider};
//!
//! async fn ask(provider: &dyn ModelProvider) -> wellarch_models::Result<String> {
//!     let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("Hello!")]);
//!     let response = provider.chat(request).await?;
//!     Ok(response.content)
//! }
//! ```

mod azure;
mod ollama;
mod types;

use async_trait::async_trait;

pub use azure::AzureOpenAiProvider;
pub use ollama::OllamaProvider;
pub use types::*;

use crate::Result;

/// Trait for model providers (cloud and local).
///
/// # Required Methods
///
/// - [`name`](ModelProvider::name) - Provider identifier (e.g., "ollama", "azure-openai")
/// - [`chat`](ModelProvider::chat) - Non-streaming chat completion
///
/// # Optional Methods
///
/// - [`embed`](ModelProvider::embed) - Text embeddings (returns error by default)
/// - [`supports_embeddings`](ModelProvider::supports_embeddings) - Whether `embed` is implemented
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the provider name.
    fn name(&self) -> &str;

    /// Perform a chat completion request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Generate text embeddings, one vector per input text in request order.
    ///
    /// # Default Implementation
    ///
    /// Returns an error indicating embeddings are not supported.
    async fn embed(&self, _request: EmbedRequest) -> Result<EmbedResponse> {
        Err(crate::Error::ProviderApi(format!(
            "embeddings not supported by provider '{}'",
            self.name()
        )))
    }

    /// Whether this provider implements [`embed`](ModelProvider::embed).
    fn supports_embeddings(&self) -> bool {
        false
    }
}
