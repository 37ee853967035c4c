//! Azure OpenAI provider.
//!
//! Talks to deployment-scoped chat-completion and embedding endpoints:
//!
//! ```text
//! {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...
//! {endpoint}/openai/deployments/{deployment}/embeddings?api-version=...
//! ```
//!
//! The `model` field of [`ChatRequest`]/[`EmbedRequest`] names the deployment.

use serde::{Deserialize, Serialize};

use super::{ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, Usage};
use crate::ApiKey;

/// API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-06-01";

// ────────────────────────────────────────────────────────────────────────────
// Azure OpenAI API Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AzureChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AzureResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct AzureChatRequest<'a> {
    messages: Vec<AzureChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<AzureResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct AzureChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<AzureChoice>,
    #[serde(default)]
    usage: Option<AzureUsage>,
}

#[derive(Debug, Deserialize)]
struct AzureChoice {
    message: AzureChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct AzureChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AzureUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Serialize)]
struct AzureEmbedRequest<'a> {
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AzureEmbedResponse {
    data: Vec<AzureEmbedding>,
    #[serde(default)]
    usage: Option<AzureUsage>,
}

#[derive(Debug, Deserialize)]
struct AzureEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

impl AzureChatResponse {
    fn into_chat_response(self) -> crate::Result<ChatResponse> {
        let usage = self.usage.unwrap_or_default();
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| crate::Error::ProviderApi("Azure OpenAI returned no choices".into()))?;

        Ok(ChatResponse {
            content,
            model: self.model,
            usage: Usage::new(usage.prompt_tokens, usage.completion_tokens),
        })
    }
}

impl AzureEmbedResponse {
    /// Order vectors by their reported index so they line up with the inputs.
    fn into_embed_response(mut self, expected: usize) -> crate::Result<EmbedResponse> {
        if self.data.len() != expected {
            return Err(crate::Error::ProviderApi(format!(
                "Azure OpenAI returned {} embeddings for {} inputs",
                self.data.len(),
                expected
            )));
        }
        self.data.sort_by_key(|d| d.index);
        let usage = self.usage.unwrap_or_default();
        Ok(EmbedResponse {
            embeddings: self.data.into_iter().map(|d| d.embedding).collect(),
            usage: Usage::new(usage.prompt_tokens, 0),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AzureOpenAiProvider
// ────────────────────────────────────────────────────────────────────────────

/// Azure OpenAI deployment provider.
pub struct AzureOpenAiProvider {
    endpoint: String,
    api_version: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl AzureOpenAiProvider {
    /// Create a provider for an Azure OpenAI resource endpoint.
    pub fn new(endpoint: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Override the REST API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Get the resource endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, deployment, operation, self.api_version
        )
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> crate::Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| crate::Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::Error::ProviderApi(format!(
                "Azure OpenAI returned {}: {}",
                status, body
            )));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl super::ModelProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn chat(&self, request: ChatRequest) -> crate::Result<ChatResponse> {
        let url = self.deployment_url(&request.model, "chat/completions");
        let body = AzureChatRequest {
            messages: request
                .messages
                .iter()
                .map(|m| AzureChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_output
                .then_some(AzureResponseFormat { kind: "json_object" }),
        };

        let response: AzureChatResponse = self
            .post(&url, &body)
            .await?
            .json()
            .await
            .map_err(|e| crate::Error::Request(e.to_string()))?;
        response.into_chat_response()
    }

    async fn embed(&self, request: EmbedRequest) -> crate::Result<EmbedResponse> {
        let url = self.deployment_url(&request.model, "embeddings");
        let body = AzureEmbedRequest {
            input: &request.texts,
        };

        let response: AzureEmbedResponse = self
            .post(&url, &body)
            .await?
            .json()
            .await
            .map_err(|e| crate::Error::Request(e.to_string()))?;
        response.into_embed_response(request.texts.len())
    }

    fn supports_embeddings(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ModelProvider;

    fn provider() -> AzureOpenAiProvider {
        AzureOpenAiProvider::new("https://contoso.openai.azure.com/", ApiKey::new("k"))
    }

    #[test]
    fn deployment_url_includes_api_version() {
        let url = provider().deployment_url("gpt-4o", "chat/completions");
        assert_eq!(
            url,
            "https://contoso.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn with_api_version_overrides_default() {
        let p = provider().with_api_version("2024-10-21");
        assert!(p.deployment_url("e", "embeddings").ends_with("api-version=2024-10-21"));
        assert_eq!(p.name(), "azure-openai");
    }

    #[test]
    fn parse_chat_response_takes_first_choice() {
        let json = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{}"}}],
            "usage": {"prompt_tokens": 40, "completion_tokens": 2, "total_tokens": 42}
        }"#;
        let parsed: AzureChatResponse = serde_json::from_str(json).unwrap();
        let response = parsed.into_chat_response().unwrap();
        assert_eq!(response.content, "{}");
        assert_eq!(response.usage.total_tokens, 42);
    }

    #[test]
    fn empty_choices_is_provider_error() {
        let parsed: AzureChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            parsed.into_chat_response(),
            Err(crate::Error::ProviderApi(_))
        ));
    }

    #[test]
    fn embeddings_are_reordered_by_index() {
        let json = r#"{
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ],
            "usage": {"prompt_tokens": 6}
        }"#;
        let parsed: AzureEmbedResponse = serde_json::from_str(json).unwrap();
        let response = parsed.into_embed_response(2).unwrap();
        assert_eq!(response.embeddings[0], vec![1.0, 0.0]);
        assert_eq!(response.embeddings[1], vec![0.0, 1.0]);
    }

    #[test]
    fn embedding_count_mismatch_is_rejected() {
        let parsed: AzureEmbedResponse =
            serde_json::from_str(r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#).unwrap();
        assert!(parsed.into_embed_response(3).is_err());
    }

    #[test]
    fn chat_body_requests_json_object() {
        let body = AzureChatRequest {
            messages: vec![AzureChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: Some(0.1),
            max_tokens: None,
            response_format: Some(AzureResponseFormat { kind: "json_object" }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert!(json.get("max_tokens").is_none());
    }
}
