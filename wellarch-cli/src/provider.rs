//! Provider and catalog wiring from configuration.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::debug;
use wellarch_core::{
    AssessmentOrchestrator, CatalogSource, DirectoryCatalog, EmbeddingCache, InMemoryCatalog,
    RateLimitedCaller,
};
use wellarch_models::providers::{
    AzureOpenAiProvider, ChatRequest, ChatResponse, ModelProvider, OllamaProvider,
};

use crate::config::{ProviderKind, WellarchConfig};

/// Stand-in used when no provider is configured; the engine never calls it
/// because the model is disabled.
struct NoProvider;

#[async_trait]
impl ModelProvider for NoProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn chat(&self, _request: ChatRequest) -> wellarch_models::Result<ChatResponse> {
        Err(wellarch_models::Error::ProviderApi(
            "no language-model provider configured".to_string(),
        ))
    }
}

/// Build the configured provider. `offline` forces deterministic scoring.
pub fn build_provider(
    config: &mut WellarchConfig,
    offline: bool,
) -> Result<Arc<dyn ModelProvider>> {
    if offline || config.provider.kind == ProviderKind::None {
        config.assessment.llm.enabled = false;
        return Ok(Arc::new(NoProvider));
    }

    let provider = &config.provider;
    match provider.kind {
        ProviderKind::None => Ok(Arc::new(NoProvider)),
        ProviderKind::Ollama => {
            debug!(host = %provider.ollama_host, "using Ollama provider");
            Ok(Arc::new(OllamaProvider::with_base_url(&provider.ollama_host)))
        }
        ProviderKind::AzureOpenai => {
            let Some(endpoint) = provider.azure_endpoint.as_deref() else {
                bail!("provider.azure_endpoint is required for the azure-openai provider");
            };
            let key = provider.azure_api_key.clone().context(
                "no Azure OpenAI key: set provider.azure_api_key or AZURE_OPENAI_API_KEY",
            )?;
            let mut azure = AzureOpenAiProvider::new(endpoint, key);
            if let Some(version) = &provider.azure_api_version {
                azure = azure.with_api_version(version);
            }
            debug!(endpoint, "using Azure OpenAI provider");
            Ok(Arc::new(azure))
        }
    }
}

/// Configured catalog directory, or the built-in catalogs.
pub fn build_catalogs(config: &WellarchConfig) -> Result<Arc<dyn CatalogSource>> {
    match &config.catalog.dir {
        Some(dir) => Ok(Arc::new(DirectoryCatalog::new(dir))),
        None => Ok(Arc::new(
            InMemoryCatalog::builtin().context("loading built-in catalogs")?,
        )),
    }
}

/// Orchestrator for one CLI invocation.
pub fn build_orchestrator(
    mut config: WellarchConfig,
    offline: bool,
) -> Result<AssessmentOrchestrator> {
    let provider = build_provider(&mut config, offline)?;
    let catalogs = build_catalogs(&config)?;
    let caller = Arc::new(RateLimitedCaller::new(&config.assessment.limits));
    Ok(AssessmentOrchestrator::new(
        provider,
        caller,
        Arc::new(EmbeddingCache::new()),
        catalogs,
        config.assessment,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use wellarch_models::ApiKey;

    #[test]
    fn offline_disables_the_model() {
        let mut config = WellarchConfig::default();
        let provider = build_provider(&mut config, true).unwrap();
        assert_eq!(provider.name(), "none");
        assert!(!config.assessment.llm.enabled);
    }

    #[test]
    fn none_kind_disables_the_model() {
        let mut config = WellarchConfig {
            provider: ProviderConfig {
                kind: ProviderKind::None,
                ..ProviderConfig::default()
            },
            ..WellarchConfig::default()
        };
        build_provider(&mut config, false).unwrap();
        assert!(!config.assessment.llm.enabled);
    }

    #[test]
    fn ollama_is_the_default() {
        let mut config = WellarchConfig::default();
        let provider = build_provider(&mut config, false).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert!(config.assessment.llm.enabled);
    }

    #[test]
    fn azure_requires_endpoint_and_key() {
        let mut config = WellarchConfig {
            provider: ProviderConfig {
                kind: ProviderKind::AzureOpenai,
                ..ProviderConfig::default()
            },
            ..WellarchConfig::default()
        };
        assert!(build_provider(&mut config, false).is_err());

        config.provider.azure_endpoint = Some("https://example.openai.azure.com".into());
        assert!(build_provider(&mut config, false).is_err());

        config.provider.azure_api_key = Some(ApiKey::new("k"));
        assert!(build_provider(&mut config, false).is_ok());
    }

    #[test]
    fn catalog_dir_is_used_when_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WellarchConfig::default();
        config.catalog.dir = Some(dir.path().to_path_buf());

        let catalogs = build_catalogs(&config).unwrap();
        assert!(
            catalogs
                .get_concepts(wellarch_core::Pillar::Security)
                .is_err()
        );
        assert!(
            build_catalogs(&WellarchConfig::default())
                .unwrap()
                .get_concepts(wellarch_core::Pillar::Security)
                .is_ok()
        );
    }
}
