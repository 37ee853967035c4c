use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use wellarch_core::AssessmentConfig;
use wellarch_models::ApiKey;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Which language-model backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Deterministic scoring only
    None,
    #[default]
    Ollama,
    AzureOpenai,
}

/// Model names a provider serves without extra configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultModels {
    pub fast: &'static str,
    pub quality: &'static str,
    pub embedding: &'static str,
}

impl ProviderKind {
    /// Models filled into `[assessment.llm]` when the config names none.
    /// For Azure these are deployment names.
    pub fn default_models(self) -> Option<DefaultModels> {
        match self {
            ProviderKind::None => None,
            ProviderKind::Ollama => Some(DefaultModels {
                fast: "llama3.2",
                quality: "llama3.1",
                embedding: "nomic-embed-text",
            }),
            ProviderKind::AzureOpenai => Some(DefaultModels {
                fast: "gpt-4o-mini",
                quality: "gpt-4o",
                embedding: "text-embedding-3-small",
            }),
        }
    }
}

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawWellarchConfig {
    #[serde(default)]
    pub provider: RawProviderConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Engine settings, merged key by key before being parsed.
    #[serde(default)]
    pub assessment: toml::Table,
}

/// Provider config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProviderConfig {
    pub kind: Option<ProviderKind>,
    pub ollama_host: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_api_version: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Default)]
pub struct WellarchConfig {
    pub provider: ProviderConfig,
    pub catalog: CatalogConfig,
    pub assessment: AssessmentConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub ollama_host: String,
    pub azure_endpoint: Option<String>,
    /// From config or `AZURE_OPENAI_API_KEY`; never written out.
    #[serde(skip)]
    pub azure_api_key: Option<ApiKey>,
    pub azure_api_version: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            azure_endpoint: None,
            azure_api_key: None,
            azure_api_version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// Directory of `<pillar>.toml` catalogs; the built-in catalogs are used when unset
    pub dir: Option<PathBuf>,
}
