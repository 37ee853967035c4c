use super::types::{
    CatalogConfig, DEFAULT_OLLAMA_HOST, ProviderConfig, ProviderKind, RawProviderConfig,
    RawWellarchConfig, WellarchConfig,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use wellarch_core::AssessmentConfig;
use wellarch_models::ApiKey;
use wellarch_models::auth::AZURE_OPENAI_KEY_VAR;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<WellarchConfig> {
        let mut raw = RawWellarchConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        Self::finalize(raw)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wellarch").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with WELLARCH_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("WELLARCH_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".wellarch/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawWellarchConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawWellarchConfig, overlay: RawWellarchConfig) -> RawWellarchConfig {
        RawWellarchConfig {
            provider: RawProviderConfig {
                kind: overlay.provider.kind.or(base.provider.kind),
                ollama_host: overlay.provider.ollama_host.or(base.provider.ollama_host),
                azure_endpoint: overlay
                    .provider
                    .azure_endpoint
                    .or(base.provider.azure_endpoint),
                azure_api_key: overlay.provider.azure_api_key.or(base.provider.azure_api_key),
                azure_api_version: overlay
                    .provider
                    .azure_api_version
                    .or(base.provider.azure_api_version),
            },
            catalog: CatalogConfig {
                dir: overlay.catalog.dir.or(base.catalog.dir),
            },
            assessment: merge_tables(base.assessment, overlay.assessment),
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawWellarchConfig) -> Result<WellarchConfig> {
        let kind = raw.provider.kind.unwrap_or_default();
        let mut assessment = raw.assessment;
        apply_model_defaults(&mut assessment, kind);
        let assessment: AssessmentConfig = toml::Value::Table(assessment)
            .try_into()
            .context("invalid [assessment] section")?;
        assessment.validate()?;

        let azure_api_key = raw
            .provider
            .azure_api_key
            .filter(|k| !k.trim().is_empty())
            .map(ApiKey::new)
            .or_else(|| ApiKey::from_env("azure-openai", AZURE_OPENAI_KEY_VAR).ok());

        Ok(WellarchConfig {
            provider: ProviderConfig {
                kind,
                ollama_host: raw
                    .provider
                    .ollama_host
                    .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
                azure_endpoint: raw.provider.azure_endpoint,
                azure_api_key,
                azure_api_version: raw.provider.azure_api_version,
            },
            catalog: raw.catalog,
            assessment,
        })
    }

    /// Load config from a specific path (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<WellarchConfig> {
        if path.exists() {
            Self::finalize(Self::read_raw(path)?)
        } else {
            Self::finalize(RawWellarchConfig::default())
        }
    }
}

/// Fill unset `[assessment.llm]` model names with the provider's defaults.
fn apply_model_defaults(assessment: &mut toml::Table, kind: ProviderKind) {
    let Some(models) = kind.default_models() else {
        return;
    };
    let llm = assessment
        .entry("llm")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    // a non-table `llm` is reported when the section is parsed
    let Some(llm) = llm.as_table_mut() else {
        return;
    };
    for (key, name) in [
        ("fast_model", models.fast),
        ("quality_model", models.quality),
        ("embedding_model", models.embedding),
    ] {
        llm.entry(key)
            .or_insert_with(|| toml::Value::String(name.to_string()));
    }
}

/// Recursive key-by-key merge; overlay wins on conflicts.
fn merge_tables(mut base: toml::Table, overlay: toml::Table) -> toml::Table {
    for (key, value) in overlay {
        let merged = match (base.remove(&key), value) {
            (Some(toml::Value::Table(b)), toml::Value::Table(o)) => {
                toml::Value::Table(merge_tables(b, o))
            }
            (_, value) => value,
        };
        base.insert(key, merged);
    }
    base
}
