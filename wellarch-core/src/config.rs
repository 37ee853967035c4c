//! Assessment configuration types.
//!
//! Every section deserializes with defaults, so a partial TOML document (or
//! none at all) yields a usable configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AssessmentError, Result};

/// Main configuration for an assessment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    /// Provider admission, concurrency and retry limits.
    pub limits: LimitsConfig,
    /// Language-model settings.
    pub llm: LlmConfig,
    /// Scoring tunables.
    pub scoring: ScoringConfig,
    /// Corpus assembly budgets.
    pub corpus: CorpusConfig,
    /// Whole-run settings.
    pub run: RunConfig,
}

impl AssessmentConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Reject values that would stall or disable the engine.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.requests_per_second == 0 {
            return Err(AssessmentError::Config(
                "limits.requests_per_second must be at least 1".into(),
            ));
        }
        if limits.max_concurrent == 0 {
            return Err(AssessmentError::Config(
                "limits.max_concurrent must be at least 1".into(),
            ));
        }
        if limits.retry_attempts == 0 {
            return Err(AssessmentError::Config(
                "limits.retry_attempts must be at least 1".into(),
            ));
        }
        let threshold = self.scoring.dedup_similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(AssessmentError::Config(format!(
                "scoring.dedup_similarity_threshold must be in (0, 1], got {threshold}"
            )));
        }
        if self.scoring.no_evidence_subcategory_floor > 100 {
            return Err(AssessmentError::Config(
                "scoring.no_evidence_subcategory_floor must be within 0..=100".into(),
            ));
        }
        Ok(())
    }
}

/// Limits applied by the shared [`RateLimitedCaller`](crate::RateLimitedCaller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Token bucket refill rate; the bucket capacity equals this rate.
    pub requests_per_second: u32,
    /// Maximum provider calls in flight across all pillars.
    pub max_concurrent: usize,
    /// Total attempts per call, including the first.
    pub retry_attempts: u32,
    /// Linear backoff base; attempt `n` sleeps `n * base` after failing.
    pub retry_backoff_ms: u64,
    /// Wall-clock limit for a single attempt.
    pub call_timeout_secs: u64,
    /// Longest wait for a token before admitting the call anyway.
    pub admission_wait_ms: u64,
}

impl LimitsConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn admission_wait(&self) -> Duration {
        Duration::from_millis(self.admission_wait_ms)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 8,
            max_concurrent: 6,
            retry_attempts: 4,
            retry_backoff_ms: 750,
            call_timeout_secs: 60,
            admission_wait_ms: 1000,
        }
    }
}

/// How a chat call picks its model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Fast,
    Quality,
    /// Fast for short prompts, quality otherwise.
    #[default]
    Auto,
}

/// Language-model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// When false, every chat call fails fast and pillars use the deterministic fallback.
    pub enabled: bool,
    /// When false, deduplication uses bag-of-words similarity only.
    pub embeddings_enabled: bool,
    pub mode: ChatMode,
    pub fast_model: String,
    pub quality_model: String,
    pub embedding_model: String,
    /// Prompts estimated below this many tokens use the fast model in auto mode.
    pub fast_token_threshold: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Resolve the model for a prompt of `prompt_chars` characters.
    pub fn model_for(&self, prompt_chars: usize) -> &str {
        let fast = match self.mode {
            ChatMode::Fast => true,
            ChatMode::Quality => false,
            ChatMode::Auto => prompt_chars / 4 < self.fast_token_threshold,
        };
        if fast {
            &self.fast_model
        } else {
            &self.quality_model
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            embeddings_enabled: true,
            mode: ChatMode::Auto,
            fast_model: "gpt-4o-mini".to_string(),
            quality_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            fast_token_threshold: 600,
            temperature: 0.1,
            max_tokens: 2000,
        }
    }
}

/// Scoring tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Highest score a subcategory may keep when no evidence supports it.
    pub no_evidence_subcategory_floor: u32,
    /// Keep legacy "Raw LLM Analysis" blocks in the corpus.
    pub enable_legacy_sections: bool,
    /// Recommendations more similar than this are merged.
    pub dedup_similarity_threshold: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            no_evidence_subcategory_floor: 2,
            enable_legacy_sections: false,
            dedup_similarity_threshold: 0.90,
        }
    }
}

/// Token budgets for corpus assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub narrative_token_budget: usize,
    pub visual_token_budget: usize,
    pub support_cases_token_budget: usize,
    /// Evidence signals kept per pillar in the consolidated section.
    pub max_signals_per_pillar: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            narrative_token_budget: 5000,
            visual_token_budget: 3000,
            support_cases_token_budget: 4000,
            max_signals_per_pillar: 8,
        }
    }
}

/// Whole-run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pillars still pending after this long resolve to their fallback. `0` disables the limit.
    pub timeout_secs: u64,
}

impl RunConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { timeout_secs: 600 }
    }
}
