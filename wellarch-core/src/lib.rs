//! wellarch-core: architecture assessment engine
//!
//! Scores a body of architecture documentation against the five
//! Well-Architected pillars:
//!
//! - **Provider access** - [`RateLimitedCaller`] gates every model call with a
//!   shared token bucket, concurrency limit and retry policy; [`EmbeddingCache`]
//!   memoizes embeddings by content hash
//! - **Deterministic evidence** - [`scoring::ConservativeScoringEngine`] and
//!   [`scoring::MultiSectionScorer`] turn concept coverage into an auditable score
//! - **Pillar evaluation** - [`PillarEvaluator`] combines a model review with the
//!   evidence baseline, and [`SubcategoryNormalizer`] keeps the pillar within 100
//! - **Synthesis** - [`CrossPillarConflictDetector`] and
//!   [`RecommendationDeduplicator`] reconcile recommendations across pillars
//! - **Orchestration** - [`AssessmentOrchestrator`] runs all of the above
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wellarch_core::{
//!     AssessmentConfig, AssessmentOrchestrator, EmbeddingCache, InMemoryCatalog, NoProgress,
//!     RateLimitedCaller,
//! };
//! use wellarch_models::providers::OllamaProvider;
//!
//! async fn example(corpus: &str) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AssessmentConfig::default();
//!     let orchestrator = AssessmentOrchestrator::new(
//!         Arc::new(OllamaProvider::default()),
//!         Arc::new(RateLimitedCaller::new(&config.limits)),
//!         Arc::new(EmbeddingCache::new()),
//!         Arc::new(InMemoryCatalog::builtin()?),
//!         config,
//!     );
//!
//!     let assessment = orchestrator.run(corpus, &NoProgress).await;
//!     println!("overall {:.1}", assessment.overall_score);
//!     Ok(())
//! }
//! ```

pub mod caller;
pub mod catalog;
pub mod config;
pub mod conflicts;
pub mod corpus;
pub mod dedup;
pub mod embedding;
pub mod error;
pub mod evaluator;
pub mod normalizer;
pub mod orchestrator;
pub mod pillar;
pub mod scoring;
pub mod types;

// Re-export key types for convenience
pub use caller::RateLimitedCaller;
pub use catalog::{CatalogSource, ConceptCatalog, DirectoryCatalog, InMemoryCatalog, Tier};
pub use config::{
    AssessmentConfig, ChatMode, CorpusConfig, LimitsConfig, LlmConfig, RunConfig, ScoringConfig,
};
pub use conflicts::CrossPillarConflictDetector;
pub use corpus::{Corpus, CorpusBuilder, Section, SectionKind};
pub use dedup::RecommendationDeduplicator;
pub use embedding::{CachedEmbedder, EmbeddingCache, cosine_similarity};
pub use error::{AssessmentError, ProviderError, Result};
pub use evaluator::PillarEvaluator;
pub use normalizer::{Normalization, SubcategoryNormalizer};
pub use orchestrator::{
    AssessmentOrchestrator, NoProgress, Phase, ProgressReporter, ProgressUpdate, phase_progress,
};
pub use pillar::{Pillar, UnknownPillar};
pub use types::{
    Assessment, AssessmentStatus, Confidence, ConflictKind, CrossPillarConflict, Level,
    PillarResult, Priority, Recommendation, RecommendationKind, ScoreSnapshot, SubcategoryScore,
};
