//! Deterministic evidence scoring.
//!
//! ```text
//! ConceptCatalog ──► ConceptCoverageScorer ──► ConservativeScoringEngine
//!                                                     │ per section
//!                                                     ▼
//!                                             MultiSectionScorer ──► EvidenceScore
//! ```

mod coverage;
mod engine;
mod sections;
mod terms;

pub use coverage::{ConceptCoverageScorer, CoverageReport, PracticeCoverage, TierCoverage};
pub use engine::{
    ConservativeScoringEngine, ScoreBreakdown, ScoreOutcome, confidence, evidence_floor,
};
pub use sections::{EvidenceScore, MultiSectionScorer, SectionScore};
pub use terms::{TermPattern, compile_phrases, density_weight};
