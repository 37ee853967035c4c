//! Assessment data model.
//!
//! A [`PillarResult`] is produced once per pillar and never mutated afterwards;
//! a rescore builds new results from the stored corpus instead.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pillar::Pillar;
use crate::scoring::EvidenceScore;

/// Recommendation priority, ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// Scoring confidence tier, ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        };
        f.write_str(s)
    }
}

/// Coarse effort or impact estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

/// Where a recommendation came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Raised by the pillar reviewer.
    #[default]
    Finding,
    /// Quantifies points lost to subcategory normalization.
    Gap,
    /// Targets a subcategory with no supporting evidence.
    MissingEvidence,
}

/// A single actionable recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Pillar that raised it first.
    pub pillar: Pillar,
    #[serde(default)]
    pub kind: RecommendationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_recoverable: Option<u32>,
    /// Other pillars that independently raised the same concern.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_raised_by: Vec<Pillar>,
    /// Dedup and cross-pillar notes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Recommendation {
    pub fn new(
        pillar: Pillar,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
            pillar,
            kind: RecommendationKind::Finding,
            source_subcategory: None,
            affected_services: Vec::new(),
            effort: None,
            impact: None,
            points_recoverable: None,
            also_raised_by: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: RecommendationKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_subcategory(mut self, name: impl Into<String>) -> Self {
        self.source_subcategory = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_points_recoverable(mut self, points: u32) -> Self {
        self.points_recoverable = Some(points);
        self
    }

    /// Text used for similarity and trigger matching.
    pub fn match_text(&self) -> String {
        format!("{}\n{}", self.title, self.description)
    }
}

/// Score and justification for one subcategory of a pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryScore {
    pub name: String,
    /// Score reported by the reviewer (or the deterministic baseline).
    pub base_score: u32,
    /// Points removed because no evidence supports the subcategory.
    pub coverage_penalty: u32,
    /// Points removed for missing expected concepts.
    pub gap_penalty: u32,
    /// `base_score - coverage_penalty - gap_penalty`; these sum to the raw pillar sum.
    pub final_score: u32,
    /// Share of the pillar's 100 points after normalization.
    pub normalized_score: u32,
    pub evidence_found: Vec<String>,
    pub missing_concepts: Vec<String>,
    pub expected_concepts: Vec<String>,
    pub substantiated: bool,
    pub human_summary: String,
    pub confidence: Confidence,
}

/// Result for one pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarResult {
    pub pillar: Pillar,
    pub subcategories: Vec<SubcategoryScore>,
    pub raw_subcategory_sum: u32,
    pub normalization_applied: bool,
    pub normalization_factor: f64,
    pub overall_score: u32,
    pub confidence: Confidence,
    pub recommendations: Vec<Recommendation>,
    pub gap_recommendations: Vec<Recommendation>,
    /// Deterministic baseline computed from the corpus.
    pub evidence: EvidenceScore,
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    /// Set when the subcategory input summed to zero.
    #[serde(default)]
    pub degenerate_input: bool,
}

/// Kind of cross-pillar interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    CostVsReliability,
    SecurityVsPerformance,
    /// Informational: operational automation that helps other pillars.
    OperationalEnabler,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictKind::CostVsReliability => "cost_vs_reliability",
            ConflictKind::SecurityVsPerformance => "security_vs_performance",
            ConflictKind::OperationalEnabler => "operational_enabler",
        };
        f.write_str(s)
    }
}

/// Tension or synergy between two pillars' recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossPillarConflict {
    pub kind: ConflictKind,
    pub pillar_a: Pillar,
    pub pillar_b: Pillar,
    pub recommendation_a: String,
    pub recommendation_b: String,
    pub description: String,
    pub mitigation: String,
}

/// Overall run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Completed,
    /// At least one pillar used its deterministic fallback.
    Degraded,
    /// Every pillar fell back because the provider failed.
    Failed,
}

/// Scores as they stood before a rescore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub timestamp: DateTime<Utc>,
    pub overall_score: f64,
    pub pillar_scores: BTreeMap<Pillar, u32>,
    pub pillar_confidence: BTreeMap<Pillar, Confidence>,
    pub source: String,
}

/// The outcome of one assessment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: AssessmentStatus,
    /// Mean of the five pillar scores.
    pub overall_score: f64,
    pub pillars: Vec<PillarResult>,
    pub conflicts: Vec<CrossPillarConflict>,
    /// Deduplicated across pillars.
    pub recommendations: Vec<Recommendation>,
    /// Corpus the scores were computed from; rescoring reuses it.
    pub corpus: String,
    #[serde(default)]
    pub score_history: Vec<ScoreSnapshot>,
}

impl Assessment {
    pub fn pillar(&self, pillar: Pillar) -> Option<&PillarResult> {
        self.pillars.iter().find(|p| p.pillar == pillar)
    }

    /// Capture the current scores for the history log.
    pub fn snapshot(&self, source: impl Into<String>) -> ScoreSnapshot {
        ScoreSnapshot {
            timestamp: self.updated_at,
            overall_score: self.overall_score,
            pillar_scores: self
                .pillars
                .iter()
                .map(|p| (p.pillar, p.overall_score))
                .collect(),
            pillar_confidence: self
                .pillars
                .iter()
                .map(|p| (p.pillar, p.confidence))
                .collect(),
            source: source.into(),
        }
    }
}
