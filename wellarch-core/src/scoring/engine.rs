//! Conservative evidence scoring.
//!
//! Turns coverage signals and the shape of the text into a 0-100 score.
//! Steps run in a fixed order and every intermediate value is recorded in
//! [`ScoreBreakdown`]:
//!
//! 1. tiered raw score (50/30/20)
//! 2. corpus-size density multiplier
//! 3. depth factor
//! 4. negative-mention penalty
//! 5. gap-pattern penalty
//! 6. 3 points per missing critical concept
//! 7. critical-tier coverage penalty
//! 8. clean bonus
//! 9. ceiling gates
//! 10. evidence floor

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::coverage::{ConceptCoverageScorer, CoverageReport};
use super::terms::{self, TermPattern, compile_phrases};
use crate::catalog::{ConceptCatalog, Tier};
use crate::types::Confidence;

const DEPTH_BASE: f64 = 0.6;
const DEPTH_STEP: f64 = 0.15;
const DEPTH_ADVANCED_STEP: f64 = 0.10;
const DEPTH_CAP: f64 = 1.15;
const MISSING_CRITICAL_POINTS: f64 = 3.0;
const CLEAN_BONUS: f64 = 1.15;

/// `(upper bound of pre-floor score, floor)`.
const EVIDENCE_FLOORS: [(f64, u32); 7] = [
    (5.0, 15),
    (10.0, 18),
    (15.0, 21),
    (20.0, 24),
    (25.0, 27),
    (30.0, 30),
    (35.0, 32),
];

/// Every intermediate value of one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub raw_score: f64,
    pub char_count: usize,
    pub coverage_pct: f64,
    pub density_multiplier: f64,
    pub avg_sentence_length: f64,
    pub implementation_hits: f64,
    pub metric_pairs: usize,
    pub advanced_hits: f64,
    pub depth_factor: f64,
    pub after_depth: f64,
    pub negative_mentions: usize,
    pub negative_multiplier: f64,
    pub after_negative: f64,
    pub gap_count: usize,
    pub gap_multiplier: f64,
    pub after_gap: f64,
    pub missing_critical: usize,
    pub after_critical_deduction: f64,
    pub critical_coverage: Option<f64>,
    pub critical_multiplier: f64,
    pub after_critical_coverage: f64,
    pub clean_bonus_applied: bool,
    pub after_bonus: f64,
    pub ceiling: Option<f64>,
    pub after_ceiling: f64,
    pub evidence_floor: Option<u32>,
    pub final_score: u32,
}

/// Result of [`ConservativeScoringEngine::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: u32,
    pub confidence: Confidence,
    pub breakdown: ScoreBreakdown,
    pub coverage: CoverageReport,
}

/// Deterministic evidence scorer for one pillar's catalog.
pub struct ConservativeScoringEngine {
    coverage: ConceptCoverageScorer,
    advanced: Vec<TermPattern>,
    gaps: Vec<TermPattern>,
}

impl ConservativeScoringEngine {
    pub fn new(catalog: &ConceptCatalog) -> Self {
        Self {
            coverage: ConceptCoverageScorer::new(catalog),
            advanced: compile_phrases(&catalog.advanced_practices),
            gaps: compile_phrases(&catalog.gap_patterns),
        }
    }

    pub fn evaluate(&self, text: &str) -> ScoreOutcome {
        let coverage = self.coverage.scan(text);
        let mut b = ScoreBreakdown {
            char_count: text.chars().count(),
            coverage_pct: coverage.coverage_pct,
            ..ScoreBreakdown::default()
        };

        // 1
        b.raw_score = coverage
            .tiers
            .iter()
            .map(|t| t.ratio() * t.tier.weight() * 100.0)
            .sum();

        // 2
        b.density_multiplier = density_multiplier(b.char_count);

        // 3
        b.avg_sentence_length = terms::average_sentence_length(text);
        b.implementation_hits = terms::implementation_hits(text);
        b.metric_pairs = terms::metric_pairs(text);
        b.advanced_hits = terms::weighted_hits(&self.advanced, text);
        b.depth_factor = depth_factor(
            b.avg_sentence_length,
            b.implementation_hits,
            b.metric_pairs,
            b.advanced_hits,
        );
        b.after_depth = b.raw_score * b.density_multiplier * b.depth_factor;

        // 4
        b.negative_mentions = terms::negative_mentions(text);
        b.negative_multiplier = negative_multiplier(b.negative_mentions);
        b.after_negative = b.after_depth * b.negative_multiplier;

        // 5
        b.gap_count = self.gaps.iter().filter(|g| g.is_match(text)).count();
        b.gap_multiplier = gap_multiplier(b.gap_count);
        b.after_gap = b.after_negative * b.gap_multiplier;

        // 6
        b.missing_critical = coverage.missing_critical();
        b.after_critical_deduction =
            (b.after_gap - MISSING_CRITICAL_POINTS * b.missing_critical as f64).max(0.0);

        // 7
        b.critical_coverage = coverage
            .tier(Tier::Critical)
            .filter(|t| t.total() > 0)
            .map(|t| t.ratio());
        b.critical_multiplier = match b.critical_coverage {
            Some(ratio) if ratio < 0.5 => 0.70,
            _ => 1.0,
        };
        b.after_critical_coverage = b.after_critical_deduction * b.critical_multiplier;

        // 8
        b.clean_bonus_applied = b.coverage_pct > 0.70 && b.char_count > 500;
        b.after_bonus = if b.clean_bonus_applied {
            (b.after_critical_coverage * CLEAN_BONUS).min(100.0)
        } else {
            b.after_critical_coverage
        };

        // 9
        b.ceiling = ceiling(b.coverage_pct, b.advanced_hits, b.metric_pairs);
        b.after_ceiling = b.ceiling.map_or(b.after_bonus, |c| b.after_bonus.min(c));

        // 10
        let pre_floor = b.after_ceiling.clamp(0.0, 100.0);
        b.evidence_floor = evidence_floor(pre_floor);
        let floored = b.evidence_floor.map_or(pre_floor, |f| pre_floor.max(f as f64));
        b.final_score = floored.round().clamp(0.0, 100.0) as u32;

        let confidence = confidence(b.coverage_pct, b.char_count);
        trace!(
            raw = b.raw_score,
            score = b.final_score,
            coverage = b.coverage_pct,
            %confidence,
            "evidence scored"
        );

        ScoreOutcome {
            score: b.final_score,
            confidence,
            breakdown: b,
            coverage,
        }
    }
}

fn density_multiplier(chars: usize) -> f64 {
    match chars {
        0..800 => 0.35,
        800..2500 => 0.7,
        _ => 1.0,
    }
}

fn depth_factor(avg_sentence: f64, implementation: f64, metrics: usize, advanced: f64) -> f64 {
    let mut factor = DEPTH_BASE;
    if avg_sentence > 60.0 {
        factor += DEPTH_STEP;
    }
    if implementation >= 5.0 {
        factor += DEPTH_STEP;
    }
    if metrics >= 3 {
        factor += DEPTH_STEP;
    }
    if advanced >= 3.0 {
        factor += DEPTH_ADVANCED_STEP;
    }
    factor.min(DEPTH_CAP)
}

fn negative_multiplier(mentions: usize) -> f64 {
    match mentions {
        0 => 1.0,
        1..=3 => 1.0 - mentions as f64 * 0.015,
        n => 1.0 - ((n - 3) as f64 / 80.0).min(0.50),
    }
}

fn gap_multiplier(gaps: usize) -> f64 {
    if gaps > 3 {
        1.0 - (gaps as f64 / 25.0).min(0.25)
    } else {
        1.0
    }
}

/// Tightest applicable ceiling, if any.
fn ceiling(coverage: f64, advanced: f64, metrics: usize) -> Option<f64> {
    let gates = [
        (coverage < 0.50, 70.0),
        (coverage < 0.60, 75.0),
        (advanced < 1.0, 80.0),
        (advanced < 2.0, 85.0),
        (metrics < 3, 90.0),
    ];
    gates
        .into_iter()
        .filter(|(applies, _)| *applies)
        .map(|(_, cap)| cap)
        .reduce(f64::min)
}

/// Floor for a pre-floor score, monotonic over `[0, 35]`.
pub fn evidence_floor(score: f64) -> Option<u32> {
    EVIDENCE_FLOORS
        .iter()
        .find(|(upper, _)| score <= *upper)
        .map(|(_, floor)| *floor)
}

/// High: coverage > 70% and more than 2000 chars.
/// Medium: coverage at least 30% or 500..=2000 chars.
pub fn confidence(coverage_pct: f64, chars: usize) -> Confidence {
    if coverage_pct > 0.70 && chars > 2000 {
        Confidence::High
    } else if coverage_pct >= 0.30 || (500..=2000).contains(&chars) {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
