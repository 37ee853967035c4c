//! Cross-pillar conflict detection.
//!
//! Recommendations are matched against fixed trigger lists on their
//! lowercased title and description. Matching is substring based so stems
//! like "encrypt" catch "encryption" and "encrypted".

use tracing::{debug, info};

use crate::pillar::Pillar;
use crate::types::{ConflictKind, CrossPillarConflict, PillarResult, Recommendation};

const COST_REDUCTION: &[&str] = &["reduce", "downsize", "lower tier", "scale down"];
const AVAILABILITY_RISK: &[&str] = &["redundancy", "replica", "multi-region", "failover"];
const HARDENING: &[&str] = &["encrypt", "authentication", "firewall", "inspection"];
const LATENCY_SENSITIVE: &[&str] = &["latency", "faster", "reduce overhead"];
const AUTOMATION: &[&str] = &["automation", "ci/cd", "pipeline", "iac"];

/// A pair of pillars whose recommendations may pull in opposite directions.
struct TensionRule {
    kind: ConflictKind,
    pillar_a: Pillar,
    triggers_a: &'static [&'static str],
    pillar_b: Pillar,
    triggers_b: &'static [&'static str],
    description: &'static str,
    mitigation: &'static str,
}

const TENSIONS: [TensionRule; 2] = [
    TensionRule {
        kind: ConflictKind::CostVsReliability,
        pillar_a: Pillar::CostOptimization,
        triggers_a: COST_REDUCTION,
        pillar_b: Pillar::Reliability,
        triggers_b: AVAILABILITY_RISK,
        description: "Cost reduction measures may undermine availability targets",
        mitigation: "Prioritize cost optimization in non-critical paths; preserve redundancy for critical flows",
    },
    TensionRule {
        kind: ConflictKind::SecurityVsPerformance,
        pillar_a: Pillar::Security,
        triggers_a: HARDENING,
        pillar_b: Pillar::PerformanceEfficiency,
        triggers_b: LATENCY_SENSITIVE,
        description: "Security hardening may introduce performance overhead",
        mitigation: "Use platform-native security services tuned for throughput, such as an edge WAF",
    },
];

fn recommendations_of(pillars: &[PillarResult], pillar: Pillar) -> &[Recommendation] {
    pillars
        .iter()
        .find(|p| p.pillar == pillar)
        .map(|p| p.recommendations.as_slice())
        .unwrap_or_default()
}

fn mentions_any(rec: &Recommendation, triggers: &[&str]) -> bool {
    let text = rec.match_text().to_lowercase();
    triggers.iter().any(|t| text.contains(t))
}

/// Finds tensions and synergies between pillars' recommendations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossPillarConflictDetector;

impl CrossPillarConflictDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, pillars: &[PillarResult]) -> Vec<CrossPillarConflict> {
        let mut conflicts = Vec::new();

        for rule in &TENSIONS {
            let side_b = recommendations_of(pillars, rule.pillar_b);
            for a in recommendations_of(pillars, rule.pillar_a)
                .iter()
                .filter(|r| mentions_any(r, rule.triggers_a))
            {
                // at most one conflict per triggering recommendation
                if let Some(b) = side_b.iter().find(|r| mentions_any(r, rule.triggers_b)) {
                    info!(kind = %rule.kind, a = %a.title, b = %b.title, "cross-pillar conflict");
                    conflicts.push(CrossPillarConflict {
                        kind: rule.kind,
                        pillar_a: rule.pillar_a,
                        pillar_b: rule.pillar_b,
                        recommendation_a: a.title.clone(),
                        recommendation_b: b.title.clone(),
                        description: rule.description.to_string(),
                        mitigation: format!(
                            "{}. Weigh '{}' against '{}'.",
                            rule.mitigation, a.title, b.title
                        ),
                    });
                }
            }
        }

        conflicts.extend(self.enablers(pillars));

        debug!(count = conflicts.len(), "cross-pillar analysis complete");
        conflicts
    }

    /// Operational automation that other pillars' recommendations also lean on.
    fn enablers(&self, pillars: &[PillarResult]) -> Vec<CrossPillarConflict> {
        let Some(op) = recommendations_of(pillars, Pillar::OperationalExcellence)
            .iter()
            .find(|r| mentions_any(r, AUTOMATION))
        else {
            return Vec::new();
        };

        Pillar::ALL
            .into_iter()
            .filter(|p| *p != Pillar::OperationalExcellence)
            .filter_map(|pillar| {
                let other = recommendations_of(pillars, pillar)
                    .iter()
                    .find(|r| mentions_any(r, AUTOMATION))?;
                Some(CrossPillarConflict {
                    kind: ConflictKind::OperationalEnabler,
                    pillar_a: Pillar::OperationalExcellence,
                    pillar_b: pillar,
                    recommendation_a: op.title.clone(),
                    recommendation_b: other.title.clone(),
                    description: format!(
                        "Automation and IaC improvements enable better {pillar} outcomes"
                    ),
                    mitigation: format!(
                        "Deliver '{}' first; it is the foundation for '{}'.",
                        op.title, other.title
                    ),
                })
            })
            .collect()
    }

    /// Attach a note to every recommendation named in a tension.
    pub fn annotate(&self, conflicts: &[CrossPillarConflict], recs: &mut [Recommendation]) {
        for conflict in conflicts
            .iter()
            .filter(|c| c.kind != ConflictKind::OperationalEnabler)
        {
            let note = format!("⚠ {} - {}", conflict.description, conflict.mitigation);
            for rec in recs.iter_mut().filter(|r| {
                (r.pillar == conflict.pillar_a && r.title == conflict.recommendation_a)
                    || (r.pillar == conflict.pillar_b && r.title == conflict.recommendation_b)
            }) {
                if !rec.notes.contains(&note) {
                    rec.notes.push(note.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::fallback;
    use crate::scoring::EvidenceScore;
    use crate::types::Priority;

    fn pillar_with(pillar: Pillar, recs: &[(&str, &str)]) -> PillarResult {
        let mut result = fallback(pillar, EvidenceScore::default(), "test");
        result.recommendations = recs
            .iter()
            .map(|(t, d)| Recommendation::new(pillar, *t, *d, Priority::Medium))
            .collect();
        result
    }

    #[test]
    fn cost_reduction_against_redundancy_conflicts() {
        let pillars = vec![
            pillar_with(
                Pillar::CostOptimization,
                &[("Downsize VMs", "Move to a lower tier SKU"), ("Tag resources", "")],
            ),
            pillar_with(Pillar::Reliability, &[("Add zone redundancy", "Deploy across zones")]),
        ];

        let conflicts = CrossPillarConflictDetector::new().detect(&pillars);
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.kind, ConflictKind::CostVsReliability);
        assert_eq!(c.pillar_a, Pillar::CostOptimization);
        assert_eq!(c.pillar_b, Pillar::Reliability);
        assert!(c.mitigation.contains("Downsize VMs"));
        assert!(c.mitigation.contains("Add zone redundancy"));
    }

    #[test]
    fn security_hardening_against_latency_conflicts() {
        let pillars = vec![
            pillar_with(Pillar::Security, &[("Enable TLS inspection", "Inspect egress")]),
            pillar_with(Pillar::PerformanceEfficiency, &[("Cut p95 latency", "Cache reads")]),
        ];
        let conflicts = CrossPillarConflictDetector::new().detect(&pillars);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::SecurityVsPerformance);
    }

    #[test]
    fn no_trigger_no_conflict() {
        let pillars = vec![
            pillar_with(Pillar::CostOptimization, &[("Tag resources", "Use budgets")]),
            pillar_with(Pillar::Reliability, &[("Add zone redundancy", "")]),
        ];
        assert!(CrossPillarConflictDetector::new().detect(&pillars).is_empty());
    }

    #[test]
    fn operational_automation_enables_other_pillars() {
        let pillars = vec![
            pillar_with(Pillar::OperationalExcellence, &[("Adopt IaC", "Bicep in a CI/CD pipeline")]),
            pillar_with(Pillar::Security, &[("Scan in pipeline", "Add SAST to the pipeline")]),
            pillar_with(Pillar::Reliability, &[("Add zone redundancy", "")]),
        ];
        let conflicts = CrossPillarConflictDetector::new().detect(&pillars);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::OperationalEnabler);
        assert_eq!(conflicts[0].pillar_b, Pillar::Security);
    }

    #[test]
    fn annotate_marks_both_sides_once() {
        let pillars = vec![
            pillar_with(Pillar::CostOptimization, &[("Downsize VMs", "")]),
            pillar_with(Pillar::Reliability, &[("Add failover", "")]),
        ];
        let detector = CrossPillarConflictDetector::new();
        let conflicts = detector.detect(&pillars);

        let mut recs: Vec<Recommendation> = pillars
            .iter()
            .flat_map(|p| p.recommendations.clone())
            .collect();
        detector.annotate(&conflicts, &mut recs);
        detector.annotate(&conflicts, &mut recs);

        for rec in &recs {
            assert_eq!(rec.notes.len(), 1, "{}", rec.title);
            assert!(rec.notes[0].starts_with("⚠ Cost reduction measures"));
        }
    }
}
