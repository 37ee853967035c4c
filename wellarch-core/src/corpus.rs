//! Corpus parsing and assembly.
//!
//! A corpus is the single text blob one assessment reads. It may be divided
//! into recognized sections, each introduced by a marker line:
//!
//! ```text
//! === ARCHITECTURE NARRATIVE ===
//! === VISUAL TOPOLOGY INSIGHTS ===
//! === OPERATIONAL REALITY (SUPPORT CASES) ===
//! === CONSOLIDATED PILLAR EVIDENCE ===
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::CorpusConfig;
use crate::error::{AssessmentError, Result};
use crate::pillar::Pillar;

/// Appended to any section cut down to its token budget.
pub const TRUNCATION_NOTICE: &str =
    "... [Content truncated for token budget - full context preserved in document analysis]";

/// Recognized corpus sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    ArchitectureNarrative,
    VisualTopology,
    OperationalReality,
    ConsolidatedEvidence,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::ArchitectureNarrative,
        SectionKind::VisualTopology,
        SectionKind::OperationalReality,
        SectionKind::ConsolidatedEvidence,
    ];

    pub fn marker(&self) -> &'static str {
        match self {
            SectionKind::ArchitectureNarrative => "=== ARCHITECTURE NARRATIVE ===",
            SectionKind::VisualTopology => "=== VISUAL TOPOLOGY INSIGHTS ===",
            SectionKind::OperationalReality => "=== OPERATIONAL REALITY (SUPPORT CASES) ===",
            SectionKind::ConsolidatedEvidence => "=== CONSOLIDATED PILLAR EVIDENCE ===",
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| line.starts_with(k.marker()))
    }
}

/// One recognized section of a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
}

/// Immutable, optionally sectioned assessment input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    text: String,
    sections: Vec<Section>,
}

impl Corpus {
    /// Parse `raw`, stripping legacy raw-analysis blocks unless `keep_legacy`.
    pub fn new(raw: impl Into<String>, keep_legacy: bool) -> Self {
        let raw = raw.into();
        let text = if keep_legacy {
            raw
        } else {
            strip_legacy_blocks(&raw)
        };
        let sections = split_sections(&text);
        Self { text, sections }
    }

    /// The (filtered) corpus text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Non-empty recognized sections, in document order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// The recognized sections, or [`AssessmentError::MalformedCorpus`] when none exist.
    pub fn require_sections(&self) -> Result<&[Section]> {
        if self.sections.is_empty() {
            Err(AssessmentError::MalformedCorpus(
                "no recognized section markers".to_string(),
            ))
        } else {
            Ok(&self.sections)
        }
    }

    /// True when the multi-section scorer applies.
    pub fn is_multi_section(&self) -> bool {
        self.sections.len() >= 2
    }
}

/// Drop legacy "Raw LLM Analysis" blocks.
///
/// A block starts at any line containing the heading and runs through the
/// next blank line.
pub fn strip_legacy_blocks(text: &str) -> String {
    let mut kept = Vec::new();
    let mut skipping = false;
    for line in text.lines() {
        if line.contains("Raw LLM Analysis") || line.contains("RAW LLM ANALYSIS") {
            skipping = true;
        }
        if skipping {
            if line.trim().is_empty() {
                skipping = false;
            }
            continue;
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// Split on marker lines. Text before the first marker is ignored; empty
/// sections are dropped.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut active: Option<SectionKind> = None;
    let mut current: Vec<&str> = Vec::new();

    let mut flush = |kind: Option<SectionKind>, lines: &mut Vec<&str>| {
        if let Some(kind) = kind {
            let body = lines.join("\n").trim().to_string();
            if !body.is_empty() {
                sections.push(Section { kind, text: body });
            }
        }
        lines.clear();
    };

    for line in text.lines() {
        if let Some(kind) = SectionKind::from_line(line) {
            flush(active, &mut current);
            active = Some(kind);
        } else if active.is_some() {
            current.push(line);
        }
    }
    flush(active, &mut current);

    sections
}

/// Rough token count used for budgeting: words × 1.3.
pub fn estimate_tokens(text: &str) -> usize {
    (text.split_whitespace().count() as f64 * 1.3) as usize
}

/// Cut `text` to roughly `max_tokens`, preferring a sentence end in the final 20%.
pub fn truncate_to_budget(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    let max_chars = max_tokens * 4;
    let mut cut: String = text.chars().take(max_chars).collect();
    if let Some(pos) = cut.rfind('.')
        && pos as f64 > cut.len() as f64 * 0.8
    {
        cut.truncate(pos + 1);
    }
    format!("{cut}\n\n{TRUNCATION_NOTICE}")
}

/// Assembles a sectioned corpus from upstream document analysis.
#[derive(Debug, Clone, Default)]
pub struct CorpusBuilder {
    config: CorpusConfig,
    narrative: Vec<String>,
    visual: Vec<String>,
    support_cases: Vec<String>,
    evidence: BTreeMap<Pillar, Vec<String>>,
}

impl CorpusBuilder {
    pub fn new(config: CorpusConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Add architecture narrative text.
    #[must_use]
    pub fn narrative(mut self, text: impl Into<String>) -> Self {
        push_non_blank(&mut self.narrative, text.into());
        self
    }

    /// Add text derived from diagrams.
    #[must_use]
    pub fn visual(mut self, text: impl Into<String>) -> Self {
        push_non_blank(&mut self.visual, text.into());
        self
    }

    /// Add summarized support-case history.
    #[must_use]
    pub fn support_cases(mut self, text: impl Into<String>) -> Self {
        push_non_blank(&mut self.support_cases, text.into());
        self
    }

    /// Add one evidence signal for a pillar.
    #[must_use]
    pub fn evidence(mut self, pillar: Pillar, signal: impl Into<String>) -> Self {
        let signal = signal.into();
        if !signal.trim().is_empty() {
            self.evidence
                .entry(pillar)
                .or_default()
                .push(signal.trim().to_string());
        }
        self
    }

    /// Render the corpus text with section markers.
    pub fn build_text(&self) -> String {
        let mut parts = Vec::new();
        let budgets = [
            (
                SectionKind::ArchitectureNarrative,
                &self.narrative,
                self.config.narrative_token_budget,
            ),
            (
                SectionKind::VisualTopology,
                &self.visual,
                self.config.visual_token_budget,
            ),
            (
                SectionKind::OperationalReality,
                &self.support_cases,
                self.config.support_cases_token_budget,
            ),
        ];
        for (kind, texts, budget) in budgets {
            if texts.is_empty() {
                continue;
            }
            let body = truncate_to_budget(&texts.join("\n\n"), budget);
            parts.push(format!("{}\n{}", kind.marker(), body));
        }

        let evidence = self.render_evidence();
        if !evidence.is_empty() {
            parts.push(format!(
                "{}\n{}",
                SectionKind::ConsolidatedEvidence.marker(),
                evidence
            ));
        }

        parts.join("\n\n")
    }

    /// Build and parse the corpus.
    pub fn build(&self, keep_legacy: bool) -> Corpus {
        Corpus::new(self.build_text(), keep_legacy)
    }

    fn render_evidence(&self) -> String {
        let mut lines = Vec::new();
        for (pillar, signals) in &self.evidence {
            let mut seen = HashSet::new();
            let kept: Vec<&str> = signals
                .iter()
                .filter(|s| seen.insert(s.to_lowercase().chars().take(140).collect::<String>()))
                .take(self.config.max_signals_per_pillar)
                .map(String::as_str)
                .collect();
            if !kept.is_empty() {
                lines.push(format!("**{}**: {}", pillar, kept.join("; ")));
            }
        }
        lines.join("\n")
    }
}

fn push_non_blank(target: &mut Vec<String>, text: String) {
    if !text.trim().is_empty() {
        target.push(text.trim().to_string());
    }
}
