//! Advisory progress reporting for an assessment run.

use std::fmt;

use serde::Serialize;

use crate::pillar::Pillar;

/// Ordered run phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initialization,
    DocumentProcessing,
    CorpusAssembly,
    PillarEvaluation,
    CrossPillarAlignment,
    Synthesis,
    Finalization,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Initialization,
        Phase::DocumentProcessing,
        Phase::CorpusAssembly,
        Phase::PillarEvaluation,
        Phase::CrossPillarAlignment,
        Phase::Synthesis,
        Phase::Finalization,
    ];

    /// Start and end percentage of this phase.
    pub fn range(&self) -> (u8, u8) {
        match self {
            Phase::Initialization => (0, 5),
            Phase::DocumentProcessing => (5, 15),
            Phase::CorpusAssembly => (15, 20),
            Phase::PillarEvaluation => (20, 80),
            Phase::CrossPillarAlignment => (80, 90),
            Phase::Synthesis => (90, 95),
            Phase::Finalization => (95, 100),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Initialization => "Initialization",
            Phase::DocumentProcessing => "Document Processing",
            Phase::CorpusAssembly => "Corpus Assembly",
            Phase::PillarEvaluation => "Pillar Evaluation",
            Phase::CrossPillarAlignment => "Cross-Pillar Alignment",
            Phase::Synthesis => "Synthesis",
            Phase::Finalization => "Finalization",
        };
        f.write_str(s)
    }
}

/// Overall percentage for `fraction` (clamped to 0..=1) of the way through `phase`.
pub fn phase_progress(phase: Phase, fraction: f64) -> u8 {
    let (start, end) = phase.range();
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    start + (f64::from(end - start) * fraction).round() as u8
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub percent: u8,
    pub message: String,
    /// Set on per-pillar completion updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pillar: Option<Pillar>,
}

impl ProgressUpdate {
    pub fn new(phase: Phase, fraction: f64, message: impl Into<String>) -> Self {
        Self {
            phase,
            percent: phase_progress(phase, fraction),
            message: message.into(),
            pillar: None,
        }
    }

    #[must_use]
    pub fn for_pillar(mut self, pillar: Pillar) -> Self {
        self.pillar = Some(pillar);
        self
    }
}

/// Receives progress notifications. Reporting never influences the run.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _update: ProgressUpdate) {}
}
