use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::debug;
use wellarch_core::{CorpusBuilder, CorpusConfig, Pillar};

use super::{cancel_on_interrupt, log_progress};
use crate::config::ConfigLoader;
use crate::output;
use crate::provider::build_orchestrator;

#[derive(Args, Debug, Default)]
pub struct AssessArgs {
    /// Corpus text file (optionally split into `=== SECTION ===` blocks)
    #[arg(conflicts_with_all = ["narrative", "diagram", "cases", "evidence"])]
    pub corpus: Option<PathBuf>,

    /// Architecture narrative document (repeatable)
    #[arg(long, value_name = "FILE")]
    pub narrative: Vec<PathBuf>,

    /// Text extracted from an architecture diagram (repeatable)
    #[arg(long, value_name = "FILE")]
    pub diagram: Vec<PathBuf>,

    /// Support-case summaries (repeatable)
    #[arg(long, value_name = "FILE")]
    pub cases: Vec<PathBuf>,

    /// Evidence signal for one pillar, e.g. `reliability=Nightly geo-redundant backups`
    #[arg(long, value_name = "PILLAR=SIGNAL", value_parser = parse_evidence)]
    pub evidence: Vec<(Pillar, String)>,

    /// Token budget for each assembled section (overrides `[assessment.corpus]`)
    #[arg(long, value_name = "TOKENS")]
    pub section_budget: Option<usize>,

    /// Score deterministically without calling a language model
    #[arg(long)]
    pub offline: bool,

    /// Print the assessment as JSON
    #[arg(long)]
    pub json: bool,

    /// Also save the assessment as JSON (input for `wellarch rescore`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl AssessArgs {
    fn has_documents(&self) -> bool {
        !(self.narrative.is_empty()
            && self.diagram.is_empty()
            && self.cases.is_empty()
            && self.evidence.is_empty())
    }
}

fn parse_evidence(s: &str) -> Result<(Pillar, String), String> {
    let (pillar, signal) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PILLAR=SIGNAL, got '{s}'"))?;
    let pillar = pillar.parse::<Pillar>().map_err(|e| e.to_string())?;
    if signal.trim().is_empty() {
        return Err(format!("empty evidence signal for {pillar}"));
    }
    Ok((pillar, signal.trim().to_string()))
}

fn read(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {what} {}", path.display()))
}

/// The corpus file as given, or a sectioned corpus assembled from the documents.
fn corpus_text(args: &AssessArgs, config: &CorpusConfig) -> Result<String> {
    let text = match &args.corpus {
        Some(path) => read(path, "corpus")?,
        None if args.has_documents() => {
            let mut config = config.clone();
            if let Some(budget) = args.section_budget {
                config.narrative_token_budget = budget;
                config.visual_token_budget = budget;
                config.support_cases_token_budget = budget;
            }

            let mut builder = CorpusBuilder::new(config);
            for path in &args.narrative {
                builder = builder.narrative(read(path, "narrative")?);
            }
            for path in &args.diagram {
                builder = builder.visual(read(path, "diagram insights")?);
            }
            for path in &args.cases {
                builder = builder.support_cases(read(path, "support cases")?);
            }
            for (pillar, signal) in &args.evidence {
                builder = builder.evidence(*pillar, signal.as_str());
            }
            let text = builder.build_text();
            debug!(chars = text.len(), "assembled corpus");
            text
        }
        None => bail!(
            "give a corpus file, or documents via --narrative, --diagram, --cases or --evidence"
        ),
    };

    if text.trim().is_empty() {
        bail!("corpus is empty");
    }
    Ok(text)
}

pub async fn run(args: AssessArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let corpus = corpus_text(&args, &config.assessment.corpus)?;

    let orchestrator = build_orchestrator(config, args.offline)?;
    let cancel = cancel_on_interrupt();
    let assessment = orchestrator
        .run_with_cancellation(&corpus, &log_progress, &cancel)
        .await;

    output::emit(&assessment, args.json, args.output.as_deref())
}
