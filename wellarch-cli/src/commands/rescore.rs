use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use wellarch_core::Assessment;

use crate::config::ConfigLoader;
use crate::output;
use crate::provider::build_orchestrator;

#[derive(Args, Debug)]
pub struct RescoreArgs {
    /// Assessment JSON written by `wellarch assess --output`
    pub assessment: PathBuf,

    /// Score deterministically without calling a language model
    #[arg(long)]
    pub offline: bool,

    /// Print the assessment as JSON
    #[arg(long)]
    pub json: bool,

    /// Where to save the rescored assessment
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn load_assessment(path: &std::path::Path) -> Result<Assessment> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a saved assessment", path.display()))
}

pub async fn run(args: RescoreArgs) -> Result<()> {
    let existing = load_assessment(&args.assessment)?;
    info!(id = %existing.id, history = existing.score_history.len(), "rescoring assessment");

    let orchestrator = build_orchestrator(ConfigLoader::load()?, args.offline)?;
    let rescored = orchestrator.rescore(&existing).await;

    output::emit(&rescored, args.json, args.output.as_deref())
}
