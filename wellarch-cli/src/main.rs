use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;
mod provider;

#[derive(Parser)]
#[command(name = "wellarch")]
#[command(about = "Assess architecture documents against the Well-Architected pillars")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a corpus file
    Assess(commands::assess::AssessArgs),
    /// Re-run scoring on a saved assessment
    Rescore(commands::rescore::RescoreArgs),
    /// Inspect concept catalogs
    Catalog(commands::catalog::CatalogArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Assess(args) => commands::assess::run(args).await,
        Commands::Rescore(args) => commands::rescore::run(args).await,
        Commands::Catalog(args) => commands::catalog::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
