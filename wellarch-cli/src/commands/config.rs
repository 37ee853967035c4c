use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::ConfigLoader;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the merged configuration (user, then project)
    Show,
    /// Show where configuration files are read from
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", toml::to_string_pretty(&config)?);
    let key_state = if config.provider.azure_api_key.is_some() {
        "set"
    } else {
        "not set"
    };
    println!("# Azure OpenAI key: {key_state}");
    Ok(())
}

fn describe(path: &Path) -> String {
    let state = if path.exists() { "found" } else { "absent" };
    format!("{} ({state})", path.display())
}

fn show_paths() -> Result<()> {
    match ConfigLoader::user_config_path() {
        Some(path) => println!("User config:    {}", describe(&path)),
        None => println!("User config:    unavailable on this platform"),
    }
    println!(
        "Project config: {}",
        describe(&ConfigLoader::project_config_path())
    );
    Ok(())
}
