//! Concept catalog inspection.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use wellarch_core::{ConceptCatalog, Pillar, Tier};

use crate::config::ConfigLoader;
use crate::provider::build_catalogs;

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// List the catalog of every pillar
    List,
    /// Show one pillar's concepts and subcategories
    Show {
        /// Pillar name or code (e.g. reliability, SE, cost)
        pillar: Pillar,
    },
}

pub fn run(args: CatalogArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let catalogs = build_catalogs(&config)?;
    let source = match &config.catalog.dir {
        Some(dir) => dir.display().to_string(),
        None => "built-in".to_string(),
    };

    match args.command {
        CatalogCommands::List => {
            let mut table = new_table(&[
                "Pillar",
                "Code",
                "Critical",
                "Important",
                "Nice",
                "Subcategories",
            ]);
            for pillar in Pillar::ALL {
                match catalogs.get_concepts(pillar) {
                    Ok(catalog) => {
                        let mut row = vec![
                            Cell::new(pillar.display_name()),
                            Cell::new(pillar.code()),
                        ];
                        row.extend(
                            Tier::ALL
                                .iter()
                                .map(|t| Cell::new(catalog.concepts.tier(*t).len())),
                        );
                        row.push(Cell::new(catalog.subcategories.len()));
                        table.add_row(row);
                    }
                    Err(e) => {
                        table.add_row(vec![
                            Cell::new(pillar.display_name()),
                            Cell::new(pillar.code()),
                            Cell::new(e).fg(Color::Red),
                        ]);
                    }
                }
            }
            println!("Catalogs: {source}");
            println!("{table}");
        }
        CatalogCommands::Show { pillar } => {
            let catalog = catalogs
                .get_concepts(pillar)
                .with_context(|| format!("loading {pillar} catalog from {source}"))?;
            print_catalog(&catalog);
        }
    }
    Ok(())
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

fn tier_label(tier: Tier) -> &'static str {
    match tier {
        Tier::Critical => "Critical",
        Tier::Important => "Important",
        Tier::NiceToHave => "Nice to have",
    }
}

fn print_catalog(catalog: &ConceptCatalog) {
    println!("{} ({})", catalog.pillar, catalog.pillar.prefix());
    println!();

    let mut tiers = new_table(&["Tier", "Weight", "Concepts"]);
    for tier in Tier::ALL {
        tiers.add_row(vec![
            Cell::new(tier_label(tier)),
            Cell::new(format!("{:.0}%", tier.weight() * 100.0)),
            Cell::new(catalog.concepts.tier(tier).join(", ")),
        ]);
    }
    println!("{tiers}");

    if !catalog.subcategories.is_empty() {
        let mut subs = new_table(&["Subcategory", "Practices", "Expected concepts"]);
        for sub in &catalog.subcategories {
            subs.add_row(vec![
                Cell::new(&sub.name),
                Cell::new(sub.practices.join(", ")),
                Cell::new(sub.concepts.join(", ")),
            ]);
        }
        println!("{subs}");
    }

    if !catalog.advanced_practices.is_empty() {
        println!("Advanced practices: {}", catalog.advanced_practices.join(", "));
    }
    if !catalog.gap_patterns.is_empty() {
        println!("Gap patterns: {}", catalog.gap_patterns.join(", "));
    }
}
