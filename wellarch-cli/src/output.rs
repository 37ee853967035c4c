//! Assessment rendering.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use wellarch_core::{Assessment, AssessmentStatus, Confidence, Priority};

/// Write `assessment` to `output` as JSON, then print it as JSON or tables.
pub fn emit(assessment: &Assessment, json: bool, output: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(assessment)?;
    if let Some(path) = output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Assessment saved to {}", path.display());
    }

    if json {
        println!("{rendered}");
    } else {
        print_summary(assessment);
    }
    Ok(())
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).fg(Color::Cyan))
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn confidence_color(confidence: Confidence) -> Color {
    match confidence {
        Confidence::High => Color::Green,
        Confidence::Medium => Color::Yellow,
        Confidence::Low => Color::Red,
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Critical => Color::Red,
        Priority::High => Color::Yellow,
        Priority::Medium => Color::White,
        Priority::Low => Color::DarkGrey,
    }
}

fn status_label(status: AssessmentStatus) -> &'static str {
    match status {
        AssessmentStatus::Completed => "completed",
        AssessmentStatus::Degraded => "degraded (some pillars used deterministic scoring)",
        AssessmentStatus::Failed => "failed (no pillar reached the language model)",
    }
}

pub fn print_summary(assessment: &Assessment) {
    println!("Assessment {}", assessment.id);
    println!("Status: {}", status_label(assessment.status));
    println!("Overall score: {:.1}/100", assessment.overall_score);
    if let Some(previous) = assessment.score_history.last() {
        println!(
            "Previous score: {:.1}/100 ({})",
            previous.overall_score,
            previous.timestamp.format("%Y-%m-%d %H:%M UTC")
        );
    }
    println!();

    let mut pillars = new_table();
    pillars.set_header(header(&["Pillar", "Score", "Confidence", "Raw sum", "Notes"]));
    for pillar in &assessment.pillars {
        let mut notes = Vec::new();
        if pillar.normalization_applied {
            notes.push(format!("normalized x{:.2}", pillar.normalization_factor));
        }
        if pillar.fallback_used {
            notes.push("deterministic fallback".to_string());
        }
        pillars.add_row(vec![
            Cell::new(pillar.pillar.display_name()),
            Cell::new(pillar.overall_score),
            Cell::new(pillar.confidence).fg(confidence_color(pillar.confidence)),
            Cell::new(pillar.raw_subcategory_sum),
            Cell::new(notes.join(", ")),
        ]);
    }
    println!("{pillars}");

    if !assessment.conflicts.is_empty() {
        println!();
        println!("Cross-pillar considerations:");
        for conflict in &assessment.conflicts {
            println!(
                "  [{} / {}] {}",
                conflict.pillar_a, conflict.pillar_b, conflict.description
            );
            println!("    {}", conflict.mitigation);
        }
    }

    if assessment.recommendations.is_empty() {
        return;
    }
    println!();
    let mut recs = new_table();
    recs.set_header(header(&["Priority", "Pillar", "Recommendation", "Also raised by"]));
    let mut sorted: Vec<_> = assessment.recommendations.iter().collect();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
    for rec in sorted {
        let also: Vec<&str> = rec.also_raised_by.iter().map(|p| p.display_name()).collect();
        recs.add_row(vec![
            Cell::new(rec.priority).fg(priority_color(rec.priority)),
            Cell::new(rec.pillar.display_name()),
            Cell::new(&rec.title),
            Cell::new(also.join(", ")),
        ]);
    }
    println!("{recs}");
}
