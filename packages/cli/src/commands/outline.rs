use super::load_records;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pagecraft_evaluator::build_hierarchy;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct OutlineArgs {
    /// Print the tree as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn outline(args: OutlineArgs, cwd: &str) -> Result<()> {
    let records = load_records(&PathBuf::from(cwd))?;
    let hierarchy = build_hierarchy(&records);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hierarchy)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "Page is empty".dimmed());
        return Ok(());
    }

    print!("{}", hierarchy.outline());
    println!();
    println!(
        "{} {} nodes, {} roots",
        "•".dimmed(),
        hierarchy.node_count(),
        hierarchy.roots.len()
    );

    // Corrupted records still render; the skipped parts are listed here
    if !hierarchy.is_clean() {
        println!();
        println!("{} {} issue(s):", "⚠️".yellow(), hierarchy.issues.len());
        for issue in &hierarchy.issues {
            println!("  {} {}", "-".yellow(), issue.to_string().yellow());
        }
    }

    Ok(())
}
