use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pagecraft_workspace::{CommandOutcome, Intent, WorkspaceServer};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// JSON file with one intent or an array of intents
    pub intents: PathBuf,

    /// Keep going after a rejected intent
    #[arg(short, long)]
    pub keep_going: bool,

    /// Run the intents without saving the page
    #[arg(long)]
    pub dry_run: bool,
}

/// Accepts a single intent object or an array of them
pub(crate) fn parse_intents(source: &str) -> Result<Vec<Intent>> {
    let value: serde_json::Value = serde_json::from_str(source)?;
    let intents = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(intents)
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let root = PathBuf::from(cwd);
    let source = std::fs::read_to_string(root.join(&args.intents))
        .with_context(|| format!("reading {}", args.intents.display()))?;
    let intents = parse_intents(&source).with_context(|| format!("parsing {}", args.intents.display()))?;

    let runtime = tokio::runtime::Runtime::new()?;
    let rejected = runtime.block_on(run(&root, intents, &args))?;

    println!();
    if rejected == 0 {
        println!("{}", "✅ All intents applied".green().bold());
        Ok(())
    } else {
        anyhow::bail!("{} intent(s) rejected", rejected)
    }
}

async fn run(root: &Path, intents: Vec<Intent>, args: &ApplyArgs) -> Result<usize> {
    let mut server = WorkspaceServer::open(root)?;
    if args.dry_run {
        server = server.without_sink();
    }
    let (handle, task) = server.spawn();

    println!("{}", "🧱 Applying intents...".bright_blue().bold());

    let mut rejected = 0;
    for intent in intents {
        let action = intent.action.clone();
        match handle.submit_command(intent).await {
            Ok(outcome) => print_outcome(&action, &outcome),
            Err(err) => {
                rejected += 1;
                println!("  {} {} {}", "✗".red(), action.bold(), err.user_message().red());
                if !args.keep_going {
                    break;
                }
            }
        }
    }

    if !args.dry_run {
        if let Err(err) = handle.save().await {
            println!("  {} {}", "⚠️".yellow(), err.user_message().yellow());
        }
    } else {
        println!("  {} dry run, nothing saved", "•".dimmed());
    }

    handle.shutdown().await?;
    task.await?;

    Ok(rejected)
}

fn print_outcome(action: &str, outcome: &CommandOutcome) {
    let primary = outcome
        .primary
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_default();
    println!(
        "  {} {} {} {}",
        "✓".green(),
        action.bold(),
        primary.cyan(),
        format!(
            "(v{}: +{} ~{} -{})",
            outcome.version,
            outcome.created.len(),
            outcome.updated.len(),
            outcome.removed.len()
        )
        .dimmed()
    );
}
