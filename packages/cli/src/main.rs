mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, init, outline, resolve, ApplyArgs, InitArgs, OutlineArgs, ResolveArgs};

/// Pagecraft CLI - edit page documents from the terminal
#[derive(Parser, Debug)]
#[command(name = "pagecraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log editor activity (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Pagecraft workspace
    Init(InitArgs),

    /// Apply assistant intents to the page
    Apply(ApplyArgs),

    /// Print the page structure
    Outline(OutlineArgs),

    /// Print the effective styles of a node
    Resolve(ResolveArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Init(args) => init(args, &cwd),
                Command::Apply(args) => apply(args, &cwd),
                Command::Outline(args) => outline(args, &cwd),
                Command::Resolve(args) => resolve(args, &cwd),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
