use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pagecraft_workspace::{WorkspaceConfig, DEFAULT_CONFIG_NAME};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Page name
    #[arg(short, long, default_value = "home")]
    pub name: String,

    /// Directory the page records are saved in
    #[arg(short, long, default_value = "pages")]
    pub pages_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let root = PathBuf::from(cwd);
    let config_path = root.join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Pagecraft workspace...".bright_blue().bold());

    let pages_dir = root.join(&args.pages_dir);
    if !pages_dir.exists() {
        std::fs::create_dir_all(&pages_dir)?;
        println!("  {} Created {}/", "✓".green(), args.pages_dir);
    }

    let config = WorkspaceConfig {
        document_name: args.name.clone(),
        save_path: Some(format!("{}/{}.json", args.pages_dir, args.name)),
        ..Default::default()
    };
    config.write(&root)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Workspace initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Write intents to intents.json, e.g. [{{\"action\": \"add\", \"elementType\": \"hero\"}}]");
    println!("  2. Run: pagecraft apply intents.json");
    println!("  3. Run: pagecraft outline");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_config() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();

        init(
            InitArgs {
                name: "landing".to_string(),
                pages_dir: "site".to_string(),
                force: false,
            },
            &cwd,
        )
        .unwrap();

        let config = WorkspaceConfig::load(dir.path()).unwrap();
        assert_eq!(config.document_name, "landing");
        assert_eq!(config.save_path.as_deref(), Some("site/landing.json"));
        assert!(dir.path().join("site").is_dir());
    }

    #[test]
    fn test_init_keeps_existing_config_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        let args = |name: &str, force| InitArgs {
            name: name.to_string(),
            pages_dir: "pages".to_string(),
            force,
        };

        init(args("first", false), &cwd).unwrap();
        init(args("second", false), &cwd).unwrap();
        assert_eq!(WorkspaceConfig::load(dir.path()).unwrap().document_name, "first");

        init(args("second", true), &cwd).unwrap();
        assert_eq!(WorkspaceConfig::load(dir.path()).unwrap().document_name, "second");
    }
}
