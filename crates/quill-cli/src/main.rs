mod config;
mod generate_cmd;
mod plan_cmd;
mod resume_cmd;
#[cfg(test)]
mod test_util;

use clap::{Parser, Subcommand};

use config::QuillConfig;

#[derive(Parser)]
#[command(name = "quill", about = "Generate knowledge-base notes from a plan document")]
struct Cli {
    /// Vault root directory (overrides QUILL_VAULT env var)
    #[arg(long, global = true)]
    vault: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a quill config file
    Init {
        /// Vault root directory to record in the config
        #[arg(long, default_value = ".")]
        vault_root: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate notes for every proposal in a plan
    Generate {
        /// Path to the plan markdown file
        plan: String,
        /// Override the configured notes directory (relative to the vault root)
        #[arg(long)]
        notes_dir: Option<String>,
        /// Override the configured retry budget per note
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Retry the proposals the last run recorded as failed
    Resume {
        /// Path to the plan markdown file
        plan: String,
    },
    /// Plan inspection
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Parse a plan and show its proposals without generating anything
    Show {
        /// Path to the plan markdown file
        plan: String,
    },
}

/// Execute the `quill init` command: write config file.
fn cmd_init(vault_root: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        vault: config::VaultSection {
            root: vault_root.to_string(),
            ..config::VaultSection::default()
        },
        ..config::ConfigFile::default()
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  vault.root = {vault_root}");
    println!("  llm.model = {}", cfg.llm.model);
    println!();
    println!("Next: export QUILL_API_KEY, put one template per note kind under");
    println!("`{vault_root}/templates/`, then run `quill generate <plan.md>`.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { vault_root, force } => {
            cmd_init(&vault_root, force)?;
        }
        Commands::Generate {
            plan,
            notes_dir,
            max_retries,
        } => {
            let mut resolved = QuillConfig::resolve(cli.vault.as_deref())?;
            if let Some(dir) = notes_dir {
                resolved.notes_dir = dir;
            }
            generate_cmd::run_generate(&resolved, &plan, max_retries).await?;
        }
        Commands::Resume { plan } => {
            let resolved = QuillConfig::resolve(cli.vault.as_deref())?;
            resume_cmd::run_resume(&resolved, &plan).await?;
        }
        Commands::Plan { command } => match command {
            PlanCommands::Show { plan } => {
                plan_cmd::run_plan_show(&plan)?;
            }
        },
    }

    Ok(())
}
