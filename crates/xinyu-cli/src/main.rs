use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use xinyu_application::ConversationController;
use xinyu_core::{ChatBackend, TargetLanguage};
use xinyu_interaction::{ClientConfig, HttpChatBackend};

mod logging;
mod render;
mod repl;

#[derive(Parser)]
#[command(name = "xinyu")]
#[command(about = "Xinyu - emotional-support chat client", long_about = None)]
struct Cli {
    /// Backend address, overrides config.toml and XINYU_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    /// Path to config.toml (default: ~/.config/xinyu/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start with the translation overlay switched on
    #[arg(long)]
    translate: bool,

    /// Translation target: auto, zh-CN or en
    #[arg(long)]
    lang: Option<TargetLanguage>,

    /// Log to stderr instead of the log file
    #[arg(long)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Check that the backend is reachable
    Health,
    /// Detect the language of a text
    Detect { text: String },
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load_from(path)?
            .with_base_url_override(std::env::var(xinyu_interaction::config::BASE_URL_ENV).ok()),
        None => ClientConfig::load()?,
    };
    let mut config = config.with_base_url_override(cli.base_url.clone());
    if cli.translate {
        config.translation.enabled = true;
    }
    if let Some(lang) = cli.lang {
        config.translation.target_language = lang;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = if cli.log_stderr {
        logging::init_stderr();
        None
    } else {
        Some(logging::init_file(&ClientConfig::config_dir()?.join("logs"))?)
    };

    let config = load_config(&cli)?;
    tracing::info!(base_url = %config.backend.base_url, "Starting xinyu client");

    let backend = Arc::new(HttpChatBackend::from_config(&config.backend));

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let controller = ConversationController::with_policy(
                backend,
                config.translation_settings(),
                config.batch_policy(),
            );
            repl::run(controller).await?;
        }
        Commands::Health => {
            let health = backend.health().await?;
            if !health.is_ok() {
                return Err(anyhow!("backend reported {}: {}", health.status, health.message));
            }
            println!("{}", health.message);
        }
        Commands::Detect { text } => {
            println!("{}", backend.detect_language(&text).await?);
        }
    }

    Ok(())
}
