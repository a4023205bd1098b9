mod cli;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::{CliConfig, Settings};
use parley_ai::OllamaClient;
use parley_core::channel::{DiscordChannel, DiscordConfig};
use parley_core::runtime::Bot;
use parley_core::{GenerationCoordinator, PromptLibrary, SessionState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load `.env` when present.
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_dir.as_deref())?;

    let file_config = match &cli.config {
        Some(path) => CliConfig::load_from_path(Some(path.clone())),
        None => CliConfig::load(),
    };
    let settings = Settings::resolve(&cli.settings, &file_config);
    settings.validate()?;

    match cli.command {
        Some(Commands::Personas) => list_personas(&settings),
        Some(Commands::Run) | None => run_bot(settings).await,
    }
}

fn list_personas(settings: &Settings) -> Result<()> {
    let prompts = PromptLibrary::with_base_prompt("", &settings.characters_dir);
    let personas = prompts.list_personas();
    if personas.is_empty() {
        println!(
            "No personas found in {}",
            settings.characters_dir.display()
        );
    }
    for persona in personas {
        println!("{}", persona);
    }
    Ok(())
}

async fn run_bot(settings: Settings) -> Result<()> {
    let token = settings.require_token()?;

    let prompts = PromptLibrary::load(&settings.base_prompt, &settings.characters_dir)
        .context("Failed to load prompts")?;
    let personas = prompts.list_personas();
    if personas.is_empty() {
        warn!(
            "No personas found in {}; only /clearmemory will be available",
            settings.characters_dir.display()
        );
    }

    let backend = OllamaClient::new(settings.ollama.clone()).context("Failed to create Ollama client")?;
    info!(
        "Using Ollama model {} at {}",
        settings.ollama.model, settings.ollama.base_url
    );

    let discord = Arc::new(DiscordChannel::new(DiscordConfig::new(token)));
    let state = Arc::new(SessionState::new(&settings.session));
    let coordinator = Arc::new(GenerationCoordinator::new(
        state,
        Arc::new(backend),
        Arc::new(prompts),
        discord.clone(),
        settings.session.clone(),
    ));
    let bot = Arc::new(Bot::new(
        discord.clone(),
        coordinator,
        personas,
        settings.bot.clone(),
    ));

    tokio::select! {
        _ = bot.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
            discord.stop_polling();
        }
    }
    Ok(())
}
