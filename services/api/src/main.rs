use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use storyteller_api::config::Config;
use storyteller_api::openai_adapter::OpenAIAdapter;
use storyteller_api::prompt_loader;
use storyteller_api::routes;
use storyteller_api::state::AppState;
use storyteller_core::provider::{SpeechProvider, StoryProvider};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Visual-novel storyteller backend")]
struct Cli {
    /// Address to listen on. Overrides BIND_ADDRESS.
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Directory holding the stored scene tree. Overrides GAME_ASSETS_DIR.
    #[arg(long)]
    assets_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(dir) = args.assets_dir {
        config.assets_dir = Some(dir);
    }
    match &config.assets_dir {
        Some(dir) if !dir.is_dir() => {
            tracing::warn!("scene directory {} does not exist; generation will fail", dir.display())
        }
        Some(dir) => tracing::info!("scene archive enabled at {}", dir.display()),
        None => tracing::info!("scene archive disabled"),
    }

    // --- 4. Load Prompts ---
    let prompts = prompt_loader::load_prompts(config.prompts_dir.as_deref())
        .context("Failed to load LLM prompts")?;

    // --- 5. Initialize API Client ---
    let adapter = Arc::new(OpenAIAdapter::connect(&config)?);
    let story: Arc<dyn StoryProvider> = adapter.clone();
    let speech: Arc<dyn SpeechProvider> = adapter.clone();

    // --- 6. Serve ---
    let state = AppState::new(&config, story, speech, prompts);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!(
        "Storyteller listening on {} (reply schema {:?})",
        config.bind_address,
        config.reply_schema
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match adapter.client().stats() {
        Ok(stats) => tracing::info!(
            "token usage: total={} prompt={} completion={} across {} requests",
            stats.total_tokens(),
            stats.prompt_tokens(),
            stats.completion_tokens(),
            stats.requests()
        ),
        Err(e) => tracing::warn!("could not read token usage: {:#}", e),
    }
    tracing::info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl-C, shutting down...");
}
