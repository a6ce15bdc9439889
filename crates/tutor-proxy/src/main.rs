use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use tutor_core::Settings;
use tutor_proxy::{create_router, AppState};

#[derive(Parser)]
#[command(name = "tutor-proxy")]
#[command(about = "Chat Tutor proxy endpoint - relays chat turns to the completion service")]
#[command(version)]
struct Cli {
    /// Address to listen on (overrides [proxy].bind_addr)
    #[arg(short, long)]
    bind: Option<String>,

    /// Path to a config file instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Completion model to use
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(ref path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Settings::load(),
    };
    if let Some(ref model) = cli.model {
        settings.llm.model = model.clone();
    }
    let bind = cli.bind.unwrap_or_else(|| settings.proxy.bind_addr.clone());

    let state = AppState::from_settings(&settings).context("Invalid tutor settings")?;
    let router = create_router(state);

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(addr = %bind, model = %settings.llm.model, "Chat tutor proxy listening");

    axum::serve(listener, router).await?;

    Ok(())
}
