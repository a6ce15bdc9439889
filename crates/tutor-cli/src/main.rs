use anyhow::{Context, Result};
use clap::Parser;

mod app;
mod cli;
mod commands;

use app::{SessionOptions, TurnBackend};
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(ref path) => tutor_core::Settings::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => tutor_core::Settings::load(),
    };
    if let Some(ref model) = cli.model {
        settings.llm.model = model.clone();
    }
    if cli.long_answers {
        settings.llm.max_tokens = tutor_core::constants::completion::LONG_MAX_TOKENS;
    }

    let backend = match cli.proxy_url {
        Some(url) if url == "default" => TurnBackend::Proxy(settings.proxy.endpoint_url.clone()),
        Some(url) => TurnBackend::Proxy(url),
        None => TurnBackend::Local,
    };

    let session = app::open_session(
        &settings,
        SessionOptions {
            owner: cli.owner,
            data_dir: cli.data_dir,
            backend,
        },
    )
    .await?;

    if let Some(prompt) = cli.prompt {
        app::run_single_prompt(&session, &prompt).await?;
    } else {
        app::run_repl(&session).await?;
    }

    Ok(())
}
