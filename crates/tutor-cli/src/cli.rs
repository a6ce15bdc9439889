use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "chat-tutor")]
#[command(about = "Chat Tutor - a patient study companion in your terminal")]
#[command(version)]
pub struct Cli {
    /// Owner id the conversations belong to
    #[arg(short, long, env = "CHAT_TUTOR_OWNER", default_value = "local")]
    pub owner: String,

    /// Path to a config file instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding conversation documents
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Relay turns through a proxy endpoint instead of calling the
    /// completion service directly (use "default" for [proxy].endpoint_url)
    #[arg(long)]
    pub proxy_url: Option<String>,

    /// Send a single message to the current conversation and exit
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Completion model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Allow longer tutoring answers. The proxy sets its own limit, so this
    /// only applies when calling the completion service directly.
    #[arg(long, conflicts_with = "proxy_url")]
    pub long_answers: bool,
}
