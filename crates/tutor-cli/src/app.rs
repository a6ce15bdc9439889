use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use tutor_core::{
    ChatMessage, ChatSession, Conversation, ConversationStore, FileStore, RemoteTutor, Sender,
    Settings, TurnService, Tutor, TutorError,
};

use crate::commands::{handle_command, CommandResult};

/// Where turns are answered.
pub enum TurnBackend {
    /// Call the completion service directly with the locally configured key.
    Local,
    /// Relay turns through a proxy endpoint; the key stays on the server.
    Proxy(String),
}

pub struct SessionOptions {
    pub owner: String,
    pub data_dir: Option<PathBuf>,
    pub backend: TurnBackend,
}

pub async fn open_session(settings: &Settings, options: SessionOptions) -> Result<ChatSession> {
    let data_dir = options.data_dir.unwrap_or_else(|| settings.data_dir());
    let store = FileStore::open(&data_dir)
        .with_context(|| format!("Failed to open conversation store at {}", data_dir.display()))?
        .with_history_limit(settings.store.history_limit);

    let tutor: Arc<dyn TurnService> = match options.backend {
        TurnBackend::Local => Arc::new(Tutor::from_settings(settings)?),
        TurnBackend::Proxy(url) => {
            tracing::info!(endpoint = %url, "Relaying turns through proxy");
            Arc::new(RemoteTutor::new(url))
        }
    };

    let store: Arc<dyn ConversationStore> = Arc::new(store);
    Ok(ChatSession::open(options.owner, store, tutor).await?)
}

// ── Single prompt ───────────────────────────────────────────────────────

pub async fn run_single_prompt(session: &ChatSession, prompt: &str) -> Result<()> {
    let outcome = session.send(prompt).await.map_err(|e| anyhow::anyhow!(e.user_message()))?;
    println!("{}", outcome.reply.text);
    Ok(())
}

// ── Interactive loop ────────────────────────────────────────────────────

pub async fn run_repl(session: &ChatSession) -> Result<()> {
    println!("Chat Tutor - type /help for commands, /quit to leave.");
    if let Some(active) = session.active_conversation().await {
        println!("Current conversation: {}", active.title);
        print_history(session).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt_marker().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match handle_command(line) {
            CommandResult::Quit => break,
            CommandResult::Message(msg) => println!("{msg}"),
            CommandResult::NewConversation => {
                let conversation = session.new_conversation().await?;
                println!("Started: {}", conversation.title);
            }
            CommandResult::ListConversations => print_conversations(session).await?,
            CommandResult::SwitchConversation(n) => match nth_conversation(session, n).await? {
                Some(conversation) => {
                    let conversation = session.select(&conversation.id).await?;
                    println!("Switched to: {}", conversation.title);
                    print_history(session).await?;
                }
                None => println!("No conversation number {n}. See /list."),
            },
            CommandResult::DeleteConversation(position) => {
                let target = match position {
                    Some(n) => nth_conversation(session, n).await?,
                    None => session.active_conversation().await,
                };
                match target {
                    Some(conversation) => {
                        let active = session.delete(&conversation.id).await?;
                        println!("Deleted: {}", conversation.title);
                        println!("Current conversation: {}", active.title);
                    }
                    None => println!("Nothing to delete. See /list."),
                }
            }
            CommandResult::ShowHistory => print_history(session).await?,
            CommandResult::NotACommand => chat_turn(session, line).await?,
        }
    }

    Ok(())
}

/// Run one turn. Completion failures are shown and the loop continues;
/// only store failures outside the turn propagate.
async fn chat_turn(session: &ChatSession, text: &str) -> Result<()> {
    println!("Tutor is thinking...");
    match session.send(text).await {
        Ok(outcome) => {
            println!("{}", format_message(&outcome.reply));
            if let Some(title) = outcome.title {
                println!("(conversation titled \"{title}\")");
            }
        }
        Err(TutorError::TurnInProgress) => {
            println!("{}", TutorError::TurnInProgress.user_message());
        }
        Err(e) => {
            tracing::debug!(error = %e, "Turn failed");
            println!("[error] {}", e.user_message());
        }
    }
    Ok(())
}

async fn prompt_marker() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;
    Ok(())
}

async fn nth_conversation(session: &ChatSession, n: usize) -> Result<Option<Conversation>> {
    let conversations = session.conversations().await?;
    Ok(conversations.into_iter().nth(n.saturating_sub(1)))
}

async fn print_conversations(session: &ChatSession) -> Result<()> {
    let active_id = session.active_conversation().await.map(|c| c.id);
    let conversations = session.conversations().await?;
    for (i, conversation) in conversations.iter().enumerate() {
        let marker = if Some(&conversation.id) == active_id.as_ref() {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:>2}. {}  ({})",
            i + 1,
            conversation.title,
            conversation
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Stored messages of the active conversation followed by any local error
/// notices for it, all in timestamp order.
async fn print_history(session: &ChatSession) -> Result<()> {
    let Some(active) = session.active_conversation().await else {
        return Ok(());
    };
    let messages = session.messages().await?;
    let notices: Vec<_> = session
        .notices()
        .into_iter()
        .filter(|n| n.conversation_id == active.id)
        .collect();

    if messages.is_empty() && notices.is_empty() {
        println!("(no messages yet)");
        return Ok(());
    }

    let mut lines: Vec<(chrono::DateTime<chrono::Utc>, String)> = messages
        .iter()
        .map(|m| (m.timestamp, format_message(m)))
        .collect();
    lines.extend(
        notices
            .into_iter()
            .map(|n| (n.timestamp, format!("[error] {}", n.text))),
    );
    lines.sort_by_key(|(timestamp, _)| *timestamp);
    for (_, line) in lines {
        println!("{line}");
    }
    Ok(())
}

pub fn format_message(message: &ChatMessage) -> String {
    let who = match message.sender {
        Sender::User => "You",
        Sender::Assistant => "Tutor",
        Sender::Unknown => "?",
    };
    format!(
        "[{}] {who}: {}",
        message.timestamp.with_timezone(&Local).format("%H:%M"),
        message.text
    )
}
