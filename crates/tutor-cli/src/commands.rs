/// Result of processing a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Quit the application.
    Quit,
    /// Start a fresh conversation.
    NewConversation,
    /// List the owner's conversations, newest first.
    ListConversations,
    /// Switch to the conversation at this 1-based position in the list.
    SwitchConversation(usize),
    /// Delete the conversation at this position, or the active one.
    DeleteConversation(Option<usize>),
    /// Reprint the active conversation's messages.
    ShowHistory,
    /// Not a command - treat as a chat message.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,
        "/new" => CommandResult::NewConversation,
        "/list" | "/conversations" => CommandResult::ListConversations,
        "/history" => CommandResult::ShowHistory,
        "/switch" => match parse_position(arg) {
            Some(n) => CommandResult::SwitchConversation(n),
            None => CommandResult::Message("Usage: /switch <n>  (see /list for numbers)".into()),
        },
        "/delete" => {
            if arg.is_empty() {
                CommandResult::DeleteConversation(None)
            } else {
                match parse_position(arg) {
                    Some(n) => CommandResult::DeleteConversation(Some(n)),
                    None => CommandResult::Message("Usage: /delete [n]  (see /list for numbers)".into()),
                }
            }
        }
        "/version" => CommandResult::Message(format!("Chat Tutor v{}", env!("CARGO_PKG_VERSION"))),
        _ => {
            if input.starts_with('/') {
                CommandResult::Message(format!("Unknown command: {cmd}. Type /help for commands."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

fn parse_position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok().filter(|n| *n > 0)
}

fn show_help() -> CommandResult {
    let help_text = "\
╭─ Chat Tutor Commands ──────────────────────────────────────────╮

  CONVERSATIONS
    /new                      Start a fresh conversation
    /list                     List your conversations (newest first)
    /switch <n>               Open conversation number n
    /delete [n]               Delete conversation n (default: current)
    /history                  Show messages of the current conversation

  OTHER
    /help, /h                 Show this help message
    /version                  Show version information
    /exit, /quit, /q          Quit the application

  Anything else you type is sent to the tutor.

╰────────────────────────────────────────────────────────────────╯";

    CommandResult::Message(help_text.into())
}
