use clap::Parser;
use tutor_cli::commands::{handle_command, CommandResult};

// ========================================================================
// Command Parsing Tests (commands.rs)
// ========================================================================

#[test]
fn test_help_command() {
    match handle_command("/help") {
        CommandResult::Message(msg) => {
            assert!(msg.contains("Chat Tutor Commands"));
            assert!(msg.contains("/switch <n>"));
            assert!(msg.contains("/delete [n]"));
        }
        other => panic!("expected help text, got {other:?}"),
    }
    assert_eq!(handle_command("/h"), handle_command("/help"));
}

#[test]
fn test_quit_aliases() {
    for input in ["/exit", "/quit", "/q", "  /quit  "] {
        assert_eq!(handle_command(input), CommandResult::Quit, "{input}");
    }
}

#[test]
fn test_conversation_commands() {
    assert_eq!(handle_command("/new"), CommandResult::NewConversation);
    assert_eq!(handle_command("/list"), CommandResult::ListConversations);
    assert_eq!(handle_command("/conversations"), CommandResult::ListConversations);
    assert_eq!(handle_command("/history"), CommandResult::ShowHistory);
}

#[test]
fn test_switch_requires_positive_number() {
    assert_eq!(handle_command("/switch 2"), CommandResult::SwitchConversation(2));
    assert_eq!(handle_command("/switch   3 "), CommandResult::SwitchConversation(3));

    for bad in ["/switch", "/switch 0", "/switch two", "/switch -1"] {
        assert!(
            matches!(handle_command(bad), CommandResult::Message(ref m) if m.starts_with("Usage")),
            "{bad}"
        );
    }
}

#[test]
fn test_delete_defaults_to_current() {
    assert_eq!(handle_command("/delete"), CommandResult::DeleteConversation(None));
    assert_eq!(handle_command("/delete 4"), CommandResult::DeleteConversation(Some(4)));
    assert!(matches!(handle_command("/delete x"), CommandResult::Message(_)));
}

#[test]
fn test_version_command() {
    match handle_command("/version") {
        CommandResult::Message(msg) => assert!(msg.starts_with("Chat Tutor v")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_unknown_command_and_plain_text() {
    match handle_command("/derive") {
        CommandResult::Message(msg) => assert!(msg.contains("Unknown command: /derive")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(handle_command("What is a derivative?"), CommandResult::NotACommand);
    assert_eq!(handle_command("2 / 3 is a fraction"), CommandResult::NotACommand);
}

// ========================================================================
// Argument Parsing Tests (cli.rs)
// ========================================================================

#[test]
fn test_long_answers_conflicts_with_proxy_url() {
    let err = tutor_cli::Cli::try_parse_from([
        "chat-tutor",
        "--long-answers",
        "--proxy-url",
        "http://127.0.0.1:3000/api/chat-tutor",
    ])
    .unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
}

#[test]
fn test_long_answers_and_proxy_url_parse_alone() {
    let cli = tutor_cli::Cli::try_parse_from(["chat-tutor", "--long-answers"]).unwrap();
    assert!(cli.long_answers);
    assert!(cli.proxy_url.is_none());

    let cli = tutor_cli::Cli::try_parse_from(["chat-tutor", "--proxy-url", "default"]).unwrap();
    assert!(!cli.long_answers);
    assert_eq!(cli.proxy_url.as_deref(), Some("default"));
}
