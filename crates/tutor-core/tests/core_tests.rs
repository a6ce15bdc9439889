use chrono::{TimeZone, Utc};
use tutor_core::config::Settings;
use tutor_core::*;
use tempfile::TempDir;

// ========================================================================
// Settings Tests (config/mod.rs)
// ========================================================================

#[test]
fn test_settings_default_values() {
    let settings = Settings::default();

    assert_eq!(settings.llm.model, "gemini-2.0-flash");
    assert_eq!(settings.llm.api_key_env, "THALARIS_API_KEY");
    assert_eq!(settings.llm.max_tokens, 500);
    assert!((settings.llm.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(settings.llm.title_max_tokens, 20);
    assert!((settings.llm.title_temperature - 0.5).abs() < f32::EPSILON);
    assert!(settings.llm.base_url.is_none());
    assert_eq!(settings.base_url(), "https://llmapi.thalarislabs.com");

    assert!(!settings.tutor.system_prompt.is_empty());
    assert!(!settings.tutor.title_prompt.is_empty());
    assert_eq!(settings.store.history_limit, 50);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_load_from_partial_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        "[llm]\nmodel = \"test-model\"\nmax_tokens = 2000\n\n[store]\nhistory_limit = 0\n",
    )
    .unwrap();

    let loaded = Settings::load_from(&config_path).unwrap();
    assert_eq!(loaded.llm.model, "test-model");
    assert_eq!(loaded.llm.max_tokens, 2000);
    assert_eq!(loaded.llm.api_key_env, "THALARIS_API_KEY");
    assert_eq!(loaded.store.history_limit, 0);
    assert_eq!(loaded.tutor.system_prompt, Settings::default().tutor.system_prompt);
}

#[test]
fn test_settings_rejects_empty_system_prompt() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[tutor]\nsystem_prompt = \"  \"\n").unwrap();

    let err = Settings::load_from(&config_path).unwrap_err();
    assert!(matches!(err, TutorError::Config(_)));
}

#[test]
fn test_settings_rejects_malformed_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[llm\nmodel = ").unwrap();
    assert!(matches!(
        Settings::load_from(&config_path),
        Err(TutorError::Config(_))
    ));
}

#[test]
fn test_settings_api_key_reads_from_env() {
    std::env::set_var("TEST_API_KEY_CHAT_TUTOR", "test-key-12345");

    let mut settings = Settings::default();
    settings.llm.api_key_env = "TEST_API_KEY_CHAT_TUTOR".to_string();

    assert_eq!(settings.api_key(), Some("test-key-12345".to_string()));
    assert!(settings.build_llm_client().is_ok());

    std::env::remove_var("TEST_API_KEY_CHAT_TUTOR");
}

#[test]
fn test_settings_missing_key_is_unconfigured() {
    let mut settings = Settings::default();
    settings.llm.api_key_env = "NONEXISTENT_KEY_CHAT_TUTOR_TEST".to_string();

    assert!(settings.api_key().is_none());
    assert!(matches!(
        settings.build_llm_client(),
        Err(TutorError::Unconfigured(_))
    ));
    assert!(matches!(
        Tutor::from_settings(&settings),
        Err(TutorError::Unconfigured(_))
    ));
}

// ========================================================================
// Prompt Assembly Tests (context/prompt.rs)
// ========================================================================

fn msg(sender: Sender, text: &str, secs: i64) -> ChatMessage {
    ChatMessage {
        id: format!("m{secs}"),
        text: text.to_string(),
        sender,
        timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
    }
}

#[test]
fn test_prompt_for_empty_history() {
    let prompt = build_prompt("You are a tutor.", &[], "What is a derivative?");

    assert_eq!(
        prompt,
        vec![
            Message::system("You are a tutor."),
            Message::user("What is a derivative?"),
        ]
    );
}

#[test]
fn test_prompt_after_one_exchange_has_four_entries() {
    let history = vec![
        msg(Sender::User, "What is a derivative?", 1),
        msg(Sender::Assistant, "A rate of change.", 2),
    ];
    let prompt = build_prompt("sys", &history, "And an integral?");

    assert_eq!(prompt.len(), 4);
    assert_eq!(prompt[0].role, Role::System);
    assert_eq!(prompt[1], Message::user("What is a derivative?"));
    assert_eq!(prompt[2], Message::assistant("A rate of change."));
    assert_eq!(prompt[3], Message::user("And an integral?"));
}

#[test]
fn test_prompt_skips_unknown_senders_and_counts_length() {
    let history = vec![
        msg(Sender::User, "a", 1),
        msg(Sender::Unknown, "internal note", 2),
        msg(Sender::Assistant, "b", 3),
        msg(Sender::User, "c", 4),
        msg(Sender::Unknown, "other", 5),
    ];
    let prompt = build_prompt("sys", &history, "d");

    let kept = history
        .iter()
        .filter(|m| matches!(m.sender, Sender::User | Sender::Assistant))
        .count();
    assert_eq!(prompt.len(), 2 + kept);
    assert_eq!(prompt.iter().filter(|m| m.role == Role::System).count(), 1);
    assert_eq!(prompt.first().unwrap().role, Role::System);
    assert_eq!(prompt.last().unwrap(), &Message::user("d"));
    assert!(prompt.iter().all(|m| !m.content.contains("note")));
}

#[test]
fn test_prompt_strips_html_from_history_and_new_message() {
    let history = vec![msg(
        Sender::Assistant,
        "<p>The <strong>slope</strong> of the tangent</p>",
        1,
    )];
    let prompt = PromptBuilder::new("sys")
        .with_history(&history)
        .build("<em>why</em> is that?");

    assert_eq!(prompt[1].content, "The slope of the tangent");
    assert_eq!(prompt[2].content, "why is that?");
}

#[test]
fn test_prompt_keeps_inequalities_intact() {
    let history = vec![msg(Sender::User, "Is x<y true when x=2 and y=3?", 1)];
    let prompt = build_prompt("sys", &history, "Solve 2x<10 for x, then explain");

    assert_eq!(prompt[1].content, "Is x<y true when x=2 and y=3?");
    assert_eq!(prompt[2].content, "Solve 2x<10 for x, then explain");

    let prompt = build_prompt("sys", &[], "Solve 2x<10 for x, then explain");
    assert_eq!(prompt[1].content, "Solve 2x<10 for x, then explain");
}

#[test]
fn test_strip_html_is_idempotent() {
    let samples = [
        "<p>Hello</p>",
        "plain text",
        "a < b > c",
        "<<b>i>nested</i>",
        "<div><span>x</span> <br> y</div>",
        "unterminated <b",
    ];
    for sample in samples {
        let once = strip_html(sample);
        assert_eq!(strip_html(&once), once, "not idempotent for {sample:?}");
    }
}
