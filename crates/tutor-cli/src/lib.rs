// Library interface for tutor-cli
// This allows integration tests to access internal modules

// NOTE: cli.rs and commands.rs are also declared in main.rs, so they are pulled in by path
// to avoid "file loaded multiple times" errors.

#[path = "cli.rs"]
pub mod cli;

#[path = "commands.rs"]
pub mod commands;

pub use cli::Cli;
pub use commands::{handle_command, CommandResult};
