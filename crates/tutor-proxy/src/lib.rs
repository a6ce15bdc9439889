//! Stateless HTTP front for the tutor: accepts a message plus the client's
//! conversation context and answers with the completion text.

pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
