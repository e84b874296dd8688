// Public modules
pub mod assembly;
pub mod audit;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod markup;
pub mod observability;
pub mod provider;
pub mod render;
pub mod session;
pub mod sse;
pub mod transcript;
pub mod types;

// Re-exports
pub use assembly::{Assembled, StreamAssembler, assemble};
pub use audit::{AuditLog, FileAuditLog, Level};
pub use client::Groq;
pub use commands::{ChatCommand, help_text, is_exit_token, parse_command};
pub use config::{ChatArgs, ChatArgsError, ChatConfig, DEFAULT_SYSTEM_PROMPT};
pub use error::{Error, Result};
pub use markup::strip_markup;
pub use observability::register_biometrics;
pub use provider::{ChunkStream, CompletionProvider};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{
    ChatSession, Completion, PendingReply, Reply, SessionState, SessionStats, StreamedReply,
};
pub use transcript::Transcript;
pub use types::*;
