// Public modules
pub mod chat_completion;
pub mod chat_completion_chunk;
pub mod completion_options;
pub mod completion_request;
pub mod finish_reason;
pub mod message;
pub mod model;
pub mod reasoning_format;
pub mod role;
pub mod usage;

// Re-exports
pub use chat_completion::{ChatCompletion, Choice, ResponseMessage};
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, Delta, XGroq};
pub use completion_options::{
    CompletionOptions, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, MAX_STOP_SEQUENCES,
    MAX_TEMPERATURE,
};
pub use completion_request::{CompletionRequest, StreamOptions};
pub use finish_reason::FinishReason;
pub use message::Message;
pub use model::{KnownModel, Model};
pub use reasoning_format::ReasoningFormat;
pub use role::{Role, RoleParseError};
pub use usage::Usage;
