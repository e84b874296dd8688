//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration that drives a [`ChatSession`](crate::ChatSession).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::types::{CompletionOptions, Model, ReasoningFormat};

/// System prompt used when none is given on the command line.
pub const DEFAULT_SYSTEM_PROMPT: &str = "you are a helpful assistant.";

/// Default bound on waiting for the provider to start answering.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default bound on the gap between two streamed fragments.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Command-line arguments for the chatline tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: llama-3.3-70b-versatile)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Start without any system prompt.
    #[arrrg(flag, "Do not send a system prompt")]
    pub no_system: bool,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 1024)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature 0.0-2.0 (default: 0.5)", "TEMP")]
    pub temperature: Option<String>,

    /// Stop sequence sent with every request.
    #[arrrg(optional, "Stop sequence sent with every request", "SEQUENCE")]
    pub stop: Option<String>,

    /// Reasoning visibility for reasoning models.
    #[arrrg(optional, "Reasoning format: hidden, raw, parsed (default: hidden)", "FORMAT")]
    pub reasoning: Option<String>,

    /// Wait for whole replies instead of streaming them.
    #[arrrg(flag, "Wait for whole replies instead of streaming")]
    pub no_stream: bool,

    /// Keep `<...>` markup in replies.
    #[arrrg(flag, "Keep <...> markup in replies")]
    pub keep_markup: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Append an audit line per turn to this file.
    #[arrrg(optional, "Append one audit line per turn to FILE", "FILE")]
    pub log: Option<String>,

    /// Save the transcript to this file after every reply.
    #[arrrg(optional, "Save the transcript to FILE after every reply", "FILE")]
    pub transcript: Option<String>,

    /// Resume the conversation saved in this file.
    #[arrrg(optional, "Resume the conversation saved in FILE", "FILE")]
    pub resume: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Seconds to wait for the provider (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Base URL of the completion endpoint.
    #[arrrg(optional, "Base URL of an OpenAI-compatible endpoint", "URL")]
    pub base_url: Option<String>,
}

/// A command-line argument that could not be turned into configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatArgsError {
    /// The offending argument.
    pub argument: &'static str,
    /// What was wrong with it.
    pub message: String,
}

impl fmt::Display for ChatArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}: {}", self.argument.replace('_', "-"), self.message)
    }
}

impl std::error::Error for ChatArgsError {}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Optional system prompt placed first in the transcript.
    pub system_prompt: Option<String>,

    /// Generation options sent with every request.
    pub options: CompletionOptions,

    /// Whether to strip `<...>` markup from streamed replies before committing them.
    pub sanitize_markup: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Bound on waiting for a reply (materialized) or its first byte (streamed).
    pub request_timeout: Option<Duration>,

    /// Bound on the gap between two streamed fragments.
    pub idle_timeout: Option<Duration>,

    /// Path of the audit log, if any.
    pub audit_log_path: Option<PathBuf>,

    /// Path to persist transcripts automatically after each assistant turn.
    pub transcript_path: Option<PathBuf>,

    /// Transcript to resume instead of starting fresh.
    pub resume_path: Option<PathBuf>,

    /// Base URL override for the completion endpoint.
    pub base_url: Option<String>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: llama-3.3-70b-versatile
    /// - No system prompt
    /// - Temperature 0.5, 1024 max tokens, no streaming, hidden reasoning
    /// - Markup stripping and color enabled
    /// - 60 second request timeout, 30 second idle timeout
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_prompt: None,
            options: CompletionOptions::default(),
            sanitize_markup: true,
            use_color: true,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            audit_log_path: None,
            transcript_path: None,
            resume_path: None,
            base_url: None,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the generation options.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets whether streamed replies are stripped of markup.
    pub fn with_sanitize_markup(mut self, sanitize: bool) -> Self {
        self.sanitize_markup = sanitize;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the request timeout; `None` waits forever.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the streaming idle timeout; `None` waits forever.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the audit log path.
    pub fn with_audit_log_path(mut self, path: Option<PathBuf>) -> Self {
        self.audit_log_path = path;
        self
    }

    /// Sets the transcript auto-save path.
    pub fn with_transcript_path(mut self, path: Option<PathBuf>) -> Self {
        self.transcript_path = path;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = ChatArgsError;

    fn try_from(args: ChatArgs) -> Result<Self, Self::Error> {
        let model = args
            .model
            .as_deref()
            .map(Model::from)
            .unwrap_or_default();

        let system_prompt = if args.no_system {
            None
        } else {
            Some(args.system.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()))
        };

        let mut options = CompletionOptions::new().with_stream(!args.no_stream);
        if let Some(max_tokens) = args.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = args.temperature.as_deref() {
            let temperature = temperature.trim().parse::<f32>().map_err(|_| ChatArgsError {
                argument: "temperature",
                message: format!("expected a number, got {temperature:?}"),
            })?;
            options = options.with_temperature(temperature);
        }
        if let Some(stop) = args.stop {
            options = options.with_stop_sequences(vec![stop]);
        }
        if let Some(reasoning) = args.reasoning.as_deref() {
            let reasoning = reasoning
                .parse::<ReasoningFormat>()
                .map_err(|message| ChatArgsError {
                    argument: "reasoning",
                    message,
                })?;
            options = options.with_reasoning(reasoning);
        }
        options.validate().map_err(|err| ChatArgsError {
            argument: match &err {
                crate::Error::Validation {
                    param: Some(param), ..
                } if param == "temperature" => "temperature",
                crate::Error::Validation {
                    param: Some(param), ..
                } if param == "max_tokens" => "max_tokens",
                _ => "stop",
            },
            message: err.to_string(),
        })?;

        let request_timeout = match args.timeout {
            Some(0) => {
                return Err(ChatArgsError {
                    argument: "timeout",
                    message: "must be at least one second".to_string(),
                });
            }
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => Some(DEFAULT_REQUEST_TIMEOUT),
        };

        Ok(ChatConfig {
            model,
            system_prompt,
            options,
            sanitize_markup: !args.keep_markup,
            use_color: !args.no_color,
            request_timeout,
            audit_log_path: args.log.map(PathBuf::from),
            transcript_path: args.transcript.map(PathBuf::from),
            resume_path: args.resume.map(PathBuf::from),
            base_url: args.base_url,
            ..ChatConfig::new()
        })
    }
}
