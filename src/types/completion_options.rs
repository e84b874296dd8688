use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ReasoningFormat;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Default maximum output tokens per reply.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Highest temperature the endpoint accepts.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Most stop sequences the endpoint accepts on one request.
pub const MAX_STOP_SEQUENCES: usize = 4;

/// Generation options carried on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Sampling temperature, 0.0 to 2.0.
    pub temperature: f32,

    /// Maximum output tokens for the reply.
    pub max_tokens: u32,

    /// Stream the reply as fragments instead of returning it in one piece.
    pub stream: bool,

    /// Sequences that end generation when produced.
    pub stop_sequences: Vec<String>,

    /// How reasoning models expose their reasoning.
    pub reasoning: ReasoningFormat,
}

impl CompletionOptions {
    /// Creates options with the defaults: temperature 0.5, 1024 tokens, no
    /// streaming, no stop sequences, hidden reasoning.
    pub fn new() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            stream: false,
            stop_sequences: Vec::new(),
            reasoning: ReasoningFormat::Hidden,
        }
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum output tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enables or disables streaming.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Sets the stop sequences.
    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    /// Sets the reasoning format.
    pub fn with_reasoning(mut self, reasoning: ReasoningFormat) -> Self {
        self.reasoning = reasoning;
        self
    }

    /// Checks the options against the limits the endpoint enforces.
    pub fn validate(&self) -> Result<()> {
        if !self.temperature.is_finite()
            || self.temperature < 0.0
            || self.temperature > MAX_TEMPERATURE
        {
            return Err(Error::validation(
                format!(
                    "temperature must be between 0 and {MAX_TEMPERATURE}, got {}",
                    self.temperature
                ),
                Some("temperature".to_string()),
            ));
        }
        if self.max_tokens == 0 {
            return Err(Error::validation(
                "max_tokens must be positive",
                Some("max_tokens".to_string()),
            ));
        }
        if self.stop_sequences.len() > MAX_STOP_SEQUENCES {
            return Err(Error::validation(
                format!("at most {MAX_STOP_SEQUENCES} stop sequences are allowed"),
                Some("stop".to_string()),
            ));
        }
        if self.stop_sequences.iter().any(String::is_empty) {
            return Err(Error::validation(
                "stop sequences must not be empty",
                Some("stop".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::new()
    }
}
