use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Token and time counters reported by the provider for one request.
///
/// Times are in seconds.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    /// Tokens in the prompt, i.e. the whole transcript.
    #[serde(default)]
    pub prompt_tokens: u64,

    /// Time spent processing the prompt.
    #[serde(default)]
    pub prompt_time: f64,

    /// Tokens generated for the reply.
    #[serde(default)]
    pub completion_tokens: u64,

    /// Time spent generating the reply.
    #[serde(default)]
    pub completion_time: f64,

    /// Prompt plus completion tokens.
    #[serde(default)]
    pub total_tokens: u64,

    /// Prompt plus completion time.
    #[serde(default)]
    pub total_time: f64,
}

impl Usage {
    /// Create a new `Usage` from token counts, with total tokens derived and no timings.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            ..Self::default()
        }
    }

    /// Set the prompt and completion times, deriving the total time.
    pub fn with_times(mut self, prompt_time: f64, completion_time: f64) -> Self {
        self.prompt_time = prompt_time;
        self.completion_time = completion_time;
        self.total_time = prompt_time + completion_time;
        self
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            prompt_time: self.prompt_time + rhs.prompt_time,
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
            completion_time: self.completion_time + rhs.completion_time,
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
            total_time: self.total_time + rhs.total_time,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        *self = *self + rhs;
    }
}
