use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, Role, Usage};

/// The assistant message inside a materialized reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// The responder's role, normally `assistant`.
    pub role: Role,

    /// The reply text.  Null when the model produced only a tool call.
    #[serde(default)]
    pub content: Option<String>,

    /// Reasoning text, present only with the `parsed` reasoning format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// One candidate reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Position of this choice in the response.
    #[serde(default)]
    pub index: u32,

    /// The generated message.
    pub message: ResponseMessage,

    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// A complete, non-streamed chat-completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Provider-assigned identifier.
    #[serde(default)]
    pub id: String,

    /// The model that answered.
    #[serde(default)]
    pub model: String,

    /// Candidate replies; chatline only ever asks for one.
    pub choices: Vec<Choice>,

    /// Token and time counters.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// Build a single-choice assistant reply.
    pub fn from_text(
        content: impl Into<String>,
        finish_reason: FinishReason,
        usage: Option<Usage>,
    ) -> Self {
        Self {
            id: String::new(),
            model: String::new(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    role: Role::Assistant,
                    content: Some(content.into()),
                    reasoning: None,
                },
                finish_reason: Some(finish_reason),
            }],
            usage,
        }
    }

    /// The first choice, if the provider returned any.
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_provider_response() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-f51b2cd2",
            "object": "chat.completion",
            "created": 1730241104,
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Order shipped."},
                "logprobs": null,
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 18,
                "prompt_time": 0.003,
                "completion_tokens": 4,
                "completion_time": 0.01,
                "total_tokens": 22,
                "total_time": 0.013
            },
            "system_fingerprint": "fp_179b0f92c9",
            "x_groq": {"id": "req_01jbd6g2qdfw2adyrt2az8hz4w"}
        }))
        .unwrap();
        let choice = completion.first_choice().unwrap();
        assert_eq!(choice.message.role, Role::Assistant);
        assert_eq!(choice.message.content.as_deref(), Some("Order shipped."));
        assert_eq!(choice.finish_reason, Some(FinishReason::Stop));
        assert_eq!(completion.usage.unwrap().total_tokens, 22);
    }

    #[test]
    fn null_content() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "choices": [{
                "message": {"role": "assistant", "content": null},
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        assert_eq!(completion.choices[0].message.content, None);
        assert!(completion.usage.is_none());
    }
}
