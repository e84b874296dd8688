use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, Role, Usage};

/// The incremental part of a streamed choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Present on the first chunk only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// The next fragment of reply text, if this chunk carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// The next fragment of reasoning text, with the `parsed` reasoning format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// One streamed choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Position of this choice in the response.
    #[serde(default)]
    pub index: u32,

    /// The fragment.
    #[serde(default)]
    pub delta: Delta,

    /// Set on the last chunk of the choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Provider extension block; Groq reports streamed usage here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XGroq {
    /// Request identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Usage, on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One server-sent event payload of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Provider-assigned identifier, shared by every chunk of a reply.
    #[serde(default)]
    pub id: String,

    /// The model that answered.
    #[serde(default)]
    pub model: String,

    /// Streamed choices; empty on a usage-only chunk.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Usage, when `stream_options.include_usage` was honoured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Provider extension block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_groq: Option<XGroq>,
}

impl ChatCompletionChunk {
    /// A chunk carrying one text fragment.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_delta(Delta {
            content: Some(text.into()),
            ..Delta::default()
        })
    }

    /// A chunk carrying one reasoning fragment.
    pub fn with_reasoning(text: impl Into<String>) -> Self {
        Self::with_delta(Delta {
            reasoning: Some(text.into()),
            ..Delta::default()
        })
    }

    /// A chunk that closes the choice.
    pub fn finished(finish_reason: FinishReason, usage: Option<Usage>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                finish_reason: Some(finish_reason),
                ..ChunkChoice::default()
            }],
            x_groq: usage.map(|usage| XGroq {
                id: None,
                usage: Some(usage),
            }),
            ..Self::default()
        }
    }

    fn with_delta(delta: Delta) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta,
                ..ChunkChoice::default()
            }],
            ..Self::default()
        }
    }

    /// The text fragment of the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices.first()?.delta.content.as_deref()
    }

    /// The reasoning fragment of the first choice, if any.
    pub fn reasoning(&self) -> Option<&str> {
        self.choices.first()?.delta.reasoning.as_deref()
    }

    /// The finish reason of the first choice, if this chunk closes it.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.choices.first()?.finish_reason.as_ref()
    }

    /// Usage from either the standard field or the provider extension.
    pub fn usage(&self) -> Option<&Usage> {
        self.usage
            .as_ref()
            .or_else(|| self.x_groq.as_ref()?.usage.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_chunk_has_role_and_empty_content() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": "llama-3.3-70b-versatile",
            "choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}, "logprobs": null, "finish_reason": null}]
        }))
        .unwrap();
        assert_eq!(chunk.choices[0].delta.role, Some(Role::Assistant));
        assert_eq!(chunk.content(), Some(""));
        assert!(chunk.finish_reason().is_none());
    }

    #[test]
    fn final_chunk_carries_groq_usage() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
            "x_groq": {"id": "req_1", "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}}
        }))
        .unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(chunk.finish_reason(), Some(&FinishReason::Stop));
        assert_eq!(chunk.usage().map(|u| u.total_tokens), Some(5));
    }

    #[test]
    fn usage_only_chunk() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        }))
        .unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(chunk.usage().map(|u| u.prompt_tokens), Some(3));
    }

    #[test]
    fn constructors() {
        assert_eq!(ChatCompletionChunk::with_text("Hel").content(), Some("Hel"));
        assert_eq!(
            ChatCompletionChunk::with_reasoning("hmm").reasoning(),
            Some("hmm")
        );
        let done = ChatCompletionChunk::finished(FinishReason::Length, Some(Usage::new(1, 1)));
        assert_eq!(done.finish_reason(), Some(&FinishReason::Length));
        assert_eq!(done.usage().map(|u| u.total_tokens), Some(2));
    }
}
