use serde::{Deserialize, Serialize};

use crate::types::{CompletionOptions, Message, Model, ReasoningFormat};

/// Extra settings for streamed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Ask the endpoint to report usage on the final chunk.
    pub include_usage: bool,
}

/// The body of one chat-completion request.
///
/// Built fresh for every call from the whole transcript and discarded once
/// the reply has been handled.  The endpoint keeps no conversation state, so
/// every request carries all of the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use.
    pub model: Model,

    /// The entire conversation so far, oldest first.
    pub messages: Vec<Message>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum output tokens.
    pub max_completion_tokens: u32,

    /// Stop sequences, omitted when there are none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Whether to stream the reply.
    pub stream: bool,

    /// Reasoning visibility for reasoning models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_format: Option<ReasoningFormat>,

    /// Streaming settings, only present when streaming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

impl CompletionRequest {
    /// Build a request from a transcript view and the generation options.
    pub fn new(model: Model, messages: &[Message], options: &CompletionOptions) -> Self {
        let stop = if options.stop_sequences.is_empty() {
            None
        } else {
            Some(options.stop_sequences.clone())
        };
        // Non-reasoning models reject reasoning_format, and hidden is their behavior anyway.
        let reasoning_format =
            if options.reasoning != ReasoningFormat::Hidden || model.is_reasoning() {
                Some(options.reasoning)
            } else {
                None
            };
        let stream_options = options.stream.then_some(StreamOptions {
            include_usage: true,
        });
        Self {
            model,
            messages: messages.to_vec(),
            temperature: options.temperature,
            max_completion_tokens: options.max_tokens,
            stop,
            stream: options.stream,
            reasoning_format,
            stream_options,
        }
    }

    /// Force streaming on or off, keeping `stream_options` consistent.
    pub fn set_stream(&mut self, stream: bool) {
        self.stream = stream;
        self.stream_options = stream.then_some(StreamOptions {
            include_usage: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;
    use serde_json::{json, to_value};

    #[test]
    fn minimal_request() {
        let messages = vec![
            Message::system("you are a helpful assistant."),
            Message::user("Explain the importance of fast language models"),
        ];
        let request =
            CompletionRequest::new(Model::default(), &messages, &CompletionOptions::default());
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [
                    {"role": "system", "content": "you are a helpful assistant."},
                    {"role": "user", "content": "Explain the importance of fast language models"}
                ],
                "temperature": 0.5,
                "max_completion_tokens": 1024,
                "stream": false
            })
        );
    }

    #[test]
    fn streaming_request_with_stops_and_reasoning() {
        let messages = vec![Message::user("hi")];
        let options = CompletionOptions::new()
            .with_stream(true)
            .with_stop_sequences(vec!["END".to_string()])
            .with_reasoning(ReasoningFormat::Parsed);
        let request = CompletionRequest::new(
            Model::Known(KnownModel::Qwen332b),
            &messages,
            &options,
        );
        let value = to_value(&request).unwrap();
        assert_eq!(value["stream"], json!(true));
        assert_eq!(value["stop"], json!(["END"]));
        assert_eq!(value["reasoning_format"], json!("parsed"));
        assert_eq!(value["stream_options"], json!({"include_usage": true}));
    }

    #[test]
    fn reasoning_models_get_hidden_explicitly() {
        let request = CompletionRequest::new(
            Model::Known(KnownModel::DeepseekR1DistillLlama70b),
            &[Message::user("hi")],
            &CompletionOptions::default(),
        );
        assert_eq!(request.reasoning_format, Some(ReasoningFormat::Hidden));
    }

    #[test]
    fn set_stream_toggles_options() {
        let mut request = CompletionRequest::new(
            Model::default(),
            &[Message::user("hi")],
            &CompletionOptions::default(),
        );
        assert!(request.stream_options.is_none());
        request.set_stream(true);
        assert!(request.stream);
        assert_eq!(
            request.stream_options,
            Some(StreamOptions {
                include_usage: true
            })
        );
    }
}
