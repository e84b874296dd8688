//! Integration tests for the chatline library.
//! The live tests require an API key in the environment to run; the rest use
//! an in-process provider.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::StreamExt;

    use chatline::sse::process_sse;
    use chatline::{
        ChatCompletion, ChatConfig, ChatSession, ChunkStream, CompletionOptions,
        CompletionProvider, CompletionRequest, FinishReason, Groq, KnownModel, Message, Model,
        Renderer, Reply, Result, Role, Transcript, Usage, is_exit_token, parse_command,
    };

    /// Replies by describing the request it received.
    struct EchoProvider;

    fn describe(request: &CompletionRequest) -> String {
        let last = request
            .messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        format!("{} messages, last: {last}", request.messages.len())
    }

    #[async_trait::async_trait]
    impl CompletionProvider for EchoProvider {
        async fn complete(&self, request: CompletionRequest) -> Result<ChatCompletion> {
            Ok(ChatCompletion::from_text(
                describe(&request),
                FinishReason::Stop,
                Some(Usage::new(request.messages.len() as u64, 4)),
            ))
        }

        async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
            // Serve the reply as raw server-sent events, split mid-event.
            let text = describe(&request);
            let (head, tail) = text.split_at(text.len() / 2);
            let events = format!(
                "data: {{\"choices\":[{{\"delta\":{{\"role\":\"assistant\",\"content\":\"<b>\"}}}}]}}\n\n\
                 data: {{\"choices\":[{{\"delta\":{{\"content\":\"{head}\"}}}}]}}\n\n\
                 data: {{\"choices\":[{{\"delta\":{{\"content\":\"{tail}\"}}}}]}}\n\n\
                 data: {{\"choices\":[{{\"delta\":{{}},\"finish_reason\":\"stop\"}}],\"x_groq\":{{\"usage\":{{\"prompt_tokens\":7,\"completion_tokens\":2,\"total_tokens\":9}}}}}}\n\n\
                 data: [DONE]\n\n"
            );
            let (first, second) = events.split_at(events.len() / 3);
            let body = futures::stream::iter(vec![
                Ok::<_, reqwest::Error>(Bytes::from(first.to_string())),
                Ok(Bytes::from(second.to_string())),
            ]);
            Ok(process_sse(body).boxed())
        }
    }

    #[derive(Default)]
    struct CapturingRenderer {
        output: String,
    }

    impl Renderer for CapturingRenderer {
        fn print_text(&mut self, text: &str) {
            self.output.push_str(text);
        }

        fn print_reasoning(&mut self, _: &str) {}

        fn print_error(&mut self, _: &str) {}

        fn print_info(&mut self, _: &str) {}

        fn finish_response(&mut self) {
            self.output.push('\n');
        }
    }

    #[tokio::test]
    async fn conversation_grows_by_two_per_exchange() {
        let config = ChatConfig::new().with_system_prompt("you are a helpful assistant.");
        let mut session = ChatSession::new(EchoProvider, config);
        let mut renderer = CapturingRenderer::default();

        let inputs = ["Where is my order?", "And the invoice?", "Thanks", "exit"];
        for input in inputs {
            if is_exit_token(input) {
                break;
            }
            assert!(parse_command(input).is_none());
            let reply = session.send_streaming(input, &mut renderer).await.unwrap();
            assert!(!reply.interrupted);
        }

        let messages = session.transcript().as_list();
        assert_eq!(messages.len(), 2 * 3 + 1);
        assert_eq!(messages[0], Message::system("you are a helpful assistant."));
        assert_eq!(messages[1], Message::user("Where is my order?"));
        assert_eq!(
            messages[2],
            Message::assistant("2 messages, last: Where is my order?")
        );
        assert_eq!(
            messages[6],
            Message::assistant("6 messages, last: Thanks")
        );
        for pair in messages[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }

        // Markup is printed as it arrives but never committed.
        assert!(renderer.output.starts_with("<b>2 messages"));
        let stats = session.stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.total_usage.total_tokens, 27);
    }

    #[tokio::test]
    async fn materialized_and_streamed_turns_mix() {
        let mut session = ChatSession::new(EchoProvider, ChatConfig::new());

        let Reply::Complete(completion) = session
            .send("hello", &CompletionOptions::default())
            .await
            .unwrap()
        else {
            panic!("expected a materialized reply");
        };
        assert_eq!(completion.content, "1 messages, last: hello");
        assert_eq!(completion.usage, Some(Usage::new(1, 4)));

        let options = CompletionOptions::default().with_stream(true);
        let Reply::Stream(pending) = session.send("again", &options).await.unwrap() else {
            panic!("expected a streamed reply");
        };
        let mut renderer = CapturingRenderer::default();
        let reply = session
            .drain_and_commit(pending, &mut renderer)
            .await
            .unwrap();
        assert_eq!(reply.content, "3 messages, last: again");
        assert_eq!(reply.finish_reason, Some(FinishReason::Stop));
        assert_eq!(session.message_count(), 4);
    }

    #[tokio::test]
    async fn resumed_transcript_is_sent_whole() {
        let path = std::env::temp_dir().join(format!(
            "chatline-integration-{}.json",
            std::process::id()
        ));
        let mut transcript = Transcript::with_system("be brief");
        transcript.append(Message::user("hi"));
        transcript.append(Message::assistant("hello"));
        transcript.save_to(&path).unwrap();

        let loaded = Transcript::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let mut session = ChatSession::with_transcript(EchoProvider, ChatConfig::new(), loaded);
        session
            .send("still there?", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(
            session.transcript().last(),
            Some(&Message::assistant("4 messages, last: still there?"))
        );
    }

    #[tokio::test]
    async fn test_simple_message_request() {
        // This test requires GROQ_API_KEY to be set
        let api_key = std::env::var("GROQ_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test: GROQ_API_KEY not set");
            return;
        }

        let client = Groq::new(api_key).expect("Failed to create client");
        let config = ChatConfig::new()
            .with_model(Model::Known(KnownModel::Llama318bInstant))
            .with_options(CompletionOptions::new().with_max_tokens(10));
        let mut session = ChatSession::new(client, config);

        let response = session
            .send("Say 'test passed'", &CompletionOptions::new().with_max_tokens(10))
            .await;
        assert!(
            response.is_ok(),
            "Request should succeed with valid API key"
        );
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn test_streaming_response() {
        let api_key = std::env::var("GROQ_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test: GROQ_API_KEY not set");
            return;
        }

        let client = Groq::new(api_key).expect("Failed to create client");
        let config = ChatConfig::new()
            .with_model(Model::Known(KnownModel::Llama318bInstant))
            .with_options(CompletionOptions::new().with_max_tokens(10));
        let mut session = ChatSession::new(client, config);
        let mut renderer = CapturingRenderer::default();

        let reply = session.send_streaming("Count to 3", &mut renderer).await;
        assert!(reply.is_ok(), "Stream request should succeed");
        assert_eq!(session.message_count(), 2);
    }
}
