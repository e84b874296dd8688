//! Core chat session management.
//!
//! This module provides the [`ChatSession`] struct, which owns the transcript
//! of one conversation and drives request/response cycles against a
//! [`CompletionProvider`].  A materialized reply is appended inside
//! [`ChatSession::send`]; a streamed reply is handed back as a
//! [`PendingReply`] and appended once, by [`ChatSession::drain_and_commit`]
//! or [`ChatSession::commit`].

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::Instant;

use crate::Error;
use crate::assembly::StreamAssembler;
use crate::audit::{AuditLog, Level};
use crate::config::ChatConfig;
use crate::error::Result;
use crate::observability::{
    SESSION_INTERRUPTS, SESSION_STREAMED_TURNS, SESSION_TIMEOUTS, SESSION_TURN_DURATION,
    SESSION_TURNS,
};
use crate::provider::{ChunkStream, CompletionProvider};
use crate::render::Renderer;
use crate::transcript::Transcript;
use crate::types::{
    ChatCompletion, ChatCompletionChunk, CompletionOptions, CompletionRequest, FinishReason,
    MAX_STOP_SEQUENCES, Message, Model, ReasoningFormat, Role, Usage,
};

/// How often an in-flight request checks the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Where a session is in its request/response cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to send.
    Idle,
    /// A request is in flight.
    AwaitingResponse,
    /// A streamed reply has been handed out and not yet committed.
    Streaming,
}

/// A materialized reply, as returned by [`ChatSession::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The reply text.
    pub content: String,
    /// Why generation stopped.
    pub finish_reason: Option<FinishReason>,
    /// The role of the reply, normally `assistant`.
    pub role: Role,
    /// Usage exactly as the provider reported it.
    pub usage: Option<Usage>,
}

impl Completion {
    fn from_response(response: ChatCompletion) -> Result<Self> {
        let usage = response.usage;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::serialization("response contained no choices", None))?;
        Ok(Self {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            role: choice.message.role,
            usage,
        })
    }
}

/// A streamed reply that has not been committed to the transcript yet.
///
/// Callers that drain the chunks themselves poll it as a [`Stream`] and then
/// hand it back to [`ChatSession::commit`].
pub struct PendingReply {
    stream: ChunkStream,
    turn: u64,
    started: Instant,
}

impl Stream for PendingReply {
    type Item = Result<ChatCompletionChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}

impl fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReply")
            .field("turn", &self.turn)
            .finish_non_exhaustive()
    }
}

/// The outcome of [`ChatSession::send`].
#[derive(Debug)]
pub enum Reply {
    /// The whole reply; already appended to the transcript.
    Complete(Completion),
    /// A reply still to be drained; nothing appended yet.
    Stream(PendingReply),
}

/// A streamed reply after it has been committed.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedReply {
    /// The committed text.
    pub content: String,
    /// Why generation stopped, if the stream said.
    pub finish_reason: Option<FinishReason>,
    /// Usage, if the stream carried it.
    pub usage: Option<Usage>,
    /// True when the user cut the stream short.
    pub interrupted: bool,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of messages in the transcript, including the system message.
    pub message_count: usize,
    /// The system prompt, if any.
    pub system_prompt: Option<String>,
    /// The default generation options.
    pub options: CompletionOptions,
    /// Whether streamed replies are stripped of markup.
    pub sanitize_markup: bool,
    /// The auto-save transcript path, if set.
    pub transcript_path: Option<PathBuf>,
    /// Usage summed over every turn that reported it.
    pub total_usage: Usage,
    /// Usage of the last committed turn, if it reported any.
    pub last_turn_usage: Option<Usage>,
    /// Wall time of the last committed turn, from request to commit.
    pub last_turn_duration: Option<Duration>,
    /// Total number of requests made.
    pub total_requests: u64,
}

/// A chat session that owns a transcript and talks to a completion provider.
pub struct ChatSession<P: CompletionProvider> {
    provider: P,
    config: ChatConfig,
    transcript: Transcript,
    state: SessionState,
    turn: u64,
    usage_totals: Usage,
    last_turn_usage: Option<Usage>,
    last_turn_duration: Option<Duration>,
    request_count: u64,
    audit: Option<Arc<dyn AuditLog>>,
    interrupt: Option<Arc<AtomicBool>>,
    save_error: Option<Error>,
}

impl<P: CompletionProvider> ChatSession<P> {
    /// Creates a session whose transcript holds only the configured system prompt.
    pub fn new(provider: P, config: ChatConfig) -> Self {
        let transcript = fresh_transcript(&config);
        Self::with_transcript(provider, config, transcript)
    }

    /// Creates a session around an existing transcript.
    pub fn with_transcript(provider: P, config: ChatConfig, transcript: Transcript) -> Self {
        Self {
            provider,
            config,
            transcript,
            state: SessionState::Idle,
            turn: 0,
            usage_totals: Usage::default(),
            last_turn_usage: None,
            last_turn_duration: None,
            request_count: 0,
            audit: None,
            interrupt: None,
            save_error: None,
        }
    }

    /// Attaches an audit log that sees every user and assistant turn.
    pub fn with_audit_log(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Attaches an interrupt flag.  Setting it aborts a request in flight
    /// and cuts a draining stream short.
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Sends a user message with the full transcript as context.
    ///
    /// The draft is appended before the request goes out and stays there
    /// whatever the outcome.  A materialized reply is appended before this
    /// returns.  A streamed reply is returned as a [`PendingReply`] and the
    /// session refuses to send again until it is committed.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a system-role draft, invalid options,
    /// or a pending streamed reply; otherwise whatever the provider returned,
    /// a timeout error, or an abort error when the interrupt flag is set
    /// before the reply arrives.
    ///
    /// A reply that was committed but could not be auto-saved is still
    /// returned; the save failure is audited and kept for
    /// [`ChatSession::take_save_error`].
    pub async fn send(
        &mut self,
        draft: impl Into<Message>,
        options: &CompletionOptions,
    ) -> Result<Reply> {
        if self.state == SessionState::Streaming {
            return Err(Error::validation(
                "a streamed reply is still pending; drain or commit it first",
                None,
            ));
        }
        let draft = draft.into();
        if draft.role == Role::System {
            return Err(Error::validation(
                "the system message can only be set when the session is created",
                Some("role".to_string()),
            ));
        }
        options.validate()?;

        if let Some(audit) = &self.audit {
            audit.log_user_turn(&draft);
        }
        self.transcript.append(draft);

        let request = CompletionRequest::new(
            self.config.model.clone(),
            self.transcript.as_list(),
            options,
        );
        self.state = SessionState::AwaitingResponse;
        self.request_count = self.request_count.saturating_add(1);
        self.turn = self.turn.wrapping_add(1);
        let started = Instant::now();
        let timeout = self.config.request_timeout;
        let interrupt = self.interrupt.clone();

        if options.stream {
            match interruptible(interrupt, bounded(timeout, self.provider.stream(request))).await {
                Ok(stream) => {
                    self.state = SessionState::Streaming;
                    Ok(Reply::Stream(PendingReply {
                        stream,
                        turn: self.turn,
                        started,
                    }))
                }
                Err(err) => Err(self.fail_turn(err)),
            }
        } else {
            let response =
                interruptible(interrupt, bounded(timeout, self.provider.complete(request))).await;
            let completion = match response {
                Ok(response) => Completion::from_response(response),
                Err(err) => Err(err),
            };
            match completion {
                Ok(completion) => {
                    self.state = SessionState::Idle;
                    self.commit_turn(completion.content.clone(), completion.usage, started);
                    Ok(Reply::Complete(completion))
                }
                Err(err) => Err(self.fail_turn(err)),
            }
        }
    }

    /// Drains a streamed reply, printing fragments as they arrive, and
    /// commits the assembled text as one assistant message.
    ///
    /// Reasoning fragments are printed but never committed.  Markup is
    /// stripped when the session is configured to sanitize.  An empty stream
    /// commits an empty message.  When the renderer asks to interrupt, or the
    /// session's interrupt flag is set, the text received so far is committed
    /// and the reply is marked interrupted.  A failed auto-save is printed as
    /// an error and does not fail the turn.
    ///
    /// # Errors
    ///
    /// A stream error or an idle timeout commits the text received so far, so
    /// the transcript keeps alternating, then returns the error.  The session
    /// is idle afterwards.
    pub async fn drain_and_commit(
        &mut self,
        pending: PendingReply,
        renderer: &mut dyn Renderer,
    ) -> Result<StreamedReply> {
        self.check_pending(&pending)?;
        let PendingReply {
            mut stream,
            started,
            ..
        } = pending;

        let mut assembler = StreamAssembler::new();
        let mut interrupted = false;
        loop {
            if renderer.should_interrupt() {
                interrupted = true;
                break;
            }
            let interrupt = self.interrupt.clone();
            let next = tokio::select! {
                next = next_fragment(&mut stream, self.config.idle_timeout) => next,
                () = interrupt_requested(interrupt) => {
                    interrupted = true;
                    break;
                }
            };
            let next = match next {
                Ok(next) => next,
                Err(_) if renderer.should_interrupt() => {
                    interrupted = true;
                    break;
                }
                Err(idle) => {
                    let err = Error::timeout(
                        format!("no reply fragment within {}s", idle.as_secs_f64()),
                        Some(idle.as_secs_f64()),
                    );
                    return Err(self.abandon_stream(assembler, started, renderer, err));
                }
            };
            match next {
                Some(Ok(chunk)) => {
                    let fragments = assembler.push_chunk(&chunk);
                    if let Some(reasoning) = fragments.reasoning {
                        renderer.print_reasoning(reasoning);
                    }
                    if let Some(text) = fragments.text {
                        renderer.print_text(text);
                    }
                }
                Some(Err(err)) => {
                    return Err(self.abandon_stream(assembler, started, renderer, err));
                }
                None => break,
            }
        }

        if interrupted {
            SESSION_INTERRUPTS.click();
            renderer.print_interrupted();
        } else {
            renderer.finish_response();
        }

        let assembled = assembler.finish(self.config.sanitize_markup);
        self.state = SessionState::Idle;
        SESSION_STREAMED_TURNS.click();
        self.commit_turn(assembled.content.clone(), assembled.usage, started);
        self.report_save_error(renderer);
        Ok(StreamedReply {
            content: assembled.content,
            finish_reason: assembled.finish_reason,
            usage: assembled.usage,
            interrupted,
        })
    }

    /// Commits the text of a streamed reply the caller drained itself.
    ///
    /// A failed auto-save does not fail the commit; see
    /// [`ChatSession::take_save_error`].
    ///
    /// # Errors
    ///
    /// Returns a validation error when `pending` is not the reply the
    /// session is waiting on, for instance after [`ChatSession::reset`].
    pub fn commit(&mut self, pending: PendingReply, text: impl Into<String>) -> Result<()> {
        self.check_pending(&pending)?;
        self.state = SessionState::Idle;
        SESSION_STREAMED_TURNS.click();
        self.commit_turn(text.into(), None, pending.started);
        Ok(())
    }

    /// Sends a user message and streams the reply to the renderer.
    ///
    /// This method:
    /// 1. Sends the message with the session's options and streaming forced on
    /// 2. Renders fragments as they arrive
    /// 3. Commits the assembled reply to the transcript
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the stream fails.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<StreamedReply> {
        let options = self.config.options.clone().with_stream(true);
        match self.send(user_input, &options).await? {
            Reply::Stream(pending) => self.drain_and_commit(pending, renderer).await,
            Reply::Complete(completion) => {
                renderer.print_text(&completion.content);
                renderer.finish_response();
                self.report_save_error(renderer);
                Ok(StreamedReply {
                    content: completion.content,
                    finish_reason: completion.finish_reason,
                    usage: completion.usage,
                    interrupted: false,
                })
            }
        }
    }

    /// Sends a user message using the session's default options.
    pub async fn send_default(&mut self, draft: impl Into<Message>) -> Result<Reply> {
        let options = self.config.options.clone();
        self.send(draft, &options).await
    }

    /// Starts over with a transcript holding only the configured system prompt.
    ///
    /// Any pending streamed reply is abandoned.
    pub fn reset(&mut self) {
        self.transcript = fresh_transcript(&self.config);
        self.state = SessionState::Idle;
        self.turn = self.turn.wrapping_add(1);
        self.last_turn_usage = None;
        self.last_turn_duration = None;
    }

    /// Takes the error from the last auto-save that failed, if any.
    ///
    /// A turn whose reply was committed is never failed by the save; the
    /// REPL reports this after a materialized reply instead.
    pub fn take_save_error(&mut self) -> Option<Error> {
        self.save_error.take()
    }

    /// Returns where the session is in its request/response cycle.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the default generation options.
    pub fn options(&self) -> &CompletionOptions {
        &self.config.options
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Returns the system prompt the transcript started with, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.transcript
            .system()
            .map(|message| message.content.as_str())
    }

    /// Sets the maximum tokens per response.
    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<()> {
        self.update_options(|options| options.max_tokens = max_tokens)
    }

    /// Sets the sampling temperature.
    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        self.update_options(|options| options.temperature = temperature)
    }

    /// Adds a stop sequence to the persistent list.
    pub fn add_stop_sequence(&mut self, sequence: String) -> Result<()> {
        if self.config.options.stop_sequences.contains(&sequence) {
            return Ok(());
        }
        if self.config.options.stop_sequences.len() >= MAX_STOP_SEQUENCES {
            return Err(Error::validation(
                format!("at most {MAX_STOP_SEQUENCES} stop sequences are allowed"),
                Some("stop".to_string()),
            ));
        }
        self.update_options(|options| options.stop_sequences.push(sequence))
    }

    /// Clears all stop sequences.
    pub fn clear_stop_sequences(&mut self) {
        self.config.options.stop_sequences.clear();
    }

    /// Returns the configured stop sequences.
    pub fn stop_sequences(&self) -> &[String] {
        &self.config.options.stop_sequences
    }

    /// Sets the reasoning format.
    pub fn set_reasoning(&mut self, reasoning: ReasoningFormat) {
        self.config.options.reasoning = reasoning;
    }

    /// Sets whether replies are streamed by default.
    pub fn set_streaming(&mut self, stream: bool) {
        self.config.options.stream = stream;
    }

    /// Sets whether streamed replies are stripped of markup.
    pub fn set_sanitize_markup(&mut self, sanitize: bool) {
        self.config.sanitize_markup = sanitize;
    }

    /// Sets the auto-save transcript path.
    pub fn set_transcript_path(&mut self, path: Option<PathBuf>) {
        self.config.transcript_path = path;
    }

    /// Returns the configured transcript path, if any.
    pub fn transcript_path(&self) -> Option<&Path> {
        self.config.transcript_path.as_deref()
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<Q: AsRef<Path>>(&self, path: Q) -> Result<()> {
        self.transcript.save_to(path)
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            message_count: self.message_count(),
            system_prompt: self.system_prompt().map(str::to_string),
            options: self.config.options.clone(),
            sanitize_markup: self.config.sanitize_markup,
            transcript_path: self.config.transcript_path.clone(),
            total_usage: self.usage_totals,
            last_turn_usage: self.last_turn_usage,
            last_turn_duration: self.last_turn_duration,
            total_requests: self.request_count,
        }
    }

    fn update_options(&mut self, update: impl FnOnce(&mut CompletionOptions)) -> Result<()> {
        let mut options = self.config.options.clone();
        update(&mut options);
        options.validate()?;
        self.config.options = options;
        Ok(())
    }

    fn check_pending(&self, pending: &PendingReply) -> Result<()> {
        if self.state != SessionState::Streaming || pending.turn != self.turn {
            return Err(Error::validation(
                "this streamed reply is no longer pending",
                None,
            ));
        }
        Ok(())
    }

    fn commit_turn(&mut self, content: String, usage: Option<Usage>, started: Instant) {
        let message = Message::assistant(content);
        if let Some(audit) = &self.audit {
            audit.log_assistant_turn(&message);
        }
        self.transcript.append(message);
        self.last_turn_usage = usage;
        if let Some(usage) = usage {
            self.usage_totals += usage;
        }
        let elapsed = started.elapsed();
        self.last_turn_duration = Some(elapsed);
        SESSION_TURNS.click();
        SESSION_TURN_DURATION.add(elapsed.as_secs_f64());
        // The reply is in the transcript either way; a failed save is reported, not returned.
        self.save_error = match self.auto_save_transcript() {
            Ok(()) => None,
            Err(err) => {
                if let Some(audit) = &self.audit {
                    audit.record(Level::Warn, &format!("failed to save transcript: {err}"));
                }
                Some(err)
            }
        };
    }

    fn report_save_error(&mut self, renderer: &mut dyn Renderer) {
        if let Some(err) = self.save_error.take() {
            renderer.print_error(&format!("failed to save transcript: {err}"));
        }
    }

    fn abandon_stream(
        &mut self,
        assembler: StreamAssembler,
        started: Instant,
        renderer: &mut dyn Renderer,
        err: Error,
    ) -> Error {
        renderer.finish_response();
        let assembled = assembler.finish(self.config.sanitize_markup);
        self.state = SessionState::Idle;
        SESSION_STREAMED_TURNS.click();
        self.commit_turn(assembled.content, assembled.usage, started);
        self.report_save_error(renderer);
        self.fail_turn(err)
    }

    fn fail_turn(&mut self, err: Error) -> Error {
        self.state = SessionState::Idle;
        if err.is_timeout() {
            SESSION_TIMEOUTS.click();
        }
        if err.is_abort() {
            SESSION_INTERRUPTS.click();
        }
        if let Some(audit) = &self.audit {
            audit.record(Level::Error, &err.to_string());
        }
        err
    }

    fn auto_save_transcript(&self) -> Result<()> {
        if let Some(path) = &self.config.transcript_path {
            self.save_transcript_to(path)
        } else {
            Ok(())
        }
    }
}

fn fresh_transcript(config: &ChatConfig) -> Transcript {
    match &config.system_prompt {
        Some(prompt) => Transcript::with_system(prompt.clone()),
        None => Transcript::new(),
    }
}

async fn bounded<T>(
    timeout: Option<Duration>,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(
                format!("no reply within {}s", limit.as_secs_f64()),
                Some(limit.as_secs_f64()),
            )),
        },
        None => request.await,
    }
}

/// Races `request` against the interrupt flag.
async fn interruptible<T>(
    interrupt: Option<Arc<AtomicBool>>,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        result = request => result,
        () = interrupt_requested(interrupt) => Err(Error::abort("interrupted before the reply arrived")),
    }
}

/// Resolves once the flag is set; never resolves without one.
async fn interrupt_requested(interrupt: Option<Arc<AtomicBool>>) {
    let Some(flag) = interrupt else {
        return futures::future::pending().await;
    };
    while !flag.load(Ordering::Relaxed) {
        tokio::time::sleep(INTERRUPT_POLL).await;
    }
}

/// The next chunk, or the idle limit that expired first.
async fn next_fragment(
    stream: &mut ChunkStream,
    idle: Option<Duration>,
) -> std::result::Result<Option<Result<ChatCompletionChunk>>, Duration> {
    match idle {
        Some(idle) => tokio::time::timeout(idle, stream.next())
            .await
            .map_err(|_| idle),
        None => Ok(stream.next().await),
    }
}
