//! Server-Sent Events (SSE) processing for streamed replies.
//!
//! The completion endpoint streams one `data:` line per chunk, separated by
//! blank lines, and ends the stream with `data: [DONE]`.  This module turns
//! the raw byte stream into a stream of parsed [`ChatCompletionChunk`]s.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::observability::{STREAM_BYTES, STREAM_CHUNKS, STREAM_ERRORS};
use crate::types::ChatCompletionChunk;
use crate::{Error, Result};

const DONE_MARKER: &str = "[DONE]";

/// Process a stream of bytes into a stream of completion chunks.
///
/// The returned stream ends at `[DONE]` or when the byte stream ends,
/// whichever comes first, and keeps returning `None` if polled again.  Parse
/// errors are yielded in place and do not end the stream; transport errors
/// are yielded and the caller decides.
///
/// ```
/// # use bytes::Bytes;
/// # use futures::StreamExt;
/// # tokio_test::block_on(async {
/// let body = futures::stream::iter(vec![Ok::<_, reqwest::Error>(Bytes::from_static(
///     b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n",
/// ))]);
/// let chunks: Vec<_> = chatline::sse::process_sse(body).collect().await;
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].as_ref().unwrap().content(), Some("Hi"));
/// # });
/// ```
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let state = SseState {
        stream,
        pending: Vec::new(),
        buffer: String::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            // First drain complete events already buffered.
            while let Some((event, remaining)) = extract_event(&state.buffer) {
                state.buffer = remaining;
                match event {
                    SseEvent::Skip => continue,
                    SseEvent::Done => return None,
                    SseEvent::Chunk(chunk) => {
                        record(&chunk);
                        return Some((chunk, state));
                    }
                }
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    if let Err(err) = state.push_bytes(&bytes) {
                        STREAM_ERRORS.click();
                        state.done = true;
                        return Some((Err(err), state));
                    }
                }
                Some(Err(err)) => {
                    STREAM_ERRORS.click();
                    return Some((Err(err), state));
                }
                None => {
                    // The provider closed the connection; flush a trailing event.
                    state.done = true;
                    if state.buffer.trim().is_empty() {
                        return None;
                    }
                    let tail = format!("{}\n\n", std::mem::take(&mut state.buffer));
                    return match extract_event(&tail) {
                        Some((SseEvent::Chunk(chunk), _)) => {
                            record(&chunk);
                            Some((chunk, state))
                        }
                        _ => None,
                    };
                }
            }
        }
    })
    .fuse()
}

struct SseState<S> {
    stream: S,
    pending: Vec<u8>,
    buffer: String,
    done: bool,
}

impl<S> SseState<S> {
    /// Append bytes to the text buffer, holding back a UTF-8 sequence split across reads.
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(err) => {
                return Err(Error::encoding(
                    format!("Invalid UTF-8 in stream: {err}"),
                    Some(Box::new(err)),
                ));
            }
        };
        let rest = self.pending.split_off(valid);
        let text = std::str::from_utf8(&self.pending)?;
        self.buffer.push_str(text);
        self.pending = rest;
        if self.buffer.contains("\r\n") {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }
        Ok(())
    }
}

fn record(chunk: &Result<ChatCompletionChunk>) {
    match chunk {
        Ok(_) => STREAM_CHUNKS.click(),
        Err(_) => STREAM_ERRORS.click(),
    }
}

enum SseEvent {
    Chunk(Result<ChatCompletionChunk>),
    Done,
    Skip,
}

/// Extract one complete event from the front of the buffer.
///
/// Events are delimited by a blank line.  Multiple `data:` lines are joined
/// with newlines and lines starting with `:` are comments.
fn extract_event(buffer: &str) -> Option<(SseEvent, String)> {
    let (event_text, rest) = buffer.split_once("\n\n")?;
    let rest = rest.to_string();

    let mut data: Option<String> = None;
    for line in event_text.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }

    let Some(data) = data else {
        return Some((SseEvent::Skip, rest));
    };
    let data = data.trim();
    if data == DONE_MARKER {
        return Some((SseEvent::Done, rest));
    }
    if data.is_empty() {
        return Some((SseEvent::Skip, rest));
    }
    Some((SseEvent::Chunk(parse_data(data)), rest))
}

#[derive(Deserialize)]
struct StreamErrorEnvelope {
    error: StreamErrorDetail,
}

#[derive(Deserialize)]
struct StreamErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}

fn parse_data(data: &str) -> Result<ChatCompletionChunk> {
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })?;
    if value.get("error").is_some() {
        let envelope: StreamErrorEnvelope = serde_json::from_value(value)?;
        return Err(Error::api(
            500,
            envelope
                .error
                .error_type
                .or_else(|| Some("stream_error".to_string())),
            envelope
                .error
                .message
                .unwrap_or_else(|| data.to_string()),
            None,
        ));
    }
    Ok(serde_json::from_value(value)?)
}
