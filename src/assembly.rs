//! Folding streamed fragments into a finished reply.

use crate::markup::strip_markup;
use crate::types::{ChatCompletionChunk, FinishReason, Usage};

/// Concatenate text fragments, skipping absent ones, and optionally strip markup.
///
/// Markup is stripped from the assembled text, so a tag split across
/// fragments is still removed.
pub fn assemble<I, S>(fragments: I, sanitize: bool) -> String
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut assembler = StreamAssembler::new();
    for fragment in fragments {
        let fragment: Option<&str> = fragment.as_ref().map(|text| text.as_ref());
        assembler.push_text(fragment);
    }
    assembler.finish(sanitize).content
}

/// The displayable parts of one chunk.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChunkFragments<'a> {
    /// Reply text to print and keep.
    pub text: Option<&'a str>,
    /// Reasoning text to print and discard.
    pub reasoning: Option<&'a str>,
}

/// A reply assembled from a drained stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    /// The concatenated (and possibly sanitized) reply text.
    pub content: String,
    /// The finish reason from the last chunk that carried one.
    pub finish_reason: Option<FinishReason>,
    /// Usage, if the provider reported it on the stream.
    pub usage: Option<Usage>,
    /// How many chunks were accepted.
    pub chunks: usize,
}

/// Accumulates a streamed reply chunk by chunk.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    text: String,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    chunks: usize,
}

impl StreamAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment; `None` and empty fragments are skipped.
    ///
    /// Returns the fragment when it was kept.
    pub fn push_text<'a>(&mut self, fragment: Option<&'a str>) -> Option<&'a str> {
        let fragment = fragment.filter(|text| !text.is_empty())?;
        self.text.push_str(fragment);
        Some(fragment)
    }

    /// Accept one chunk, recording finish reason and usage.
    pub fn push_chunk<'a>(&mut self, chunk: &'a ChatCompletionChunk) -> ChunkFragments<'a> {
        self.chunks += 1;
        if let Some(reason) = chunk.finish_reason() {
            self.finish_reason = Some(reason.clone());
        }
        if let Some(usage) = chunk.usage() {
            self.usage = Some(*usage);
        }
        ChunkFragments {
            text: self.push_text(chunk.content()),
            reasoning: chunk.reasoning().filter(|text| !text.is_empty()),
        }
    }

    /// The raw text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Finish the reply.
    pub fn finish(self, sanitize: bool) -> Assembled {
        let content = if sanitize {
            strip_markup(&self.text)
        } else {
            self.text
        };
        Assembled {
            content,
            finish_reason: self.finish_reason,
            usage: self.usage,
            chunks: self.chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_and_strips_markup() {
        let fragments = ["Hel", "lo, ", "world", "<tag>", "!"];
        let text = assemble(fragments.iter().map(Some), true);
        assert_eq!(text, "Hello, world!");
    }

    #[test]
    fn keeps_markup_when_not_sanitizing() {
        let fragments = ["Hel", "lo, ", "world", "<tag>", "!"];
        let text = assemble(fragments.iter().map(Some), false);
        assert_eq!(text, "Hello, world<tag>!");
    }

    #[test]
    fn absent_fragments_are_skipped() {
        let fragments = vec![Some("a"), None, Some(""), Some("b")];
        assert_eq!(assemble(fragments, true), "ab");
    }

    #[test]
    fn tag_split_across_fragments() {
        let fragments = vec![Some("x<th"), Some("ink>y")];
        assert_eq!(assemble(fragments, true), "xy");
    }

    #[test]
    fn empty_stream() {
        let fragments: Vec<Option<&str>> = Vec::new();
        assert_eq!(assemble(fragments, true), "");
    }

    #[test]
    fn chunks_record_finish_and_usage() {
        let mut assembler = StreamAssembler::new();
        let first = ChatCompletionChunk::with_text("Order ");
        let reasoning = ChatCompletionChunk::with_reasoning("checking");
        let second = ChatCompletionChunk::with_text("shipped.");
        let last = ChatCompletionChunk::finished(FinishReason::Stop, Some(Usage::new(12, 3)));

        assert_eq!(assembler.push_chunk(&first).text, Some("Order "));
        let fragments = assembler.push_chunk(&reasoning);
        assert_eq!(fragments.text, None);
        assert_eq!(fragments.reasoning, Some("checking"));
        assembler.push_chunk(&second);
        assert_eq!(assembler.push_chunk(&last), ChunkFragments::default());
        assert_eq!(assembler.text(), "Order shipped.");

        let assembled = assembler.finish(true);
        assert_eq!(assembled.content, "Order shipped.");
        assert_eq!(assembled.finish_reason, Some(FinishReason::Stop));
        assert_eq!(assembled.usage.map(|u| u.total_tokens), Some(15));
        assert_eq!(assembled.chunks, 4);
    }
}
