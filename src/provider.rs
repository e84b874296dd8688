//! The seam between a chat session and whatever generates replies.
//!
//! A [`CompletionProvider`] is stateless across calls: every request carries
//! the whole transcript.  [`Groq`](crate::Groq) is the HTTP implementation;
//! tests substitute scripted providers.

use std::pin::Pin;

use futures::Stream;

use crate::Result;
use crate::types::{ChatCompletion, ChatCompletionChunk, CompletionRequest};

/// A finite, non-restartable stream of reply chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// A hosted chat-completion endpoint.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request a materialized reply.
    async fn complete(&self, request: CompletionRequest) -> Result<ChatCompletion>;

    /// Request a streamed reply.
    ///
    /// Errors that happen before the first chunk are returned here; errors
    /// after that are yielded by the stream.
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream>;
}

#[async_trait::async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for std::sync::Arc<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<ChatCompletion> {
        (**self).complete(request).await
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        (**self).stream(request).await
    }
}
