//! Offline placeholder generator.
//!
//! Produces `# Generated code for: <prompt>` without contacting any model,
//! chunked the way a real server would stream it. Useful for demos, for
//! running the assistant without a GPU, and for tests.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use super::{ChatRequest, ChatStream, ModelProvider, StopReason, StreamChunk, Usage};
use crate::{Capabilities, ModelInfo, Result};

const MODEL_NAME: &str = "placeholder";

/// Provider that echoes the prompt back as a code comment.
#[derive(Debug, Clone, Default)]
pub struct SimulatedProvider {
    chunk_delay: Duration,
}

impl SimulatedProvider {
    /// Create a provider that emits all chunks immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between chunks so terminals render a visible stream.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// The full text this provider would generate for a prompt.
    pub fn render(prompt: &str) -> String {
        format!("# Generated code for: {prompt}\n")
    }

    /// Split text into word-sized pieces, keeping the separators so the
    /// pieces concatenate back to the original.
    fn split_chunks(text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            current.push(ch);
            if ch.is_whitespace() {
                chunks.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

#[async_trait]
impl ModelProvider for SimulatedProvider {
    fn name(&self) -> &str {
        "simulated"
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::builder("simulated", MODEL_NAME)
                .capabilities(Capabilities::chat())
                .local()
                .build(),
        ]
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let prompt = request.last_user_text().unwrap_or_default();
        let text = Self::render(prompt);
        let input_tokens = prompt.split_whitespace().count() as u64;

        let mut chunks: Vec<StreamChunk> = Self::split_chunks(&text)
            .into_iter()
            .map(StreamChunk::text)
            .collect();
        let output_tokens = chunks.len() as u64;
        chunks.push(StreamChunk {
            delta: None,
            stop_reason: Some(StopReason::EndTurn),
            usage: Some(Usage::new(input_tokens, output_tokens)),
        });

        let delay = self.chunk_delay;
        let stream = futures_util::stream::iter(chunks).then(move |chunk| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, crate::Error>(chunk)
        });

        Ok(Box::pin(stream))
    }
}
