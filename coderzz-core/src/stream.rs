//! Accumulating streamed generation output

use coderzz_models::providers::{ChatStream, StopReason, StreamChunk, Usage};
use tokio_stream::StreamExt;

/// Text assembled from stream chunks, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamAccumulator {
    text: String,
    chunks: usize,
    stop_reason: Option<StopReason>,
    usage: Option<Usage>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Returns true if it carried text.
    pub fn push(&mut self, chunk: &StreamChunk) -> bool {
        if let Some(reason) = chunk.stop_reason {
            self.stop_reason = Some(reason);
        }
        if let Some(usage) = &chunk.usage {
            self.usage = Some(usage.clone());
        }
        match chunk.delta.as_deref() {
            Some(delta) if !delta.is_empty() => {
                self.text.push_str(delta);
                self.chunks += 1;
                true
            }
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn finish(self) -> StreamOutcome {
        StreamOutcome {
            text: self.text,
            chunks: self.chunks,
            stop_reason: self.stop_reason,
            usage: self.usage,
        }
    }
}

/// A fully consumed stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    pub text: String,
    /// Number of chunks that carried text
    pub chunks: usize,
    pub stop_reason: Option<StopReason>,
    pub usage: Option<Usage>,
}

/// Drain `stream`, calling `display` with the accumulated text after every
/// chunk that adds text. The first error aborts the stream.
pub async fn accumulate<F>(
    mut stream: ChatStream,
    mut display: F,
) -> Result<StreamOutcome, coderzz_models::Error>
where
    F: FnMut(&str),
{
    let mut acc = StreamAccumulator::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if acc.push(&chunk) {
            display(acc.as_str());
        }
    }
    Ok(acc.finish())
}
