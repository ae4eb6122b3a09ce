//! Ollama local model provider.
//!
//! Connects to a local Ollama instance for running code models like
//! CodeLlama, DeepSeek Coder, etc.
//!
//! # Example
//!
//! ```ignore
//! use coderzz_models::providers::OllamaProvider;
//!
//! let provider = OllamaProvider::new();  // Uses localhost:11434
//! let provider = OllamaProvider::with_base_url("http://192.168.1.100:11434");
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::RwLock;

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChatRequest, ChatStream, StopReason, StreamChunk, Usage};
use crate::{Capabilities, Error, ModelInfo, Result};

/// Default Ollama API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

// ────────────────────────────────────────────────────────────────────────────
// Ollama API Types
// ────────────────────────────────────────────────────────────────────────────

/// Response from Ollama's `/api/tags` endpoint.
#[derive(Debug, Deserialize)]
pub struct OllamaTagsResponse {
    pub models: Vec<OllamaModel>,
}

/// Model information from Ollama's API.
#[derive(Debug, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl OllamaModel {
    /// Convert to a `ModelInfo`.
    pub fn to_model_info(&self) -> ModelInfo {
        let mut builder = ModelInfo::builder("ollama", &self.name)
            .capabilities(Capabilities::chat())
            .local();
        if let Some(size) = self.size {
            builder = builder.size_bytes(size);
        }
        if let Some(modified_at) = &self.modified_at {
            builder = builder.modified_at(modified_at);
        }
        builder.build()
    }
}

/// Message in an Ollama chat request/response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for Ollama's `/api/chat` endpoint.
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaChatOptions>,
}

/// Chat options for Ollama.
#[derive(Debug, Serialize)]
pub struct OllamaChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl From<ChatRequest> for OllamaChatRequest {
    fn from(request: ChatRequest) -> Self {
        let messages = request
            .messages
            .iter()
            .map(|m| OllamaChatMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        let options = if request.temperature.is_some()
            || request.max_tokens.is_some()
            || request.stop.is_some()
        {
            Some(OllamaChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: request.stop,
            })
        } else {
            None
        };

        Self {
            model: request.model,
            messages,
            stream: true,
            options,
        }
    }
}

/// One NDJSON line from Ollama's streaming `/api/chat` endpoint.
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    pub model: String,
    pub message: OllamaChatMessage,
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl OllamaChatResponse {
    /// Convert to a streaming chunk.
    pub fn to_stream_chunk(&self) -> StreamChunk {
        StreamChunk {
            delta: if self.message.content.is_empty() {
                None
            } else {
                Some(self.message.content.clone())
            },
            stop_reason: self.done.then_some(StopReason::EndTurn),
            usage: self.done.then(|| {
                Usage::new(
                    self.prompt_eval_count.unwrap_or(0),
                    self.eval_count.unwrap_or(0),
                )
            }),
        }
    }
}

/// Ollama reports mid-stream failures as `{"error": "..."}` lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OllamaStreamLine {
    Error { error: String },
    Chunk(OllamaChatResponse),
}

// ────────────────────────────────────────────────────────────────────────────
// NDJSON framing
// ────────────────────────────────────────────────────────────────────────────

struct NdjsonState<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    ready: VecDeque<Result<StreamChunk>>,
    finished: bool,
}

impl<S> NdjsonState<S> {
    fn drain_complete_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.push_line(&line);
        }
    }

    fn flush_remainder(&mut self) {
        let rest = std::mem::take(&mut self.buffer);
        self.push_line(&rest);
    }

    fn push_line(&mut self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        match serde_json::from_str::<OllamaStreamLine>(trimmed) {
            Ok(OllamaStreamLine::Chunk(response)) => {
                let chunk = response.to_stream_chunk();
                if !chunk.is_empty() {
                    self.ready.push_back(Ok(chunk));
                }
            }
            Ok(OllamaStreamLine::Error { error }) => {
                self.ready.push_back(Err(Error::ProviderApi(error)));
            }
            Err(e) => {
                warn!(error = %e, "Discarding malformed Ollama stream line");
                self.ready
                    .push_back(Err(Error::MalformedChunk(format!("{e}: {trimmed}"))));
            }
        }
    }
}

/// Re-frame a raw byte stream into Ollama chat chunks.
///
/// Network reads do not respect line boundaries, so bytes are buffered until
/// a full line is available. A trailing line without a newline is decoded
/// when the byte stream ends. Empty chunks are dropped; order is preserved.
pub fn ndjson_chunks<S, B, E>(bytes: S) -> impl Stream<Item = Result<StreamChunk>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let state = NdjsonState {
        inner: Box::pin(bytes),
        buffer: Vec::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(bytes.as_ref());
                    state.drain_complete_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.ready.push_back(Err(Error::Request(e.to_string())));
                }
                None => {
                    state.finished = true;
                    state.flush_remainder();
                }
            }
        }
    })
}

// ────────────────────────────────────────────────────────────────────────────
// OllamaProvider
// ────────────────────────────────────────────────────────────────────────────

/// Ollama local model provider.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
    cached_models: RwLock<Vec<ModelInfo>>,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default URL (localhost:11434).
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new Ollama provider with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            cached_models: RwLock::new(Vec::new()),
        }
    }

    /// Get the base URL for this provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the list of cached models.
    ///
    /// Call [`refresh_models`](Self::refresh_models) to update from the Ollama API.
    pub fn cached_models(&self) -> Vec<ModelInfo> {
        self.cached_models
            .read()
            .map(|models| models.clone())
            .unwrap_or_default()
    }

    /// Refresh the model list from `/api/tags`.
    pub async fn refresh_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ProviderApi(format!(
                "Ollama API returned status {}",
                response.status()
            )));
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        let models: Vec<ModelInfo> = tags.models.iter().map(OllamaModel::to_model_info).collect();
        debug!(count = models.len(), "Refreshed Ollama models");

        if let Ok(mut cache) = self.cached_models.write() {
            *cache = models.clone();
        }
        Ok(models)
    }

    /// Stream a chat completion from `/api/chat`.
    pub async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest::from(request);
        debug!(model = %body.model, "Sending Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "Ollama API returned {}: {}",
                status, body
            )));
        }

        Ok(Box::pin(ndjson_chunks(response.bytes_stream())))
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl super::ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn models(&self) -> Vec<ModelInfo> {
        self.cached_models()
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        self.stream_chat(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Message;

    fn byte_stream(
        parts: Vec<&'static str>,
    ) -> impl Stream<Item = std::result::Result<Vec<u8>, std::io::Error>> + Send + 'static {
        futures_util::stream::iter(parts.into_iter().map(|p| Ok(p.as_bytes().to_vec())))
    }

    async fn collect(parts: Vec<&'static str>) -> Vec<Result<StreamChunk>> {
        ndjson_chunks(byte_stream(parts)).collect().await
    }

    #[test]
    fn new_creates_provider_with_default_url() {
        let provider = OllamaProvider::new();
        assert_eq!(provider.base_url(), "http://localhost:11434");
    }

    #[test]
    fn with_base_url_strips_trailing_slash() {
        let provider = OllamaProvider::with_base_url("http://192.168.1.100:11434/");
        assert_eq!(provider.base_url(), "http://192.168.1.100:11434");
    }

    #[test]
    fn models_empty_until_refreshed() {
        let provider = OllamaProvider::new();
        assert!(provider.cached_models().is_empty());
    }

    #[test]
    fn parse_tags_response_extracts_models() {
        let json = r#"{
            "models": [
                {
                    "name": "codellama:7b",
                    "model": "codellama:7b",
                    "modified_at": "2024-01-15T10:00:00Z",
                    "size": 3825819519,
                    "digest": "abc123"
                },
                { "name": "deepseek-coder:6.7b" }
            ]
        }"#;

        let response: OllamaTagsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.models.len(), 2);

        let info = response.models[0].to_model_info();
        assert_eq!(info.id.to_string(), "ollama:codellama:7b");
        assert!(info.local);
        assert_eq!(info.size_bytes, Some(3825819519));

        let bare = response.models[1].to_model_info();
        assert!(bare.size_bytes.is_none());
    }

    #[test]
    fn chat_request_converts_roles_and_options() {
        let request = ChatRequest::new(
            "codellama",
            vec![Message::system("You write code."), Message::user("sort")],
        )
        .temperature(0.2);

        let body = OllamaChatRequest::from(request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "codellama");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "sort");
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert!(json["options"].get("num_predict").is_none());
    }

    #[test]
    fn chat_request_without_options_omits_them() {
        let body = OllamaChatRequest::from(ChatRequest::new("m", vec![Message::user("x")]));
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("options").is_none());
    }

    #[test]
    fn final_chunk_has_stop_reason_and_usage() {
        let json = r#"{
            "model": "codellama",
            "message": { "role": "assistant", "content": "" },
            "done": true,
            "prompt_eval_count": 10,
            "eval_count": 15
        }"#;
        let response: OllamaChatResponse = serde_json::from_str(json).unwrap();
        let chunk = response.to_stream_chunk();

        assert!(chunk.delta.is_none());
        assert_eq!(chunk.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(chunk.usage.unwrap().total_tokens, 25);
    }

    #[tokio::test]
    async fn ndjson_reassembles_lines_split_across_reads() {
        let chunks = collect(vec![
            r#"{"model":"m","message":{"role":"assistant","content":"def "},"done":false}"#,
            "\n{\"model\":\"m\",\"message\":{\"role\":\"assis",
            "tant\",\"content\":\"f():\"},\"done\":false}\n",
            r#"{"model":"m","message":{"role":"assistant","content":""},"done":true}"#,
        ])
        .await;

        let chunks: Vec<StreamChunk> = chunks.into_iter().map(|c| c.unwrap()).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].delta.as_deref(), Some("def "));
        assert_eq!(chunks[1].delta.as_deref(), Some("f():"));
        assert_eq!(chunks[2].stop_reason, Some(StopReason::EndTurn));
    }

    #[tokio::test]
    async fn ndjson_handles_many_lines_in_one_read_and_blank_lines() {
        let chunks = collect(vec![concat!(
            "{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"a\"},\"done\":false}\n",
            "\n",
            "{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"b\"},\"done\":false}\n",
        )])
        .await;

        let text: String = chunks
            .into_iter()
            .filter_map(|c| c.unwrap().delta)
            .collect();
        assert_eq!(text, "ab");
    }

    #[tokio::test]
    async fn ndjson_surfaces_error_lines_and_malformed_json() {
        let chunks = collect(vec![
            "{\"error\":\"model 'nope' not found\"}\n",
            "this is not json\n",
        ])
        .await;

        assert_eq!(chunks.len(), 2);
        assert!(matches!(&chunks[0], Err(Error::ProviderApi(msg)) if msg.contains("not found")));
        assert!(matches!(&chunks[1], Err(Error::MalformedChunk(_))));
    }

    #[tokio::test]
    async fn ndjson_transport_error_ends_stream() {
        let parts: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"x\"},\"done\":false}\n".to_vec()),
            Err(std::io::Error::other("connection reset")),
            Ok(b"{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"y\"},\"done\":false}\n".to_vec()),
        ];
        let chunks: Vec<_> = ndjson_chunks(futures_util::stream::iter(parts))
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(matches!(&chunks[1], Err(Error::Request(msg)) if msg.contains("connection reset")));
    }

    // ────────────────────────────────────────────────────────────────────────
    // Integration Tests (require Ollama running)
    // ────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    #[ignore = "requires Ollama running locally with a model installed"]
    async fn integration_stream_chat_against_ollama() {
        use crate::providers::ModelProvider;

        let base_url =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let provider = OllamaProvider::with_base_url(&base_url);
        let models = provider.refresh_models().await.expect("refresh should succeed");
        let Some(model) = models.first() else {
            eprintln!("Skipping: no models installed in Ollama");
            return;
        };

        let request = ChatRequest::new(
            &model.name,
            vec![Message::user("Generate Python code for: print hello")],
        );
        let response = provider.chat(request).await.expect("chat should succeed");
        assert!(!response.content.is_empty());
    }
}
