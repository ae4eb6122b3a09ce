//! Generation provider trait and implementations.
//!
//! The [`ModelProvider`] trait defines the unified interface for everything
//! that turns a prompt into code: the Ollama server and the offline
//! simulated generator. The assistant only ever sees a [`ChatStream`], so
//! the two are interchangeable.
//!
//! # Example
//!
//! ```ignore
//! use coderzz_models::providers::{ChatRequest, Message, ModelProvider};
//!
//! async fn generate(provider: &dyn ModelProvider) -> coderzz_models::Result<()> {
//!     let request = ChatRequest::new(
//!         "codellama",
//!         vec![Message::user("Generate Python code for: sort a list")],
//!     );
//!     let response = provider.chat(request).await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

mod ollama;
mod simulated;
mod types;

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};

pub use ollama::{DEFAULT_BASE_URL, OllamaProvider, ndjson_chunks};
pub use simulated::SimulatedProvider;
pub use types::*;

use crate::{Error, ModelInfo, Result};

/// A stream of chat response chunks for streaming responses.
///
/// This is a pinned, boxed stream that yields [`StreamChunk`] items or errors.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Trait for generation providers.
///
/// # Required Methods
///
/// - [`name`](ModelProvider::name) - Provider identifier (e.g., "ollama")
/// - [`models`](ModelProvider::models) - List of known models
/// - [`chat_stream`](ModelProvider::chat_stream) - Streaming chat completion
///
/// [`chat`](ModelProvider::chat) has a default implementation that drains
/// the stream.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the provider name.
    fn name(&self) -> &str;

    /// Returns the list of models available from this provider.
    fn models(&self) -> Vec<ModelInfo>;

    /// Perform a streaming chat completion request.
    ///
    /// Chunks arrive in generation order; the final chunk carries the stop
    /// reason and, when the backend reports it, usage statistics.
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream>;

    /// Perform a chat completion request and return the whole response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let mut stream = self.chat_stream(request).await?;
        let mut content = String::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut usage = Usage::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.delta {
                content.push_str(&delta);
            }
            if let Some(reason) = chunk.stop_reason {
                stop_reason = reason;
            }
            if let Some(u) = chunk.usage {
                usage = u;
            }
        }

        Ok(ChatResponse {
            content,
            stop_reason,
            usage,
        })
    }
}

/// Which provider implementation to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// A local Ollama server.
    #[default]
    Ollama,
    /// Offline placeholder generator.
    Simulated,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "simulated" | "stub" => Ok(Self::Simulated),
            other => Err(Error::UnknownProvider(other.to_string())),
        }
    }
}

/// Build a provider of the given kind.
///
/// `base_url` is only used by providers that talk to a server.
pub fn create_provider(kind: ProviderKind, base_url: Option<&str>) -> Arc<dyn ModelProvider> {
    match kind {
        ProviderKind::Ollama => Arc::new(OllamaProvider::with_base_url(
            base_url.unwrap_or(DEFAULT_BASE_URL),
        )),
        ProviderKind::Simulated => Arc::new(SimulatedProvider::new()),
    }
}
