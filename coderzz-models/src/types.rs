//! Core types describing the models a provider can serve.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a model in format `provider:model_name`.
///
/// Ollama model names carry their own tag (`codellama:7b`), so only the
/// first `:` separates the provider.
///
/// # Examples
///
/// ```
/// use coderzz_models::ModelId;
///
/// let id = ModelId::new("ollama", "codellama:7b");
/// assert_eq!(id.provider(), "ollama");
/// assert_eq!(id.model(), "codellama:7b");
/// assert_eq!(id.to_string(), "ollama:codellama:7b");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Create a new model ID from provider and model name.
    pub fn new(provider: &str, model: &str) -> Self {
        Self(format!("{provider}:{model}"))
    }

    /// Parse a model ID from a string in `provider:model` format.
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Some(Self(s.to_string()))
            }
            _ => None,
        }
    }

    /// Get the provider portion of the ID.
    pub fn provider(&self) -> &str {
        self.0.split_once(':').map_or("", |(provider, _)| provider)
    }

    /// Get the model name portion of the ID.
    pub fn model(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, model)| model)
    }

    /// Get the full ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Model capabilities indicating what features the model supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Supports chat/conversation.
    pub chat: bool,
    /// Supports streaming responses.
    pub streaming: bool,
}

impl Capabilities {
    /// Create capabilities for a chat model.
    pub fn chat() -> Self {
        Self {
            chat: true,
            streaming: true,
        }
    }
}

/// Information about a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Unique model identifier.
    pub id: ModelId,
    /// Provider name (e.g., "ollama").
    pub provider: String,
    /// Human-readable model name.
    pub name: String,
    /// Model capabilities.
    pub capabilities: Capabilities,
    /// Whether this is a local model (not cloud-hosted).
    pub local: bool,
    /// On-disk size, when the provider reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Last modification time as reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

impl ModelInfo {
    /// Create a new model info builder.
    pub fn builder(provider: &str, name: &str) -> ModelInfoBuilder {
        ModelInfoBuilder::new(provider, name)
    }
}

/// Builder for constructing `ModelInfo`.
#[derive(Debug)]
pub struct ModelInfoBuilder {
    provider: String,
    name: String,
    capabilities: Capabilities,
    local: bool,
    size_bytes: Option<u64>,
    modified_at: Option<String>,
}

impl ModelInfoBuilder {
    fn new(provider: &str, name: &str) -> Self {
        Self {
            provider: provider.to_string(),
            name: name.to_string(),
            capabilities: Capabilities::default(),
            local: false,
            size_bytes: None,
            modified_at: None,
        }
    }

    /// Set the model capabilities.
    pub fn capabilities(mut self, caps: Capabilities) -> Self {
        self.capabilities = caps;
        self
    }

    /// Mark as a local model.
    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    /// Set the on-disk size.
    pub fn size_bytes(mut self, size: u64) -> Self {
        self.size_bytes = Some(size);
        self
    }

    /// Set the modification timestamp.
    pub fn modified_at(mut self, modified_at: impl Into<String>) -> Self {
        self.modified_at = Some(modified_at.into());
        self
    }

    /// Build the `ModelInfo`.
    pub fn build(self) -> ModelInfo {
        ModelInfo {
            id: ModelId::new(&self.provider, &self.name),
            provider: self.provider,
            name: self.name,
            capabilities: self.capabilities,
            local: self.local,
            size_bytes: self.size_bytes,
            modified_at: self.modified_at,
        }
    }
}
