use std::sync::Arc;
use std::time::Duration;

use coderzz_core::assistant::{DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use coderzz_core::input::DEFAULT_TESSERACT_CMD;
use coderzz_core::{GenerationSettings, PolicyConfig, TemplateSpec, TesseractOcr};
use coderzz_models::providers::{DEFAULT_BASE_URL, ModelProvider, ProviderKind, create_provider};
use serde::{Deserialize, Serialize};

/// Default host for the coderzz server
pub const DEFAULT_HOST: &str = coderzz_server::DEFAULT_HOST;
/// Default port for the coderzz server
pub const DEFAULT_PORT: u16 = coderzz_server::DEFAULT_PORT;
/// Default generation timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCoderzzConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub generation: RawGenerationConfig,

    #[serde(default)]
    pub policy: RawPolicyConfig,

    #[serde(default)]
    pub ocr: RawOcrConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGenerationConfig {
    pub provider: Option<ProviderKind>,
    /// Base URL of the model server
    pub host: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPolicyConfig {
    pub epsilon: Option<f64>,
    pub learning_rate: Option<f64>,
    pub discount_factor: Option<f64>,
    pub templates: Option<Vec<TemplateSpec>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawOcrConfig {
    pub tesseract_cmd: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CoderzzConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub provider: ProviderKind,

    /// Model server URL; `OLLAMA_HOST` or the local default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            host: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GenerationConfig {
    /// Resolved model server URL.
    pub fn base_url(&self) -> String {
        self.host
            .clone()
            .or_else(|| std::env::var("OLLAMA_HOST").ok().filter(|h| !h.is_empty()))
            .map(|h| normalize_host(&h))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn provider(&self) -> Arc<dyn ModelProvider> {
        create_provider(self.provider, Some(&self.base_url()))
    }
}

/// `OLLAMA_HOST` is often written without a scheme ("127.0.0.1:11434").
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrConfig {
    pub tesseract_cmd: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: DEFAULT_TESSERACT_CMD.to_string(),
        }
    }
}

impl OcrConfig {
    pub fn engine(&self) -> TesseractOcr {
        TesseractOcr::new(self.tesseract_cmd.clone())
    }
}
