use super::types::{
    CoderzzConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, GenerationConfig, OcrConfig,
    RawCoderzzConfig, RawGenerationConfig, RawOcrConfig, RawPolicyConfig, RawServerConfig,
    ServerConfig,
};
use anyhow::{Context, Result, bail};
use coderzz_core::PolicyConfig;
use coderzz_core::policy::{DEFAULT_DISCOUNT_FACTOR, DEFAULT_EPSILON, DEFAULT_LEARNING_RATE};
use std::path::{Path, PathBuf};

/// Env var that relocates the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "CODERZZ_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<CoderzzConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Merge the given files in order; missing files are skipped.
    pub fn load_layers(paths: &[PathBuf]) -> Result<CoderzzConfig> {
        let mut raw = RawCoderzzConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_raw(path)? {
                raw = Self::merge_raw(raw, layer);
            }
        }
        let config = Self::finalize(raw);
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &CoderzzConfig) -> Result<()> {
        if config.generation.timeout_secs == 0 {
            bail!("generation.timeout_secs must be at least 1 (every request would time out)");
        }
        Ok(())
    }

    fn read_raw(path: &Path) -> Result<Option<RawCoderzzConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/coderzz/config.toml`)
    pub fn user_config_path() -> PathBuf {
        coderzz_paths::user_config_file()
    }

    /// Get project config path
    /// Can be overridden with CODERZZ_PROJECT_CONFIG_DIR (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".coderzz/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawCoderzzConfig, overlay: RawCoderzzConfig) -> RawCoderzzConfig {
        RawCoderzzConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            generation: RawGenerationConfig {
                provider: overlay.generation.provider.or(base.generation.provider),
                host: overlay.generation.host.or(base.generation.host),
                model: overlay.generation.model.or(base.generation.model),
                system_prompt: overlay
                    .generation
                    .system_prompt
                    .or(base.generation.system_prompt),
                temperature: overlay.generation.temperature.or(base.generation.temperature),
                timeout_secs: overlay
                    .generation
                    .timeout_secs
                    .or(base.generation.timeout_secs),
            },
            policy: RawPolicyConfig {
                epsilon: overlay.policy.epsilon.or(base.policy.epsilon),
                learning_rate: overlay.policy.learning_rate.or(base.policy.learning_rate),
                discount_factor: overlay
                    .policy
                    .discount_factor
                    .or(base.policy.discount_factor),
                templates: overlay.policy.templates.or(base.policy.templates),
            },
            ocr: RawOcrConfig {
                tesseract_cmd: overlay.ocr.tesseract_cmd.or(base.ocr.tesseract_cmd),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawCoderzzConfig) -> CoderzzConfig {
        let generation_defaults = GenerationConfig::default();
        let policy_defaults = PolicyConfig::default();

        CoderzzConfig {
            server: ServerConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            generation: GenerationConfig {
                provider: raw.generation.provider.unwrap_or_default(),
                host: raw.generation.host,
                model: raw.generation.model.unwrap_or(generation_defaults.model),
                // An empty prompt in config means "no system prompt".
                system_prompt: match raw.generation.system_prompt {
                    Some(p) if p.trim().is_empty() => None,
                    Some(p) => Some(p),
                    None => generation_defaults.system_prompt,
                },
                temperature: raw.generation.temperature,
                timeout_secs: raw.generation.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
            policy: PolicyConfig {
                epsilon: raw.policy.epsilon.unwrap_or(DEFAULT_EPSILON),
                learning_rate: raw.policy.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE),
                discount_factor: raw.policy.discount_factor.unwrap_or(DEFAULT_DISCOUNT_FACTOR),
                templates: raw.policy.templates.unwrap_or(policy_defaults.templates),
            },
            ocr: OcrConfig {
                tesseract_cmd: raw
                    .ocr
                    .tesseract_cmd
                    .unwrap_or_else(|| OcrConfig::default().tesseract_cmd),
            },
        }
    }

    /// Save config to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(config: &CoderzzConfig, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(config)?;
        std::fs::write(path, toml)?;

        Ok(())
    }
}
