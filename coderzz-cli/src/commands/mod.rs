pub mod ask;
pub mod chat;
pub mod config;
pub mod models;
pub mod serve;

use anyhow::{Context, Result};
use coderzz_core::{ActionSet, Assistant, PolicyError, SessionManager};
use coderzz_models::providers::ProviderKind;

use crate::config::{CoderzzConfig, ConfigLoader};

/// Overrides shared by the commands that talk to a model
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GenerationOverrides {
    /// Generation provider (ollama, simulated)
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,
}

impl GenerationOverrides {
    pub fn apply(&self, config: &mut CoderzzConfig) {
        if let Some(provider) = self.provider {
            config.generation.provider = provider;
        }
        if let Some(model) = &self.model {
            config.generation.model = model.clone();
        }
    }
}

/// Load config, apply overrides and build the pieces every session needs.
pub fn bootstrap(overrides: &GenerationOverrides) -> Result<(CoderzzConfig, SessionManager, Assistant)> {
    let mut config = ConfigLoader::load()?;
    overrides.apply(&mut config);

    let manager =
        SessionManager::new(config.policy.clone()).context("Invalid [policy] configuration")?;
    let assistant = Assistant::new(config.generation.provider(), config.generation.settings());
    Ok((config, manager, assistant))
}

/// Resolve a template by index or (case-insensitive) label.
pub fn resolve_action(actions: &ActionSet, reference: &str) -> Result<usize, PolicyError> {
    let reference = reference.trim();
    if let Ok(index) = reference.parse::<usize>() {
        return actions.require(index).map(|a| a.index());
    }
    actions
        .find_by_label(reference)
        .map(|a| a.index())
        .ok_or_else(|| PolicyError::InvalidInput(format!("unknown code type '{reference}'")))
}

/// Print only what the stream added since the last call.
pub(crate) struct StreamPrinter<W> {
    out: W,
    printed: usize,
    error: Option<std::io::Error>,
}

impl<W: std::io::Write> StreamPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            error: None,
        }
    }

    pub fn show(&mut self, accumulated: &str) {
        if self.error.is_some() {
            return;
        }
        let suffix = accumulated.get(self.printed..).unwrap_or_default();
        self.printed = accumulated.len();
        if let Err(e) = self
            .out
            .write_all(suffix.as_bytes())
            .and_then(|()| self.out.flush())
        {
            self.error = Some(e);
        }
    }

    /// Terminate the answer with a newline and surface any write error.
    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if self.printed > 0 {
            writeln!(self.out)?;
        }
        Ok(self.out)
    }
}
