//! Model listing for the configured provider.

use anyhow::{Context, Result};
use clap::Args;
use coderzz_models::ModelInfo;
use coderzz_models::providers::{ModelProvider, OllamaProvider, ProviderKind, SimulatedProvider};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tracing::debug;

use crate::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct ModelsArgs {
    /// Provider to query instead of the configured one
    #[arg(long)]
    pub provider: Option<ProviderKind>,
}

pub async fn run(args: ModelsArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let kind = args.provider.unwrap_or(config.generation.provider);

    let models = match kind {
        ProviderKind::Ollama => {
            let url = config.generation.base_url();
            debug!(url = %url, "Listing Ollama models");
            OllamaProvider::with_base_url(&url)
                .refresh_models()
                .await
                .with_context(|| format!("Could not reach Ollama at {url}"))?
        }
        ProviderKind::Simulated => SimulatedProvider::new().models(),
    };

    if models.is_empty() {
        println!("No models available from {kind}.");
        return Ok(());
    }

    println!("{}", models_table(&models, &config.generation.model));
    Ok(())
}

fn models_table(models: &[ModelInfo], configured: &str) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Size").fg(Color::Cyan),
        Cell::new("Modified").fg(Color::Cyan),
        Cell::new("").fg(Color::Cyan),
    ]);

    for model in models {
        let selected = model.name == configured || model.id.model() == configured;
        table.add_row(vec![
            Cell::new(&model.provider),
            Cell::new(&model.name),
            Cell::new(model.size_bytes.map(format_size).unwrap_or_else(|| "-".to_string())),
            Cell::new(model.modified_at.as_deref().unwrap_or("-")),
            Cell::new(if selected { "configured" } else { "" }),
        ]);
    }
    table
}

fn format_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else {
        format!("{:.0} MB", bytes / MB)
    }
}
