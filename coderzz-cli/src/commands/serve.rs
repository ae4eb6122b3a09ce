//! Run the HTTP server over the configured provider and policy.

use anyhow::{Context, Result};
use clap::Args;
use coderzz_core::{Assistant, SessionManager};
use coderzz_server::{AppState, CoderzzServer, ServerConfig};
use std::sync::Arc;
use tracing::info;

use super::GenerationOverrides;
use crate::config::{CoderzzConfig, ConfigLoader};

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (defaults to the configured port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (defaults to the configured host)
    #[arg(long)]
    pub host: Option<String>,

    #[command(flatten)]
    pub generation: GenerationOverrides,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    args.generation.apply(&mut config);

    let server_config = server_config(&args, &config);
    let state = app_state(&config)?;

    info!(
        addr = %server_config.addr(),
        epsilon = config.policy.epsilon,
        templates = config.policy.templates.len(),
        "Starting coderzz server"
    );
    CoderzzServer::new(server_config, state).run().await?;
    Ok(())
}

fn server_config(args: &ServeArgs, config: &CoderzzConfig) -> ServerConfig {
    ServerConfig::new(
        args.host.clone().unwrap_or_else(|| config.server.host.clone()),
        args.port.unwrap_or(config.server.port),
    )
}

fn app_state(config: &CoderzzConfig) -> Result<AppState> {
    let manager =
        SessionManager::new(config.policy.clone()).context("Invalid [policy] configuration")?;
    let assistant = Assistant::new(config.generation.provider(), config.generation.settings());
    Ok(AppState::new(Arc::new(manager), assistant).with_ocr(config.ocr.engine()))
}
