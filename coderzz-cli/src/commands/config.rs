use std::path::Path;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use crate::config::{CoderzzConfig, ConfigLoader};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the merged configuration as TOML
    Show,
    /// Print where the user and project config files live
    Path,
    /// Write a config file populated with the defaults
    Init {
        /// Write the project file instead of the user file
        #[arg(long)]
        project: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
        ConfigCommands::Init { project, force } => {
            let path = if project {
                ConfigLoader::project_config_path()
            } else {
                ConfigLoader::user_config_path()
            };
            init_config(&path, force)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn show_paths() -> Result<()> {
    let user = ConfigLoader::user_config_path();
    let project = ConfigLoader::project_config_path();
    println!("User config:    {}{}", user.display(), missing_marker(&user));
    println!("Project config: {}{}", project.display(), missing_marker(&project));
    Ok(())
}

fn missing_marker(path: &Path) -> &'static str {
    if path.exists() { "" } else { " (not found)" }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    ConfigLoader::save_to_path(&CoderzzConfig::default(), path)
}
