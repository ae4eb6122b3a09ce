//! XDG Base Directory paths for coderzz.
//!
//! Every coderzz command resolves its files the same way on every
//! platform, so `coderzz config path` shows where `coderzz serve` looks.

use std::path::PathBuf;

const APP_DIR: &str = "coderzz";

/// Get the coderzz config directory.
///
/// Returns `$XDG_CONFIG_HOME/coderzz` if set, otherwise `~/.config/coderzz`.
///
/// # Examples
///
/// ```
/// use coderzz_paths::config_dir;
///
/// let config = config_dir().join("config.toml");
/// assert!(config.ends_with("coderzz/config.toml"));
/// ```
pub fn config_dir() -> PathBuf {
    resolve("XDG_CONFIG_HOME", ".config")
}

/// Path of the user-level config file.
pub fn user_config_file() -> PathBuf {
    config_dir().join("config.toml")
}

fn resolve(env_var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(env_var)
        && !base.is_empty()
    {
        PathBuf::from(base).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join(APP_DIR)
    } else {
        PathBuf::from(home_relative).join(APP_DIR)
    }
}
