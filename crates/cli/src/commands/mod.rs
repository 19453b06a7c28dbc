pub mod doctor;
pub mod index;
pub mod init;
pub mod migrate;
pub mod serve;
pub mod token;
pub mod user;

use std::path::{Path, PathBuf};
use workroom_config::{AppConfig, ConfigError};

/// The config file in use: `--config`, or the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load and validate configuration, applying environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    AppConfig::load_with_env(&config_path(explicit))
}
