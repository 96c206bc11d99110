//! Workspace files: `config/config.toml`, then `config/{RECORD_HOOKS_ENV}.toml`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::{Path, PathBuf};

/// Selects the env-specific workspace file.
pub const ENV_VAR: &str = "RECORD_HOOKS_ENV";
const DEFAULT_ENV: &str = "development";

/// Workspace config files in override order; missing ones are skipped by the builder.
pub fn workspace_config_paths(workspace_root: &Path) -> [PathBuf; 2] {
    let dir = workspace_root.join("config");
    let env_name = std::env::var(ENV_VAR)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string());
    [dir.join("config.toml"), dir.join(format!("{}.toml", env_name))]
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(workspace_config_paths(workspace_root)
        .into_iter()
        .fold(builder, |builder, path| {
            builder.add_source(File::from(path).format(FileFormat::Toml).required(false))
        }))
}
