use std::path::{Path, PathBuf};

use billing_app::{LoaderConfig, load_or_default};

const DEFAULT_CONFIG_FILE: &str = "billing-loader.toml";
const CONFIG_ENV: &str = "BILLING_LOADER_CONFIG";

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: LoaderConfig,
    /// File the settings came from; `None` when running on defaults.
    pub file: Option<PathBuf>,
}

/// Explicit flag first, then the environment, then the default file name in
/// the working directory.
pub fn load(explicit: Option<&Path>) -> billing_app::Result<ConfigLoad> {
    let file = resolve_path(explicit);
    let config = load_or_default(file.as_deref())?;
    Ok(ConfigLoad { config, file })
}

fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}
