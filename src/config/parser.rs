use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// The API key is not resolved here; see [`crate::config::resolve_api_key`].
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs over the same data root can be told apart
/// when their configuration differs.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Loads `KEY=value` pairs from an env file into the process environment
///
/// With no path, a `.env` in the working directory or one of its parents is
/// used when present. Variables already set in the environment win over the
/// file.
///
/// # Returns
///
/// * `Ok(Some(path))` - The file that was loaded
/// * `Ok(None)` - No path given and no `.env` found
/// * `Err(ConfigError::EnvFile)` - The file could not be read or parsed
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let loaded = match path {
        Some(file) => dotenvy::from_path(file).map(|()| file.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(file) => Ok(Some(file)),
        Err(e) if path.is_none() && e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::EnvFile(e.to_string())),
    }
}
