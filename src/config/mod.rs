//! Settings for the sign-in tool.
//!
//! Settings live in a TOML file, with support for environment variable
//! interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [session]
//! client_id = "${NSCM_CLIENT_ID}"
//! auth_proxy = "nodesource.example-registry.com"
//! redirect_uri = "https://login.example.com/callback"
//! auth_domain = "login.example.com"
//!
//! [logging]
//! level = "info"
//! ```

mod observability;
mod session;

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

pub use observability::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
pub use session::*;

/// File name looked up in the working directory and the config directory.
pub const CONFIG_FILE_NAME: &str = "nscm.toml";

/// Root settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Identity provider and auth proxy settings.
    pub session: SessionSettings,

    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse settings from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let settings: Settings = toml::from_str(&expanded)?;
        settings.session.validate()?;
        Ok(settings)
    }
}

/// Settings errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Get the default config directory path.
#[cfg(feature = "cli")]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("nscm"))
}

/// Get the default config directory path.
#[cfg(not(feature = "cli"))]
pub fn default_config_dir() -> Option<PathBuf> {
    None
}

/// Resolve which settings file to load.
///
/// An explicit path must exist. Otherwise `nscm.toml` in the working directory
/// wins over the one in the default config directory.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        return Ok(path.to_path_buf());
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Ok(cwd_config);
    }

    let default_path = default_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME));
    if let Some(path) = &default_path
        && path.exists()
    {
        return Ok(path.clone());
    }

    Err(ConfigError::NotFound(match default_path {
        Some(path) => format!(
            "create {} or {} with a [session] section",
            CONFIG_FILE_NAME,
            path.display()
        ),
        None => format!("create {CONFIG_FILE_NAME} with a [session] section"),
    }))
}

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"));

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left alone.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in ENV_VAR_PATTERN.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
