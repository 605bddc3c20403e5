//! Configuration file loading and parsing.

use crate::env::{vars, EnvError, Environment};
use crate::types::{ConcurrencyMode, StagehandConfig};
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest accepted version tolerance.
pub const MAX_TOLERANCE_MS: u64 = 60_000;

const CONFIG_DIR: &str = ".stagehand";
const CONFIG_FILE: &str = "config.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error("invalid value for {var}: {value}")]
    InvalidOverride { var: String, value: String },
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: dir.as_ref().to_path_buf(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load `.stagehand/config.yaml`, falling back to defaults when absent.
    ///
    /// `.env` files next to `.stagehand/` are loaded first, so they feed both
    /// `${VAR}` expansion and the environment overrides, which are applied
    /// before validation.
    pub fn load(&self) -> Result<StagehandConfig, ConfigError> {
        Environment::load_dotenv(&self.base_path)?;
        let config_path = self.config_path();

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let expanded = expand_env_vars(&contents)?;
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        } else {
            StagehandConfig::default()
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;
        Ok(config)
    }

    /// Save configuration to `.stagehand/config.yaml`.
    pub fn save(&self, config: &StagehandConfig) -> Result<(), ConfigError> {
        let config_dir = self.base_path.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(config_dir.join(CONFIG_FILE), yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| {
        ConfigError::ValidationError {
            message: e.to_string(),
        }
    })?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let value = match (Environment::get(var_name), cap.get(2)) {
            (Some(v), _) => v,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                return Err(ConfigError::EnvVarNotFound {
                    var: var_name.to_string(),
                })
            }
        };
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}

/// Apply `STAGEHAND_*` environment overrides.
pub fn apply_env_overrides(config: &mut StagehandConfig) -> Result<(), ConfigError> {
    if let Some(raw) = Environment::get(vars::STAGEHAND_TOLERANCE_MS) {
        config.concurrency.tolerance_ms =
            raw.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                var: vars::STAGEHAND_TOLERANCE_MS.to_string(),
                value: raw.clone(),
            })?;
    }

    if let Some(raw) = Environment::get(vars::STAGEHAND_GUARD_MODE) {
        config.concurrency.mode =
            raw.parse::<ConcurrencyMode>()
                .map_err(|_| ConfigError::InvalidOverride {
                    var: vars::STAGEHAND_GUARD_MODE.to_string(),
                    value: raw.clone(),
                })?;
    }

    if let Some(path) = Environment::get(vars::STAGEHAND_DATABASE_PATH) {
        config.database.path = path;
    }

    Ok(())
}

/// Validate configuration values.
pub fn validate(config: &StagehandConfig) -> Result<(), ConfigError> {
    if config.concurrency.tolerance_ms > MAX_TOLERANCE_MS {
        return Err(ConfigError::ValidationError {
            message: format!("concurrency.tolerance_ms must be at most {MAX_TOLERANCE_MS}"),
        });
    }

    if config.authz.decision_cache && config.authz.decision_cache_capacity == 0 {
        return Err(ConfigError::ValidationError {
            message: "authz.decision_cache_capacity must be greater than 0".to_string(),
        });
    }

    if config.database.max_connections == 0 {
        return Err(ConfigError::ValidationError {
            message: "database.max_connections must be greater than 0".to_string(),
        });
    }

    if config.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            message: "database.path must not be empty".to_string(),
        });
    }

    Ok(())
}
