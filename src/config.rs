use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("failed to parse configuration: {message}")]
    Parse { message: String },
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub conditions: ConditionsConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConditionsConfig {
    /// Namespace the condition constructors are looked up in.
    pub namespace: String,
}

impl Default for ConditionsConfig {
    fn default() -> Self {
        Self {
            namespace: "purrr".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub max_frames: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_frames: 256 }
    }
}

impl HostConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: HostConfig = toml::from_str(content).map_err(|error| ConfigError::Parse {
            message: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.conditions.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "`conditions.namespace` must not be empty".into(),
            });
        }
        if self.runtime.max_frames == 0 {
            return Err(ConfigError::Invalid {
                message: "`runtime.max_frames` must be at least 1".into(),
            });
        }
        Ok(())
    }
}
