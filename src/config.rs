use crate::error::{KuperError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub token: Option<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<ValidConfig> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            KuperError::Config(format!("cannot read config file '{}': {e}", path.display()))
        })?;
        Self::parse(&raw)
            .map_err(|e| KuperError::Config(format!("{}: {e}", path.display())))?
            .validate()
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn validate(self) -> Result<ValidConfig> {
        let token = self
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| KuperError::Config("'token' not found in config file".to_string()))?;

        let excludes = self
            .excludes
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();

        Ok(ValidConfig { token, excludes })
    }
}

/// Configuration with a token known to be present.
#[derive(Clone)]
pub struct ValidConfig {
    pub token: String,
    pub excludes: Vec<String>,
}

impl std::fmt::Debug for ValidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidConfig")
            .field("token", &"<redacted>")
            .field("excludes", &self.excludes)
            .finish()
    }
}
