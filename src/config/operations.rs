//! Config loading and validation.

use super::model::Config;
use crate::error::{Result, TalkError};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// A missing file yields the defaults. Unknown fields are ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(TalkError::UserError(format!(
                    "failed to read config file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| TalkError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| TalkError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `login` must be non-empty and must not start with `@`
    /// - `workers`, `pass_budget`, `inactivity_minutes`, `spam_limit`, and
    ///   `lock_stale_minutes` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.login.trim().is_empty() {
            return Err(TalkError::UserError(
                "config validation failed: login must not be empty".to_string(),
            ));
        }
        if self.login.starts_with('@') {
            return Err(TalkError::UserError(format!(
                "config validation failed: login must not start with '@' (found '{}'). Use '{}' instead.",
                self.login,
                self.login.trim_start_matches('@')
            )));
        }

        let positive = [
            ("workers", self.workers as u64),
            ("pass_budget", self.pass_budget as u64),
            ("inactivity_minutes", u64::from(self.inactivity_minutes)),
            ("spam_limit", self.spam_limit as u64),
            ("lock_stale_minutes", u64::from(self.lock_stale_minutes)),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(TalkError::UserError(format!(
                    "config validation failed: {} must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }
}
