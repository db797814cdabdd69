//! Filter configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! condition_limit = 1000
//! condition_limit_enabled = true
//! checker_mode = "conservative"
//! check_unused_vars = false
//! use_token_cache = true
//! ```

use crate::checker::CheckerMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default condition budget per evaluation
pub const DEFAULT_CONDITION_LIMIT: u32 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Conditions allowed per rule before evaluation stops
    pub condition_limit: u32,
    pub condition_limit_enabled: bool,
    pub checker_mode: CheckerMode,
    /// Report variables assigned but never read during syntax checks
    pub check_unused_vars: bool,
    pub use_token_cache: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            condition_limit: DEFAULT_CONDITION_LIMIT,
            condition_limit_enabled: true,
            checker_mode: CheckerMode::default(),
            check_unused_vars: false,
            use_token_cache: true,
        }
    }
}

impl FilterConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The limit to enforce, if any
    pub fn effective_limit(&self) -> Option<u32> {
        self.condition_limit_enabled.then_some(self.condition_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FilterConfig::default();
        assert_eq!(config.effective_limit(), Some(1000));
        assert_eq!(config.checker_mode, CheckerMode::Conservative);
        assert!(!config.check_unused_vars);
        assert!(config.use_token_cache);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(FilterConfig::from_toml_str("").unwrap(), FilterConfig::default());
    }

    #[test]
    fn test_parse_partial() {
        let config = FilterConfig::from_toml_str(
            r#"
condition_limit = 50
checker_mode = "liberal"
"#,
        )
        .unwrap();
        assert_eq!(config.condition_limit, 50);
        assert_eq!(config.checker_mode, CheckerMode::Liberal);
        assert!(config.condition_limit_enabled);
    }

    #[test]
    fn test_disabled_limit() {
        let config = FilterConfig::from_toml_str("condition_limit_enabled = false").unwrap();
        assert_eq!(config.effective_limit(), None);
    }

    #[test]
    fn test_invalid_toml() {
        let err = FilterConfig::from_toml_str("checker_mode = \"strict\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("invalid config"));
    }

    #[test]
    fn test_missing_file() {
        let err = FilterConfig::from_file(Path::new("/nonexistent/filterscript.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
