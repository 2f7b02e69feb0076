//! `strand.toml` configuration
//!
//! Every section and key is optional:
//!
//! ```toml
//! [design]
//! precision = -12
//! default_time_unit = -9
//!
//! [optimize]
//! nodangle = true
//! max_iterations = 1024
//!
//! [codegen]
//! parallel = false
//! declarations = true
//! fail_on_unsupported = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use strand_codegen::CodegenOptions;
use strand_opt::nodangle::DEFAULT_MAX_ITERATIONS;
use thiserror::Error;

/// Errors that can occur while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the file
    #[error("I/O error: {0}")]
    Io(String),

    /// TOML parsing error
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrandConfig {
    pub design: DesignConfig,
    pub optimize: OptimizeConfig,
    pub codegen: CodegenConfig,
}

/// Time settings applied to the loaded netlist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DesignConfig {
    /// Overrides the design time precision (power of ten, -12 = 1ps)
    pub precision: Option<i32>,
    /// Time unit for scopes that declare none
    pub default_time_unit: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeConfig {
    /// Run the dangling-object eliminator
    pub nodangle: bool,
    /// Safety ceiling on fixed-point iterations
    pub max_iterations: usize,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            nodangle: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    pub parallel: bool,
    pub declarations: bool,
    /// Treat skipped constructs as a failed build
    pub fail_on_unsupported: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            declarations: true,
            fail_on_unsupported: false,
        }
    }
}

impl CodegenConfig {
    pub fn options(&self) -> CodegenOptions {
        CodegenOptions {
            parallel: self.parallel,
            declarations: self.declarations,
        }
    }
}

impl StrandConfig {
    /// Parse a configuration from a file path
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_str(&contents)
    }

    /// Parse a configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.optimize.max_iterations == 0 {
            return Err(ConfigError::Validation(
                "optimize.max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = StrandConfig::from_str("").unwrap();
        assert_eq!(config, StrandConfig::default());
        assert!(config.optimize.nodangle);
        assert_eq!(config.optimize.max_iterations, 1024);
        assert!(config.codegen.declarations);
        assert!(!config.codegen.parallel);
        assert_eq!(config.design.precision, None);
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
            [design]
            precision = -12

            [codegen]
            parallel = true
        "#;

        let config = StrandConfig::from_str(toml).unwrap();
        assert_eq!(config.design.precision, Some(-12));
        assert_eq!(config.design.default_time_unit, None);
        assert!(config.codegen.parallel);
        assert!(config.codegen.declarations);
        assert!(config.optimize.nodangle);
    }

    #[test]
    fn test_rejects_unknown_keys_and_zero_ceiling() {
        let err = StrandConfig::from_str("[optimize]\nnodangel = false\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = StrandConfig::from_str("[optimize]\nmax_iterations = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strand.toml");
        std::fs::write(&path, "[optimize]\nnodangle = false\n").unwrap();

        let config = StrandConfig::from_path(&path).unwrap();
        assert!(!config.optimize.nodangle);

        let missing = StrandConfig::from_path(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
