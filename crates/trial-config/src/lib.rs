//! Trial Configuration System
//!
//! Produces the normalized option set the `trial` command line parses against:
//! - Built-in runner defaults
//! - User configuration (~/.trial/config.toml)
//! - Project configuration (trial.toml)
//! - Environment variables (TRIAL_*)
//!
//! # Configuration Hierarchy
//!
//! Sources are merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. User config (~/.trial/config.toml)
//! 3. Project config (./trial.toml, or the file named by `--config`)
//! 4. Environment variables (TRIAL_*)
//! 5. CLI flags (applied by the argument parser on top of the result)
//!
//! # Example
//!
//! ```no_run
//! use trial_config::OptionsLoader;
//!
//! let loader = OptionsLoader::new(".");
//! let options = loader.load(&["--reporter", "dot"]).unwrap();
//! assert_eq!(options.args(), ["--reporter", "dot"]);
//! ```

pub mod global;
pub mod loader;
pub mod options;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{ConfigSource, OptionsLoader, CONFIG_FILE_NAME};
pub use options::{NormalizedOptions, OptionValue};
pub use project::{parse_millis, RunnerConfig, TimeValue};
