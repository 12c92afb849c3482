//! Runner Configuration (trial.toml)
//!
//! Handles the runner settings stored in `trial.toml` at the project root.
//! The user-level file shares the same schema.

use crate::options::{NormalizedOptions, OptionValue};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Runner configuration from trial.toml
///
/// Every field is optional so partial files can be layered on top of each
/// other with [`RunnerConfig::merge`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Files or directories holding tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<Vec<String>>,

    /// Extensions a file needs to be picked up from a directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<String>>,

    /// Paths excluded from discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,

    /// Descend into subdirectories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,

    /// Sort discovered files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,

    /// Reporter name or reporter file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,

    /// Per-test timeout (milliseconds, or a string such as "2s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeValue>,

    /// Slow-test threshold, same syntax as `timeout`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow: Option<TimeValue>,

    /// Stop after the first failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bail: Option<bool>,

    /// Only run tests matching this pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grep: Option<String>,

    /// Number of workers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<u32>,

    /// Setup files loaded before the tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require: Option<Vec<String>>,
}

/// A duration written either as plain milliseconds or as text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TimeValue {
    Millis(u64),
    Text(String),
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Millis(ms) => write!(f, "{ms}"),
            TimeValue::Text(text) => f.write_str(text),
        }
    }
}

impl TimeValue {
    /// The duration in milliseconds
    pub fn to_millis(&self) -> Result<u64, String> {
        match self {
            TimeValue::Millis(ms) => Ok(*ms),
            TimeValue::Text(text) => parse_millis(text),
        }
    }
}

/// Parse a duration given as `2000`, `2000ms` or `2s` into milliseconds
pub fn parse_millis(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let invalid = || format!("'{value}' is not a duration (expected e.g. 2000, 2000ms or 2s)");

    if let Some(ms) = value.strip_suffix("ms") {
        return ms.trim().parse().map_err(|_| invalid());
    }
    if let Some(secs) = value.strip_suffix('s') {
        let secs: f64 = secs.trim().parse().map_err(|_| invalid())?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(invalid());
        }
        return Ok((secs * 1000.0).round() as u64);
    }
    value.parse().map_err(|_| invalid())
}

impl RunnerConfig {
    /// Built-in defaults, the lowest layer of the hierarchy
    pub fn defaults() -> Self {
        Self {
            spec: Some(vec!["test".to_string()]),
            extension: Some(vec!["spec".to_string()]),
            ignore: None,
            recursive: Some(false),
            sort: Some(false),
            reporter: Some("spec".to_string()),
            timeout: Some(TimeValue::Millis(2000)),
            slow: Some(TimeValue::Millis(75)),
            bail: Some(false),
            grep: None,
            jobs: Some(default_jobs()),
            require: None,
        }
    }

    /// Load runner configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the runner configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(reporter) = &self.reporter {
            if reporter.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "reporter".to_string(),
                    reason: "reporter cannot be empty".to_string(),
                });
            }
        }

        for (field, value) in [("timeout", &self.timeout), ("slow", &self.slow)] {
            if let Some(value) = value {
                value
                    .to_millis()
                    .map_err(|reason| ConfigError::InvalidValue {
                        field: field.to_string(),
                        reason,
                    })?;
            }
        }

        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "jobs".to_string(),
                reason: "jobs must be at least 1".to_string(),
            });
        }

        if let Some(extensions) = &self.extension {
            if let Some(ext) = extensions.iter().find(|e| e.trim_start_matches('.').is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "extension".to_string(),
                    reason: format!("'{ext}' is not a file extension"),
                });
            }
        }

        Ok(())
    }

    /// Layer `other` on top of `self`; every field set in `other` wins
    pub fn merge(self, other: RunnerConfig) -> Self {
        Self {
            spec: other.spec.or(self.spec),
            extension: other.extension.or(self.extension),
            ignore: other.ignore.or(self.ignore),
            recursive: other.recursive.or(self.recursive),
            sort: other.sort.or(self.sort),
            reporter: other.reporter.or(self.reporter),
            timeout: other.timeout.or(self.timeout),
            slow: other.slow.or(self.slow),
            bail: other.bail.or(self.bail),
            grep: other.grep.or(self.grep),
            jobs: other.jobs.or(self.jobs),
            require: other.require.or(self.require),
        }
    }

    /// Flatten into the option map the argument parser consumes
    pub fn into_options(self, args: Vec<String>, config_file: Option<PathBuf>) -> NormalizedOptions {
        let mut options = NormalizedOptions::new(args, config_file);

        let lists = [
            ("spec", self.spec),
            ("extension", self.extension),
            ("ignore", self.ignore),
            ("require", self.require),
        ];
        for (name, value) in lists {
            if let Some(items) = value {
                options.insert(name, OptionValue::List(items));
            }
        }

        let flags = [
            ("recursive", self.recursive),
            ("sort", self.sort),
            ("bail", self.bail),
        ];
        for (name, value) in flags {
            if let Some(flag) = value {
                options.insert(name, OptionValue::Flag(flag));
            }
        }

        let texts = [
            ("reporter", self.reporter),
            ("timeout", self.timeout.map(|t| t.to_string())),
            ("slow", self.slow.map(|t| t.to_string())),
            ("grep", self.grep),
            ("jobs", self.jobs.map(|j| j.to_string())),
        ];
        for (name, value) in texts {
            if let Some(text) = value {
                options.insert(name, OptionValue::Text(text));
            }
        }

        options
    }
}

/// One worker per available core, leaving one for the coordinator
fn default_jobs() -> u32 {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    u32::try_from(cores.saturating_sub(1).max(1)).unwrap_or(1)
}
