//! Options Loader
//!
//! Handles loading and merging runner configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::options::NormalizedOptions;
use crate::project::{RunnerConfig, TimeValue};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "trial.toml";

/// Where the project configuration comes from, as selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Walk up from the working directory looking for trial.toml
    Discover,
    /// `--config <path>`
    Explicit(PathBuf),
    /// `--no-config`: skip both config files
    Disabled,
}

impl ConfigSource {
    /// Pick the config source out of raw argument tokens
    ///
    /// Scanning stops at `--`. When the flags repeat, the last one wins.
    /// A trailing `--config` without a value is left for the argument
    /// parser to report.
    pub fn scan<S: AsRef<str>>(args: &[S]) -> Self {
        let mut source = ConfigSource::Discover;
        let mut tokens = args.iter().map(AsRef::as_ref);

        while let Some(token) = tokens.next() {
            match token {
                "--" => break,
                "--no-config" => source = ConfigSource::Disabled,
                "--config" => {
                    if let Some(path) = tokens.next() {
                        source = ConfigSource::Explicit(PathBuf::from(path));
                    }
                }
                _ => {
                    if let Some(path) = token.strip_prefix("--config=") {
                        source = ConfigSource::Explicit(PathBuf::from(path));
                    }
                }
            }
        }

        source
    }
}

/// Options loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Global config (~/.trial/config.toml) - overrides defaults
/// 3. Project config (./trial.toml) - overrides global
/// 4. Environment variables (TRIAL_*) - overrides project
/// 5. CLI flags - highest priority (handled by the argument parser)
#[derive(Debug, Clone)]
pub struct OptionsLoader {
    /// Directory project discovery starts from
    root: PathBuf,
    /// Global config location, `None` to skip the user file
    global_config_path: Option<PathBuf>,
}

impl OptionsLoader {
    /// Create a loader rooted at the given working directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            global_config_path: GlobalConfig::global_config_path().ok(),
        }
    }

    /// Override the global config location (`None` disables it)
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config_path = path;
        self
    }

    /// Directory project discovery starts from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Produce the normalized options for one invocation
    ///
    /// The argument tokens are carried through untouched; flags given there
    /// are applied later by the parser, on top of the merged configuration.
    pub fn load<S: AsRef<str>>(&self, args: &[S]) -> ConfigResult<NormalizedOptions> {
        let source = ConfigSource::scan(args);
        let mut config = RunnerConfig::defaults();
        let mut config_file = None;

        if source != ConfigSource::Disabled {
            config = config.merge(self.load_global_config()?);

            let project = match source {
                ConfigSource::Explicit(path) => {
                    let path = self.root.join(path);
                    let project = RunnerConfig::load_from_file(&path)?;
                    Some((path, project))
                }
                _ => self.find_project_config()?,
            };

            if let Some((path, project)) = project {
                config = config.merge(project);
                config_file = Some(path);
            }
        }

        let config = self.apply_env_overrides(config)?;
        config.validate()?;

        let args = args.iter().map(|a| a.as_ref().to_string()).collect();
        Ok(config.into_options(args, config_file))
    }

    /// Find project configuration by walking up the directory tree
    ///
    /// Returns the path and contents of the nearest trial.toml, if any
    fn find_project_config(&self) -> ConfigResult<Option<(PathBuf, RunnerConfig)>> {
        let mut current = self.root.clone();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project_config = RunnerConfig::load_from_file(&config_path)?;
                return Ok(Some((config_path, project_config)));
            }

            // Try parent directory
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok(None),
            }
        }
    }

    /// Load runner defaults from the global config, if present
    fn load_global_config(&self) -> ConfigResult<RunnerConfig> {
        let Some(path) = self.global_config_path.as_ref() else {
            return Ok(RunnerConfig::default());
        };

        // Global config is optional - if it doesn't exist, contribute nothing
        if !path.exists() {
            return Ok(RunnerConfig::default());
        }

        Ok(GlobalConfig::load_from_file(path)?.runner_defaults())
    }

    /// Apply environment variable overrides
    ///
    /// Environment variables follow the pattern: TRIAL_<KEY>
    /// Example: TRIAL_REPORTER=dot, TRIAL_SPEC=test/unit,test/e2e
    fn apply_env_overrides(&self, mut config: RunnerConfig) -> ConfigResult<RunnerConfig> {
        if let Some(spec) = env_list("TRIAL_SPEC") {
            config.spec = Some(spec);
        }
        if let Some(extension) = env_list("TRIAL_EXTENSION") {
            config.extension = Some(extension);
        }
        if let Some(ignore) = env_list("TRIAL_IGNORE") {
            config.ignore = Some(ignore);
        }
        if let Some(require) = env_list("TRIAL_REQUIRE") {
            config.require = Some(require);
        }

        if let Some(recursive) = env_bool("TRIAL_RECURSIVE")? {
            config.recursive = Some(recursive);
        }
        if let Some(sort) = env_bool("TRIAL_SORT")? {
            config.sort = Some(sort);
        }
        if let Some(bail) = env_bool("TRIAL_BAIL")? {
            config.bail = Some(bail);
        }

        if let Ok(reporter) = env::var("TRIAL_REPORTER") {
            config.reporter = Some(reporter);
        }
        if let Ok(timeout) = env::var("TRIAL_TIMEOUT") {
            config.timeout = Some(TimeValue::Text(timeout));
        }
        if let Ok(slow) = env::var("TRIAL_SLOW") {
            config.slow = Some(TimeValue::Text(slow));
        }
        if let Ok(grep) = env::var("TRIAL_GREP") {
            config.grep = Some(grep);
        }

        if let Ok(jobs) = env::var("TRIAL_JOBS") {
            let jobs = jobs
                .trim()
                .parse::<u32>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "TRIAL_JOBS".to_string(),
                    reason: e.to_string(),
                })?;
            config.jobs = Some(jobs);
        }

        Ok(config)
    }
}

/// Comma-separated list, empty entries dropped
fn env_list(key: &str) -> Option<Vec<String>> {
    let value = env::var(key).ok()?;
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn env_bool(key: &str) -> ConfigResult<Option<bool>> {
    let Ok(value) = env::var(key) else {
        return Ok(None);
    };

    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            field: key.to_string(),
            reason: format!("'{value}' is not a boolean (expected true/false, 1/0 or yes/no)"),
        }),
    }
}
