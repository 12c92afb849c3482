//! Normalized options handed to the argument parser.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A single configured value, shaped the way the parser consumes defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Boolean switch
    Flag(bool),
    /// Single textual value
    Text(String),
    /// Repeatable value
    List(Vec<String>),
}

impl OptionValue {
    /// Render as the raw strings a parser default is made of
    pub fn to_raw(&self) -> Vec<String> {
        match self {
            OptionValue::Flag(flag) => vec![flag.to_string()],
            OptionValue::Text(text) => vec![text.clone()],
            OptionValue::List(items) => items.clone(),
        }
    }
}

/// Merged configuration for one invocation
///
/// Maps option names to their configured values and carries the argument
/// tokens that still need to be parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedOptions {
    values: BTreeMap<String, OptionValue>,
    args: Vec<String>,
    config_file: Option<PathBuf>,
}

impl NormalizedOptions {
    /// Create an empty option set around the given argument tokens
    pub fn new(args: Vec<String>, config_file: Option<PathBuf>) -> Self {
        Self {
            values: BTreeMap::new(),
            args,
            config_file,
        }
    }

    /// Set (or replace) the value for an option
    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }

    /// Look up an option by name
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Iterate over all configured options in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Tokens left for the argument parser
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Project config file that contributed values, if any
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }
}
