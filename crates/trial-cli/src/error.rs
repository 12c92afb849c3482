//! Dispatch errors.

use clap::error::ErrorKind;
use thiserror::Error;
use trial_config::ConfigError;

/// Every way a dispatch can fail
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Malformed syntax, unknown flag or unknown command
    #[error("{message}")]
    Parse {
        message: String,
        #[source]
        source: clap::Error,
    },

    /// A required value is missing or a value was rejected
    #[error("{message}")]
    Validation {
        message: String,
        #[source]
        source: clap::Error,
    },

    /// The options loader could not produce a configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The selected command failed; carries the command's own error unchanged
    #[error("{0}")]
    Command(anyhow::Error),

    /// No path settled the invocation
    #[error("dispatch finished without an outcome")]
    Unsettled,
}

impl DispatchError {
    /// Classify a parser failure
    pub fn from_clap(err: clap::Error) -> Self {
        let message = summarize(&err);
        match err.kind() {
            ErrorKind::MissingRequiredArgument
            | ErrorKind::MissingSubcommand
            | ErrorKind::InvalidValue
            | ErrorKind::ValueValidation
            | ErrorKind::TooFewValues
            | ErrorKind::TooManyValues
            | ErrorKind::WrongNumberOfValues
            | ErrorKind::ArgumentConflict => DispatchError::Validation {
                message,
                source: err,
            },
            _ => DispatchError::Parse {
                message,
                source: err,
            },
        }
    }

    /// Whether the failure came from the command line rather than a command
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            DispatchError::Parse { .. } | DispatchError::Validation { .. }
        )
    }

    /// The command's error, if a command failed
    pub fn command_error(&self) -> Option<&anyhow::Error> {
        match self {
            DispatchError::Command(err) => Some(err),
            _ => None,
        }
    }

    /// Take the command's error out, if a command failed
    pub fn into_command_error(self) -> Option<anyhow::Error> {
        match self {
            DispatchError::Command(err) => Some(err),
            _ => None,
        }
    }
}

/// One-line message out of a rendered clap error
///
/// Drops the `error:` prefix, the tips and the usage block that clap appends.
fn summarize(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let head = rendered.split("\n\n").next().unwrap_or_default();

    let message = head
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    message
        .strip_prefix("error: ")
        .unwrap_or(&message)
        .to_string()
}
