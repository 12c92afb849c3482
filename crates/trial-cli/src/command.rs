//! Command descriptors.
//!
//! A [`Command`] names a subcommand, declares its flags and executes it.
//! The dispatcher enumerates its commands, registers each one with the
//! parser and runs at most one per invocation.

use crate::console::Console;
use crate::env::RuntimeEnv;
use async_trait::async_trait;
use clap::parser::ValueSource;
use clap::{Arg, ArgMatches};
use std::any::Any;
use std::sync::Arc;
use trial_config::NormalizedOptions;

/// A subcommand the dispatcher can run
#[async_trait]
pub trait Command: Send + Sync {
    /// Subcommand name as typed on the command line
    fn name(&self) -> &'static str;

    /// One-line description shown in help
    fn about(&self) -> &'static str;

    /// Whether this command runs when no subcommand is named
    fn is_default(&self) -> bool {
        false
    }

    /// Declare the command's flags and positionals
    fn configure<'a>(&self, flags: FlagBuilder<'a>) -> FlagBuilder<'a>;

    /// Run the command; the returned value becomes the dispatch outcome
    async fn execute(
        &self,
        args: ParsedArguments,
        cx: CommandContext,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Collects flag declarations for one clap command
///
/// Every argument whose id matches a configured option receives the
/// configured value as its default, so values given on the command line win
/// over configuration files, which win over built-in defaults.
pub struct FlagBuilder<'a> {
    command: clap::Command,
    options: &'a NormalizedOptions,
}

impl<'a> FlagBuilder<'a> {
    pub(crate) fn new(command: clap::Command, options: &'a NormalizedOptions) -> Self {
        Self { command, options }
    }

    /// Declare an argument, seeding its default from the configuration
    pub fn arg(mut self, arg: Arg) -> Self {
        let arg = match self.options.get(arg.get_id().as_str()) {
            Some(value) => arg.default_values(value.to_raw()),
            None => arg,
        };
        self.command = self.command.arg(arg);
        self
    }

    pub(crate) fn into_command(self) -> clap::Command {
        self.command
    }
}

/// Arguments parsed for the selected command
#[derive(Debug, Clone)]
pub struct ParsedArguments {
    command: &'static str,
    matches: ArgMatches,
}

impl ParsedArguments {
    pub fn new(command: &'static str, matches: ArgMatches) -> Self {
        Self { command, matches }
    }

    /// Name of the command these arguments were parsed for
    pub fn command(&self) -> &'static str {
        self.command
    }

    /// Value of a switch; `false` when the flag is not declared
    pub fn flag(&self, id: &str) -> bool {
        self.matches
            .try_get_one::<bool>(id)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    }

    /// Single value of an argument
    pub fn one<T>(&self, id: &str) -> Option<T>
    where
        T: Any + Clone + Send + Sync + 'static,
    {
        self.matches.try_get_one::<T>(id).ok().flatten().cloned()
    }

    /// All values of a repeatable argument
    pub fn many<T>(&self, id: &str) -> Vec<T>
    where
        T: Any + Clone + Send + Sync + 'static,
    {
        self.matches
            .try_get_many::<T>(id)
            .ok()
            .flatten()
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the value came from the command line, configuration or a default
    pub fn source(&self, id: &str) -> Option<ValueSource> {
        // clap panics on ids it has never seen
        if !self.matches.ids().any(|known| known.as_str() == id) {
            return None;
        }
        self.matches.value_source(id)
    }
}

/// What a command gets to work with besides its arguments
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub env: Arc<RuntimeEnv>,
    pub console: Console,
}
