//! The dispatcher: one argument vector in, one outcome out.
//!
//! Each call to [`Dispatcher::dispatch`] builds its own parser and its own
//! completion signal. Commands are registered through [`Settling`], which
//! turns a command's result into the settlement of that signal; parser
//! failures go through [`Dispatcher::fail`]. Whichever settles first is the
//! outcome, and nothing settles twice.

use crate::command::{Command, CommandContext, FlagBuilder, ParsedArguments};
use crate::commands;
use crate::completion::{self, Settler};
use crate::console::Console;
use crate::env::RuntimeEnv;
use crate::error::DispatchError;
use crate::parser::{self, DISPLAY_NAME};
use clap::error::ErrorKind;
use clap::ArgMatches;
use futures::FutureExt;
use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use trial_config::{NormalizedOptions, OptionsLoader};

/// Successful result of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A command ran and resolved with `value`
    Completed {
        command: &'static str,
        value: serde_json::Value,
    },
    /// `--help` printed usage; no command ran
    Help,
    /// `--version` printed the version; no command ran
    Version,
}

type Signal = Result<Outcome, DispatchError>;

/// Turns argument vectors into command invocations
pub struct Dispatcher {
    commands: Vec<Arc<dyn Command>>,
    loader: OptionsLoader,
    env: Arc<RuntimeEnv>,
    console: Console,
}

impl Dispatcher {
    /// Dispatcher for the working directory with the built-in commands
    pub fn new() -> io::Result<Self> {
        Ok(Self::in_dir(std::env::current_dir()?))
    }

    /// Dispatcher rooted at `root` with the built-in commands
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            commands: commands::builtin(),
            loader: OptionsLoader::new(&root),
            env: Arc::new(RuntimeEnv::from_dir(root)),
            console: Console::stdio(),
        }
    }

    /// Replace the command set
    ///
    /// The first command reporting [`Command::is_default`] runs when no
    /// subcommand is named; without one a subcommand is required.
    pub fn with_commands(mut self, commands: Vec<Arc<dyn Command>>) -> Self {
        self.commands = commands;
        self
    }

    /// Write help, errors and command output to `console`
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Use a differently configured options loader
    pub fn with_loader(mut self, loader: OptionsLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Hand commands a different runtime environment
    pub fn with_env(mut self, env: RuntimeEnv) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Runtime environment commands receive
    pub fn env(&self) -> &RuntimeEnv {
        &self.env
    }

    /// Parse `argv` (without the program name) and run the selected command
    ///
    /// Resolves with the command's value, or with [`Outcome::Help`] /
    /// [`Outcome::Version`] when a global flag short-circuits. Command-line
    /// problems print help plus one `ERROR:` line and reject with
    /// [`DispatchError::Parse`] or [`DispatchError::Validation`]; a failing
    /// command rejects with [`DispatchError::Command`] carrying its error.
    pub async fn dispatch<I, T>(&self, argv: I) -> Result<Outcome, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        debug!(?argv, "dispatching");

        let options = match self.loader.load(&argv) {
            Ok(options) => options,
            Err(err) => {
                self.console.error_line(&err);
                return Err(err.into());
            }
        };

        let (settler, completion) = completion::channel();

        // The parser is dropped before anything is awaited
        if let Some((handler, args)) = self.parse(&options, &settler) {
            debug!(command = args.command(), "executing");
            handler.execute(args, self.context()).await;
            debug_assert!(settler.is_settled(), "a finished command settles the signal");
        }
        drop(settler);

        completion
            .wait()
            .await
            .unwrap_or(Err(DispatchError::Unsettled))
    }

    /// Build the parser, parse, and either settle or pick the command to run
    fn parse(
        &self,
        options: &NormalizedOptions,
        settler: &Settler<Signal>,
    ) -> Option<(Settling, ParsedArguments)> {
        let Invocation {
            mut parser,
            mut handlers,
        } = self.build_parser(options, settler);

        let report = parse_args(&mut parser, options.args());
        self.emit(&report.output);

        match report.result {
            Ok(Parsed::Displayed(outcome)) => {
                debug!(?outcome, "short-circuited by global flag");
                settler.settle(Ok(outcome));
                None
            }
            Ok(Parsed::Matches(matches)) => select(&mut handlers, matches),
            Err(err) => {
                self.fail(err, &mut parser, options.args(), settler);
                None
            }
        }
    }

    /// Configure a fresh parser and wrap every command in the settlement adapter
    fn build_parser(&self, options: &NormalizedOptions, settler: &Settler<Signal>) -> Invocation {
        let mut root = parser::root_command();
        let mut handlers = Vec::with_capacity(self.commands.len());
        let mut has_default = false;

        for command in &self.commands {
            let sub = parser::subcommand(command.name(), command.about());
            let sub = command.configure(FlagBuilder::new(sub, options)).into_command();
            root = root.subcommand(parser::with_help_layout(sub));

            // The default command's flags also live on the root
            if command.is_default() && !has_default {
                has_default = true;
                root = command
                    .configure(FlagBuilder::new(root, options))
                    .into_command()
                    .args_conflicts_with_subcommands(true);
            }

            handlers.push(Settling {
                command: Arc::clone(command),
                settler: settler.clone(),
            });
        }

        if !has_default {
            root = root.subcommand_required(true);
        }

        let mut parser = parser::with_help_layout(root);
        parser.build();

        Invocation { parser, handlers }
    }

    /// Unified failure handler for everything the parser rejects
    ///
    /// Prints the relevant help, then one error line, then rejects.
    fn fail(
        &self,
        err: clap::Error,
        parser: &mut clap::Command,
        args: &[String],
        settler: &Settler<Signal>,
    ) {
        let help = parser::render_help_for(parser, args);
        self.emit(&help);

        let err = DispatchError::from_clap(err);
        self.console.error_line(&err);
        debug!(error = %err, "command line rejected");

        settler.settle(Err(err));
    }

    /// Write parser-generated text to the output channel, newline-terminated
    fn emit(&self, text: &str) {
        let text = text.trim_end();
        if !text.is_empty() {
            self.console.println(text);
        }
    }

    fn context(&self) -> CommandContext {
        CommandContext {
            env: Arc::clone(&self.env),
            console: self.console.clone(),
        }
    }
}

/// Parser and wrapped commands for one invocation
struct Invocation {
    parser: clap::Command,
    handlers: Vec<Settling>,
}

enum Parsed {
    Matches(ArgMatches),
    Displayed(Outcome),
}

/// What parsing produced, plus any text the parser generated on the way
struct ParseReport {
    result: Result<Parsed, clap::Error>,
    output: String,
}

fn parse_args(parser: &mut clap::Command, args: &[String]) -> ParseReport {
    let tokens = std::iter::once(DISPLAY_NAME.to_string()).chain(args.iter().cloned());

    match parser.try_get_matches_from_mut(tokens) {
        Ok(matches) => ParseReport {
            result: Ok(Parsed::Matches(matches)),
            output: String::new(),
        },
        Err(err) => {
            let displayed = match err.kind() {
                ErrorKind::DisplayHelp => Some(Outcome::Help),
                ErrorKind::DisplayVersion => Some(Outcome::Version),
                _ => None,
            };
            match displayed {
                Some(outcome) => ParseReport {
                    output: err.render().to_string(),
                    result: Ok(Parsed::Displayed(outcome)),
                },
                None => ParseReport {
                    result: Err(err),
                    output: String::new(),
                },
            }
        }
    }
}

/// Pick the handler for the matched subcommand, or the default command
fn select(handlers: &mut Vec<Settling>, mut matches: ArgMatches) -> Option<(Settling, ParsedArguments)> {
    let (index, matches) = match matches.remove_subcommand() {
        Some((name, sub)) => (
            handlers.iter().position(|h| h.command.name() == name)?,
            sub,
        ),
        None => (handlers.iter().position(|h| h.command.is_default())?, matches),
    };

    let handler = handlers.swap_remove(index);
    let args = ParsedArguments::new(handler.command.name(), matches);
    Some((handler, args))
}

/// Async-settlement adapter around one command
///
/// Runs the command and settles the invocation's signal with its value or
/// its error. Panics are caught and settle as command errors.
struct Settling {
    command: Arc<dyn Command>,
    settler: Settler<Signal>,
}

impl Settling {
    async fn execute(&self, args: ParsedArguments, cx: CommandContext) {
        let name = self.command.name();
        let run = AssertUnwindSafe(self.command.execute(args, cx))
            .catch_unwind()
            .await;

        let signal = match run {
            Ok(Ok(value)) => Ok(Outcome::Completed {
                command: name,
                value,
            }),
            Ok(Err(err)) => Err(DispatchError::Command(err)),
            Err(panic) => Err(DispatchError::Command(anyhow::anyhow!(
                "command '{name}' panicked: {}",
                panic_message(&*panic)
            ))),
        };

        if !self.settler.settle(signal) {
            debug!(command = name, "signal already settled; result dropped");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clap::Arg;
    use serde_json::json;

    struct Fixed(serde_json::Value);

    #[async_trait]
    impl Command for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn about(&self) -> &'static str {
            "Resolve with a fixed value"
        }
        fn configure<'a>(&self, flags: FlagBuilder<'a>) -> FlagBuilder<'a> {
            flags.arg(Arg::new("label").long("label"))
        }
        async fn execute(
            &self,
            _args: ParsedArguments,
            _cx: CommandContext,
        ) -> anyhow::Result<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    struct Panics;

    #[async_trait]
    impl Command for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }
        fn about(&self) -> &'static str {
            "Panic while executing"
        }
        fn configure<'a>(&self, flags: FlagBuilder<'a>) -> FlagBuilder<'a> {
            flags
        }
        async fn execute(
            &self,
            _args: ParsedArguments,
            _cx: CommandContext,
        ) -> anyhow::Result<serde_json::Value> {
            panic!("kaboom");
        }
    }

    fn context() -> CommandContext {
        let (console, _) = Console::captured();
        CommandContext {
            env: Arc::new(RuntimeEnv::from_dir("/tmp")),
            console,
        }
    }

    fn args(name: &'static str) -> ParsedArguments {
        ParsedArguments::new(name, clap::Command::new(name).get_matches_from([name]))
    }

    #[tokio::test]
    async fn test_adapter_resolves_with_value() {
        let (settler, completion) = completion::channel();
        let adapter = Settling {
            command: Arc::new(Fixed(json!({"ok": true}))),
            settler,
        };

        adapter.execute(args("fixed"), context()).await;

        let outcome = completion.wait().await.unwrap().unwrap();
        assert_eq!(
            outcome,
            Outcome::Completed {
                command: "fixed",
                value: json!({"ok": true})
            }
        );
    }

    #[tokio::test]
    async fn test_adapter_ignores_late_settlement() {
        let (settler, completion) = completion::channel();
        settler.settle(Ok(Outcome::Help));

        let adapter = Settling {
            command: Arc::new(Fixed(json!(1))),
            settler,
        };
        adapter.execute(args("fixed"), context()).await;

        assert_eq!(completion.wait().await.unwrap().unwrap(), Outcome::Help);
    }

    #[tokio::test]
    async fn test_adapter_catches_panics() {
        let (settler, completion) = completion::channel();
        let adapter = Settling {
            command: Arc::new(Panics),
            settler,
        };

        adapter.execute(args("panics"), context()).await;

        let err = completion.wait().await.unwrap().unwrap_err();
        assert!(matches!(err, DispatchError::Command(_)));
        assert!(err.to_string().contains("kaboom"));
    }

    #[test]
    fn test_select_by_subcommand_name() {
        let (settler, _completion) = completion::channel();
        let mut handlers = vec![
            Settling {
                command: Arc::new(Panics),
                settler: settler.clone(),
            },
            Settling {
                command: Arc::new(Fixed(json!(null))),
                settler,
            },
        ];

        let matches = clap::Command::new("t")
            .subcommand(clap::Command::new("fixed"))
            .get_matches_from(["t", "fixed"]);
        let (handler, args) = select(&mut handlers, matches).unwrap();
        assert_eq!(handler.command.name(), "fixed");
        assert_eq!(args.command(), "fixed");

        // Neither remaining handler is a default command
        let matches = clap::Command::new("t").get_matches_from(["t"]);
        assert!(select(&mut handlers, matches).is_none());
    }

    #[tokio::test]
    async fn test_build_parser_without_default_requires_subcommand() {
        let (console, captured) = Console::captured();
        let dispatcher = Dispatcher::in_dir("/tmp")
            .with_loader(OptionsLoader::new("/tmp").with_global_config(None))
            .with_commands(vec![Arc::new(Fixed(json!(1)))])
            .with_console(console);

        let err = dispatcher.dispatch(["--no-config"]).await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation { .. }));
        assert!(captured.stdout().contains("fixed"));
    }
}
