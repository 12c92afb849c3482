//! Command-line entry point for the `trial` test runner.
//!
//! The [`Dispatcher`] turns an argument vector into one resolved invocation
//! of a [`Command`] and reports the whole operation as a single
//! `Result<Outcome, DispatchError>`.
//!
//! ```no_run
//! use trial_cli::Dispatcher;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let dispatcher = Dispatcher::new()?;
//! let outcome = dispatcher.dispatch(["init", "./test"]).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod commands;
pub mod console;
pub mod discovery;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod parser;

mod completion;

pub use command::{Command, CommandContext, FlagBuilder, ParsedArguments};
pub use console::{Captured, Console};
pub use dispatch::{Dispatcher, Outcome};
pub use env::RuntimeEnv;
pub use error::DispatchError;
