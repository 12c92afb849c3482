//! Built-in commands

pub mod init;
pub mod run;

use crate::command::Command;
use std::sync::Arc;

pub use init::InitCommand;
pub use run::RunCommand;

/// The commands a default [`Dispatcher`](crate::Dispatcher) registers
pub fn builtin() -> Vec<Arc<dyn Command>> {
    vec![Arc::new(RunCommand), Arc::new(InitCommand)]
}
