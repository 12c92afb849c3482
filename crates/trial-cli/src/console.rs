//! Output and error channels.

use colored::*;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

type Channel = Arc<Mutex<dyn Write + Send>>;

/// The two output channels a dispatch writes to
///
/// Help, usage, version and command output go to `out`; formatted error
/// lines go to `err`. Clones share the same underlying writers.
#[derive(Clone)]
pub struct Console {
    out: Channel,
    err: Channel,
}

impl Console {
    /// Console bound to the process's stdout and stderr
    pub fn stdio() -> Self {
        Self {
            out: Arc::new(Mutex::new(io::stdout())),
            err: Arc::new(Mutex::new(io::stderr())),
        }
    }

    /// Console that records everything written to it
    pub fn captured() -> (Self, Captured) {
        let out = Arc::new(Mutex::new(Vec::new()));
        let err = Arc::new(Mutex::new(Vec::new()));
        let console = Self {
            out: out.clone(),
            err: err.clone(),
        };
        (console, Captured { out, err })
    }

    /// Write text to the output channel as-is
    pub fn write_out(&self, text: &str) {
        if !text.is_empty() {
            write_to(&self.out, format_args!("{text}"));
        }
    }

    /// Write one line to the output channel
    pub fn println(&self, line: impl Display) {
        write_to(&self.out, format_args!("{line}\n"));
    }

    /// Write one line to the error channel
    pub fn eprintln(&self, line: impl Display) {
        write_to(&self.err, format_args!("{line}\n"));
    }

    /// Write the single formatted failure line: `✖ ERROR: <message>`
    pub fn error_line(&self, message: impl Display) {
        self.eprintln(format_args!(
            "{} {} {}",
            cross().red(),
            "ERROR:".red().bold(),
            message
        ));
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdio()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

fn write_to(channel: &Channel, args: std::fmt::Arguments<'_>) {
    let mut writer = channel.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = writer.write_fmt(args).and_then(|()| writer.flush()) {
        tracing::warn!("failed to write console output: {e}");
    }
}

/// Buffers behind a captured [`Console`]
#[derive(Clone)]
pub struct Captured {
    out: Arc<Mutex<Vec<u8>>>,
    err: Arc<Mutex<Vec<u8>>>,
}

impl Captured {
    /// Everything written to the output channel so far
    pub fn stdout(&self) -> String {
        read(&self.out)
    }

    /// Everything written to the error channel so far
    pub fn stderr(&self) -> String {
        read(&self.err)
    }
}

fn read(buffer: &Mutex<Vec<u8>>) -> String {
    let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Red cross for failure lines
fn cross() -> &'static str {
    "\u{2716}"
}

/// Green checkmark for success messages
pub(crate) fn green_check() -> ColoredString {
    "\u{2713}".green()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_channels_are_separate() {
        let (console, captured) = Console::captured();
        console.println("hello");
        console.eprintln("oops");

        assert_eq!(captured.stdout(), "hello\n");
        assert_eq!(captured.stderr(), "oops\n");
    }

    #[test]
    fn test_error_line_shape() {
        let (console, captured) = Console::captured();
        console.error_line("unknown command 'frobnicate'");

        let err = captured.stderr();
        assert!(err.contains('\u{2716}'));
        assert!(err.contains("ERROR:"));
        assert!(err.trim_end().ends_with("unknown command 'frobnicate'"));
        assert_eq!(err.lines().count(), 1);
        assert!(captured.stdout().is_empty());
    }

    #[test]
    fn test_write_out_skips_empty_text() {
        let (console, captured) = Console::captured();
        console.write_out("");
        console.write_out("Usage: trial");

        assert_eq!(captured.stdout(), "Usage: trial");
    }

    #[test]
    fn test_clones_share_buffers() {
        let (console, captured) = Console::captured();
        let copy = console.clone();
        console.println("a");
        copy.println("b");

        assert_eq!(captured.stdout(), "a\nb\n");
    }
}
