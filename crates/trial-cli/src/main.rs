use colored::*;
use std::ffi::OsString;
use std::process::ExitCode;
use trial_cli::{Console, DispatchError, Dispatcher};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "TRIAL_LOG";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let dispatcher = match Dispatcher::new() {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("{} cannot determine working directory: {e}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let argv = match utf8_args(std::env::args_os().skip(1)) {
        Ok(argv) => argv,
        Err(message) => {
            Console::stdio().error_line(message);
            return ExitCode::from(2);
        }
    };

    match dispatcher.dispatch(argv).await {
        Ok(_) => ExitCode::SUCCESS,
        // Help and the error line were already printed
        Err(err) if err.is_usage() => ExitCode::from(2),
        Err(DispatchError::Command(err)) => {
            eprintln!(
                "{} {}",
                "\u{2716}".red(),
                dispatcher.env().describe_failure(&err)
            );
            ExitCode::FAILURE
        }
        Err(_) => ExitCode::FAILURE,
    }
}

/// Argument tokens as UTF-8, or a message naming the first one that is not
fn utf8_args(args: impl Iterator<Item = OsString>) -> Result<Vec<String>, String> {
    args.map(|arg| {
        arg.into_string()
            .map_err(|raw| format!("invalid UTF-8 in argument '{}'", raw.to_string_lossy()))
    })
    .collect()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
