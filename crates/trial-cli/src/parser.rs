//! Argument parser configuration.
//!
//! Help layout, wrap width, epilog and the fixed parsing behaviour every
//! `trial` command shares.

use clap::{Arg, ArgAction, ColorChoice};

/// Name shown in generated help and version output
pub const DISPLAY_NAME: &str = "trial";

/// Version printed by `--version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Help text never wraps wider than this
pub const MAX_WRAP_WIDTH: usize = 80;

/// Heading for positional arguments in help output
pub const POSITIONALS_HEADING: &str = "Positional Arguments";

/// Heading for flags and options in help output
pub const OPTIONS_HEADING: &str = "Runner Options";

const ABOUT: &str = "Run tests with trial";

/// Appended to every help screen
pub const EPILOG: &str = "\
CONFIGURATION:
    trial.toml              Project settings (nearest one upwards from the working directory)
    ~/.trial/config.toml    User defaults, under a [defaults] table
    --config <PATH>         Use another project file; --no-config skips both files

ENVIRONMENT VARIABLES:
    TRIAL_REPORTER, TRIAL_TIMEOUT, TRIAL_SPEC, ...   Override configuration files
    TRIAL_LOG                                        Log filter (e.g. 'debug')
    NO_COLOR                                         Disable colored output

Run 'trial <command> --help' for the options of a single command.";

/// Behaviour switches of the parsing algorithm
///
/// Fixed for every invocation; not exposed to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserSettings {
    /// A repeated flag replaces its earlier value instead of erroring
    pub args_override_self: bool,
    /// Accept unambiguous prefixes of long flags
    pub infer_long_args: bool,
    /// Accept unambiguous prefixes of subcommand names
    pub infer_subcommands: bool,
    /// Treat `-1` style tokens as values rather than flags
    pub allow_negative_numbers: bool,
}

/// The settings `trial` parses with
pub const PARSER_SETTINGS: ParserSettings = ParserSettings {
    args_override_self: true,
    infer_long_args: false,
    infer_subcommands: false,
    allow_negative_numbers: false,
};

impl ParserSettings {
    /// Apply the settings to a command
    pub fn apply(&self, cmd: clap::Command) -> clap::Command {
        cmd.args_override_self(self.args_override_self)
            .infer_long_args(self.infer_long_args)
            .infer_subcommands(self.infer_subcommands)
            .allow_negative_numbers(self.allow_negative_numbers)
    }
}

/// Root command: display name, version, epilog, global flags and settings
pub fn root_command() -> clap::Command {
    let cmd = clap::Command::new(DISPLAY_NAME)
        .version(VERSION)
        .about(ABOUT)
        .after_help(EPILOG)
        .propagate_version(true)
        .disable_help_subcommand(true)
        // Plain text keeps captured help deterministic; status lines use `colored`
        .color(ColorChoice::Never)
        .term_width(wrap_width())
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Path to a trial.toml to use instead of discovery"),
        )
        .arg(
            Arg::new("no-config")
                .long("no-config")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Ignore configuration files"),
        );

    PARSER_SETTINGS.apply(cmd)
}

/// Subcommand shell for a command descriptor
pub fn subcommand(name: &'static str, about: &'static str) -> clap::Command {
    PARSER_SETTINGS.apply(clap::Command::new(name).about(about))
}

/// Apply the renamed section headings to a fully declared command
pub fn with_help_layout(cmd: clap::Command) -> clap::Command {
    let has_positionals = cmd.get_positionals().next().is_some();
    let has_subcommands = cmd.has_subcommands();
    cmd.help_template(help_template(has_positionals, has_subcommands))
}

fn help_template(has_positionals: bool, has_subcommands: bool) -> String {
    let mut template = String::from("{before-help}{about-with-newline}\n{usage-heading} {usage}\n");

    if has_subcommands {
        template.push_str("\nCommands:\n{subcommands}\n");
    }
    if has_positionals {
        template.push_str(&format!("\n{POSITIONALS_HEADING}:\n{{positionals}}\n"));
    }
    template.push_str(&format!("\n{OPTIONS_HEADING}:\n{{options}}{{after-help}}"));

    template
}

/// Render help for the subcommand named in `argv`, or the root help
pub fn render_help_for(cmd: &mut clap::Command, argv: &[String]) -> String {
    if let Some(name) = subcommand_named(cmd, argv) {
        if let Some(sub) = cmd.find_subcommand_mut(&name) {
            return sub.render_help().to_string();
        }
    }

    cmd.render_help().to_string()
}

/// Only the first token that is neither a flag nor a flag's value can name a subcommand
fn subcommand_named(cmd: &clap::Command, argv: &[String]) -> Option<String> {
    let mut tokens = argv.iter();

    while let Some(token) = tokens.next() {
        if token == "--" {
            return None;
        }

        if let Some(long) = token.strip_prefix("--") {
            if !long.contains('=') && takes_value(cmd, |arg| arg.get_long() == Some(long)) {
                tokens.next();
            }
            continue;
        }

        if let Some(shorts) = token.strip_prefix('-').filter(|s| !s.is_empty()) {
            // A value-taking short flag swallows the rest of its cluster, or the next token
            for (i, short) in shorts.char_indices() {
                if takes_value(cmd, |arg| arg.get_short() == Some(short)) {
                    if i + short.len_utf8() == shorts.len() {
                        tokens.next();
                    }
                    break;
                }
            }
            continue;
        }

        return cmd
            .find_subcommand(token)
            .map(|sub| sub.get_name().to_string());
    }

    None
}

fn takes_value(cmd: &clap::Command, matches: impl Fn(&Arg) -> bool) -> bool {
    cmd.get_arguments()
        .find(|arg| matches(arg))
        .is_some_and(|arg| arg.get_action().takes_values())
}

/// Terminal width capped at [`MAX_WRAP_WIDTH`]
pub fn wrap_width() -> usize {
    clamp_width(crossterm::terminal::size().ok().map(|(columns, _)| columns))
}

/// Width to wrap at given the detected terminal columns
pub fn clamp_width(columns: Option<u16>) -> usize {
    match columns {
        Some(columns) if columns > 0 => usize::from(columns).min(MAX_WRAP_WIDTH),
        _ => MAX_WRAP_WIDTH,
    }
}
