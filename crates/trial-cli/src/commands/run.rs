//! Run command - resolve the test plan for a project (trial run)

use crate::command::{Command, CommandContext, FlagBuilder, ParsedArguments};
use crate::discovery::Discovery;
use crate::env::RuntimeEnv;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgAction};
use colored::*;
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;
use trial_config::parse_millis;

/// Reporters that ship with the runner
pub const BUILTIN_REPORTERS: &[&str] = &["spec", "dot", "json", "tap"];

const DEFAULT_SPEC: &str = "test";
const DEFAULT_EXTENSION: &str = "spec";
const DEFAULT_TIMEOUT_MS: u64 = 2000;
const DEFAULT_SLOW_MS: u64 = 75;

/// The default command
#[derive(Debug, Default, Clone, Copy)]
pub struct RunCommand;

/// Everything `run` resolved from its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub spec: Vec<String>,
    pub extension: Vec<String>,
    pub ignore: Vec<PathBuf>,
    pub recursive: bool,
    pub sort: bool,
    pub reporter: String,
    pub timeout: u64,
    pub slow: u64,
    pub bail: bool,
    pub grep: Option<String>,
    pub jobs: u32,
    pub require: Vec<String>,
}

impl RunPlan {
    pub fn from_args(args: &ParsedArguments) -> Self {
        let spec = args.many::<String>("spec");
        let extension = args.many::<String>("extension");

        Self {
            spec: non_empty_or(spec, DEFAULT_SPEC),
            extension: non_empty_or(extension, DEFAULT_EXTENSION),
            ignore: args.many::<PathBuf>("ignore"),
            recursive: args.flag("recursive"),
            sort: args.flag("sort"),
            reporter: args
                .one::<String>("reporter")
                .unwrap_or_else(|| BUILTIN_REPORTERS[0].to_string()),
            timeout: args.one::<u64>("timeout").unwrap_or(DEFAULT_TIMEOUT_MS),
            slow: args.one::<u64>("slow").unwrap_or(DEFAULT_SLOW_MS),
            bail: args.flag("bail"),
            grep: args.one::<String>("grep"),
            jobs: args.one::<u32>("jobs").unwrap_or(1),
            require: args.many::<String>("require"),
        }
    }
}

fn non_empty_or(values: Vec<String>, fallback: &str) -> Vec<String> {
    if values.is_empty() {
        vec![fallback.to_string()]
    } else {
        values
    }
}

#[async_trait]
impl Command for RunCommand {
    fn name(&self) -> &'static str {
        "run"
    }

    fn about(&self) -> &'static str {
        "Run the test files of the project (default)"
    }

    fn is_default(&self) -> bool {
        true
    }

    fn configure<'a>(&self, flags: FlagBuilder<'a>) -> FlagBuilder<'a> {
        flags
            .arg(
                Arg::new("spec")
                    .value_name("SPEC")
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .help("Files or directories to test"),
            )
            .arg(
                Arg::new("extension")
                    .long("extension")
                    .value_name("EXT")
                    .action(ArgAction::Append)
                    .help("File extension of test files"),
            )
            .arg(
                Arg::new("ignore")
                    .long("ignore")
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .action(ArgAction::Append)
                    .help("Leave out a file or directory"),
            )
            .arg(
                Arg::new("recursive")
                    .long("recursive")
                    .action(ArgAction::SetTrue)
                    .help("Look for tests in subdirectories"),
            )
            .arg(
                Arg::new("sort")
                    .long("sort")
                    .action(ArgAction::SetTrue)
                    .help("Sort test files"),
            )
            .arg(
                Arg::new("reporter")
                    .short('R')
                    .long("reporter")
                    .value_name("NAME")
                    .help("Reporter: spec, dot, json, tap or a reporter file"),
            )
            .arg(
                Arg::new("timeout")
                    .short('t')
                    .long("timeout")
                    .value_name("MS")
                    .value_parser(parse_millis)
                    .help("Per-test timeout (e.g. 2000, 2000ms, 2s)"),
            )
            .arg(
                Arg::new("slow")
                    .short('s')
                    .long("slow")
                    .value_name("MS")
                    .value_parser(parse_millis)
                    .help("Threshold above which a test counts as slow"),
            )
            .arg(
                Arg::new("bail")
                    .short('b')
                    .long("bail")
                    .action(ArgAction::SetTrue)
                    .help("Stop after the first failure"),
            )
            .arg(
                Arg::new("grep")
                    .short('g')
                    .long("grep")
                    .value_name("PATTERN")
                    .help("Only run tests matching the pattern"),
            )
            .arg(
                Arg::new("jobs")
                    .short('j')
                    .long("jobs")
                    .value_name("N")
                    .value_parser(value_parser!(u32).range(1..))
                    .help("Number of parallel workers"),
            )
            .arg(
                Arg::new("require")
                    .short('r')
                    .long("require")
                    .value_name("FILE")
                    .action(ArgAction::Append)
                    .help("Load a setup file before the tests"),
            )
    }

    async fn execute(&self, args: ParsedArguments, cx: CommandContext) -> Result<serde_json::Value> {
        let plan = RunPlan::from_args(&args);

        let required = plan
            .require
            .iter()
            .map(|name| {
                cx.env
                    .find_extension(name)
                    .ok_or_else(|| anyhow!("Cannot find module '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?;
        let reporter = resolve_reporter(&cx.env, &plan.reporter)?;

        let discovery = Discovery::new(&plan.extension)
            .recursive(plan.recursive)
            .ignore(plan.ignore.clone())
            .sorted(plan.sort);
        let root = cx.env.root().to_path_buf();
        let specs = plan.spec.clone();
        let found = tokio::task::spawn_blocking(move || discovery.collect(&root, &specs))
            .await
            .context("Spec discovery did not complete")?;

        for spec in &found.unmatched {
            warn!(spec = %spec, "no test files match");
            cx.console.eprintln(format!(
                "{} Cannot find any files matching '{spec}'",
                "Warning:".yellow()
            ));
        }

        if found.is_empty() {
            bail!("No test files found: {}", plan.spec.join(", "));
        }

        let files: Vec<String> = found
            .files
            .iter()
            .map(|file| {
                file.strip_prefix(cx.env.root())
                    .unwrap_or(file)
                    .display()
                    .to_string()
            })
            .collect();

        cx.console.println(format!(
            "{} {} test file{}",
            "Found".bold(),
            files.len(),
            if files.len() == 1 { "" } else { "s" }
        ));
        for file in &files {
            cx.console.println(format!("  {file}"));
        }
        cx.console.println(format!(
            "Reporter: {} | timeout {}ms | slow {}ms | jobs {}{}",
            plan.reporter,
            plan.timeout,
            plan.slow,
            plan.jobs,
            if plan.bail { " | bail" } else { "" }
        ));

        Ok(json!({
            "files": files,
            "reporter": plan.reporter,
            "reporter_path": reporter.map(|p| p.display().to_string()),
            "timeout": plan.timeout,
            "slow": plan.slow,
            "bail": plan.bail,
            "grep": plan.grep,
            "jobs": plan.jobs,
            "require": required
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>(),
        }))
    }
}

/// Built-in reporters resolve to `None`; anything else must be a file on the search path
fn resolve_reporter(env: &RuntimeEnv, name: &str) -> Result<Option<PathBuf>> {
    if BUILTIN_REPORTERS.contains(&name) {
        return Ok(None);
    }
    env.find_extension(name)
        .map(Some)
        .ok_or_else(|| anyhow!("Invalid reporter '{name}'"))
}
