//! Project initialization command (trial init)

use crate::command::{Command, CommandContext, FlagBuilder, ParsedArguments};
use crate::console::green_check;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Arg, ArgAction};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use trial_config::CONFIG_FILE_NAME;

const EXAMPLE_SPEC: &str = "test/example.spec";

/// Scaffold a project directory for the runner
#[derive(Debug, Default, Clone, Copy)]
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    fn name(&self) -> &'static str {
        "init"
    }

    fn about(&self) -> &'static str {
        "Create a trial.toml and an example spec in <path>"
    }

    fn configure<'a>(&self, flags: FlagBuilder<'a>) -> FlagBuilder<'a> {
        flags
            .arg(
                Arg::new("path")
                    .required(true)
                    .help("Directory to initialize"),
            )
            .arg(
                Arg::new("force")
                    .long("force")
                    .action(ArgAction::SetTrue)
                    .help("Overwrite an existing trial.toml"),
            )
    }

    async fn execute(&self, args: ParsedArguments, cx: CommandContext) -> Result<serde_json::Value> {
        let Some(path) = args.one::<String>("path") else {
            bail!("Missing project path");
        };
        let target = cx.env.resolve_path(&path);

        let created = scaffold(&target, args.flag("force"))?;

        cx.console.println(format!(
            "{} Initialized trial project in {}",
            green_check(),
            target.display()
        ));
        for file in &created {
            cx.console.println(format!("  Created {}", file.display()));
        }

        Ok(json!({
            "path": path,
            "files": created
                .iter()
                .map(|file| file.display().to_string())
                .collect::<Vec<_>>(),
        }))
    }
}

/// Write the starter files below `target`, returning the files written
fn scaffold(target: &Path, force: bool) -> Result<Vec<PathBuf>> {
    let config_path = target.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        bail!(
            "Project already initialized: {} exists (use --force to overwrite)",
            config_path.display()
        );
    }

    fs::create_dir_all(target.join("test"))
        .with_context(|| format!("Failed to create {}", target.display()))?;

    let mut created = Vec::new();

    fs::write(&config_path, generate_config())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    created.push(config_path);

    // An existing example is user content; leave it alone even with --force
    let example_path = target.join(EXAMPLE_SPEC);
    if !example_path.exists() {
        fs::write(&example_path, generate_example_spec())
            .with_context(|| format!("Failed to write {}", example_path.display()))?;
        created.push(example_path);
    }

    Ok(created)
}

/// Starter trial.toml content
fn generate_config() -> String {
    r#"# trial configuration
# Values here are defaults; command-line flags override them.

spec = ["test"]
extension = ["spec"]
recursive = false
reporter = "spec"
timeout = 2000
slow = 75
bail = false
# grep = "pattern"
# jobs = 4
# require = ["setup.js"]
"#
    .to_string()
}

/// Example spec file content
fn generate_example_spec() -> String {
    r#"describe "example"
  it "passes"
    expect 1 + 1 == 2
"#
    .to_string()
}
