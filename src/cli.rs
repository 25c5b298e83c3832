// File: ./src/cli.rs
//! Command-line parsing and help text for the `duebump` binary.

use crate::model::{DATE_FORMAT, ShiftPolicy};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;
use strum::IntoEnumIterator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Shift(ShiftPolicy),
    Extract(String),
    /// Write a default config file.
    Init,
    Policies,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub root: Option<PathBuf>,
    pub vault: Option<PathBuf>,
    pub today: Option<NaiveDate>,
    pub dry_run: bool,
    pub json: bool,
    pub verbose: bool,
    pub legacy_widths: bool,
    pub force: bool,
}

impl CliArgs {
    /// Parses the arguments after the binary name.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let mut command = None;
        let mut parsed = CliArgs {
            command: Command::Help,
            root: None,
            vault: None,
            today: None,
            dry_run: false,
            json: false,
            verbose: false,
            legacy_widths: false,
            force: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" | "help" => return Ok(parsed),
                "-r" | "--root" => {
                    let v = args.next().ok_or_else(|| anyhow!("--root needs a path"))?;
                    parsed.root = Some(PathBuf::from(v));
                }
                "--vault" => {
                    let v = args.next().ok_or_else(|| anyhow!("--vault needs a path"))?;
                    parsed.vault = Some(PathBuf::from(v));
                }
                "--today" => {
                    let v = args
                        .next()
                        .ok_or_else(|| anyhow!("--today needs a YYYY-MM-DD date"))?;
                    let d = NaiveDate::parse_from_str(&v, DATE_FORMAT)
                        .with_context(|| format!("Invalid --today date '{}'", v))?;
                    parsed.today = Some(d);
                }
                "-n" | "--dry-run" => parsed.dry_run = true,
                "--json" => parsed.json = true,
                "-v" | "--verbose" => parsed.verbose = true,
                "--legacy-widths" => parsed.legacy_widths = true,
                "-f" | "--force" => parsed.force = true,
                "init" if command.is_none() => command = Some(Command::Init),
                "policies" if command.is_none() => command = Some(Command::Policies),
                "extract" if command.is_none() => {
                    let file = args
                        .next()
                        .ok_or_else(|| anyhow!("extract needs a markdown file"))?;
                    command = Some(Command::Extract(file));
                }
                other if command.is_none() && !other.starts_with('-') => {
                    let policy = ShiftPolicy::from_str(other).map_err(|_| {
                        anyhow!("Unknown command '{}'. Run 'duebump --help'.", other)
                    })?;
                    command = Some(Command::Shift(policy));
                }
                other => return Err(anyhow!("Unexpected argument '{}'", other)),
            }
        }

        parsed.command = command.unwrap_or(Command::Help);
        Ok(parsed)
    }
}

pub fn print_policies() {
    for policy in ShiftPolicy::iter() {
        println!("    {:<30}{}", policy.to_string(), policy.describe());
    }
}

pub fn print_help(binary_name: &str) {
    println!(
        "Duebump v{} - Batch due-date shifter for markdown tasks",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS] <policy>", binary_name);
    println!("    {} [OPTIONS] extract <file.md>", binary_name);
    println!("    {} [OPTIONS] init", binary_name);
    println!("    {} policies", binary_name);
    println!("    {} --help", binary_name);
    println!();
    println!("POLICIES:");
    print_policies();
    println!();
    println!("OPTIONS:");
    println!("    --vault <dir>         Markdown folder to scan (default: config or current dir).");
    println!("    --today <date>        Use this date (YYYY-MM-DD) as today for the whole run.");
    println!("    -n, --dry-run         Report what would change without writing files.");
    println!("    --json                Print the run summary as JSON.");
    println!("    --legacy-widths       Recognise 📅 dates with the historical spacing rules.");
    println!("    -r, --root <path>     Use a different directory for the config file.");
    println!("    -f, --force           Let init replace an existing config file.");
    println!("    -v, --verbose         Log every file and replacement.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("TASK SYNTAX:");
    println!("    - [ ] Buy milk 📅 2023-08-09     Unchecked task with a due date");
    println!("    - [ ] Call plumber               Unchecked task without a due date");
    println!();
    println!("EXAMPLES:");
    println!("    {} advance-overdue-to-tomorrow --vault ~/notes", binary_name);
    println!("    {} set-missing-to-today --dry-run", binary_name);
    println!("    {} extract Daily/2025-03-10.md", binary_name);
}
