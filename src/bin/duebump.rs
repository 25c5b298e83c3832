use anyhow::{Context, Result};
use duebump::batch::{BatchContext, run_batch};
use duebump::cli::{CliArgs, Command, print_help, print_policies};
use duebump::config::{Config, RecognitionConfig};
use duebump::context::{AppContext, StandardContext};
use duebump::extract::run_extract;
use duebump::storage::{DocumentHandle, FsVault};
use duebump::system::{APP_NAME, notify_completion, wait_for_notification};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args = CliArgs::parse(env::args().skip(1))?;

    match args.command {
        Command::Help => {
            print_help("duebump");
            return Ok(());
        }
        Command::Policies => {
            print_policies();
            return Ok(());
        }
        _ => {}
    }

    let ctx = StandardContext::new(args.root.clone());
    // `init --force` must be able to replace a config that no longer parses.
    let config = if args.command == Command::Init {
        Config::load_or_default(&ctx).unwrap_or_default()
    } else {
        Config::load_or_default(&ctx)?
    };

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        config.log_filter()
    };
    // A logger may already be set when embedded; that is not fatal.
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    if args.command == Command::Init {
        let vault_root = match &args.vault {
            Some(p) => Some(std::path::absolute(p).context("Cannot resolve --vault")?),
            None => None,
        };
        let path = ctx.get_config_file_path()?;
        if Config::init(&ctx, vault_root, args.force)? {
            println!("Wrote {}", path.display());
        } else {
            println!("{} already exists (use --force to replace it)", path.display());
        }
        return Ok(());
    }

    let vault_root = match args.vault.clone().or_else(|| config.vault_root.clone()) {
        Some(p) => p,
        None => env::current_dir().context("Cannot determine the current directory")?,
    };
    let vault = FsVault::new(vault_root);

    match args.command {
        Command::Shift(policy) => {
            let recognition = if args.legacy_widths {
                RecognitionConfig::legacy()
            } else {
                config.recognition
            };
            let mut batch = args.today.map(BatchContext::at).unwrap_or_else(BatchContext::now);
            batch.dry_run = args.dry_run;

            let summary = run_batch(&vault, &vault, policy, &recognition, batch)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for failure in &summary.failures {
                    eprintln!("warning: {}", failure);
                }
                println!("{}", summary.message(policy));
            }
            if config.notify_on_completion && !args.dry_run {
                wait_for_notification(notify_completion(APP_NAME, &summary.message(policy)));
            }
        }
        Command::Extract(file) => {
            let handle = relative_handle(vault.root(), &file)?;
            let summary = run_extract(&vault, &vault, &handle, &config.notes_folder)?;
            if args.json {
                let created: Vec<&str> = summary.created.iter().map(|h| h.as_str()).collect();
                println!(
                    "{}",
                    serde_json::json!({ "created": created, "source_updated": summary.source_updated })
                );
            } else {
                println!(
                    "Extracted {} task(s) from {}",
                    summary.created.len(),
                    handle
                );
            }
        }
        Command::Help | Command::Policies | Command::Init => {}
    }
    Ok(())
}

/// Accepts a path relative to the vault, or an absolute/relative filesystem
/// path that points inside it.
fn relative_handle(root: &Path, file: &str) -> Result<DocumentHandle> {
    let path = PathBuf::from(file);
    if path.is_relative() && root.join(&path).exists() {
        return Ok(DocumentHandle::from_relative_path(&path));
    }
    let abs = path
        .canonicalize()
        .with_context(|| format!("Cannot find {}", file))?;
    let root = root
        .canonicalize()
        .with_context(|| format!("Cannot open vault {}", root.display()))?;
    let rel = abs
        .strip_prefix(&root)
        .with_context(|| format!("{} is not inside the vault {}", file, root.display()))?;
    Ok(DocumentHandle::from_relative_path(rel))
}
