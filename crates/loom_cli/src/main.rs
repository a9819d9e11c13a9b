mod commands;
mod config;

use anyhow::{anyhow, Result};
use config::ProjectConfig;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn usage() {
    eprintln!("loom <generate|validate|info> [options] <description-file>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  generate <file> [--target <name>] [--output <dir>] [--strict]");
    eprintln!("                                      Emit binding sources for a target");
    eprintln!("  validate <file> [--strict]          Check a description and report problems");
    eprintln!("  info <file>                         Summarize classes, functions and overloads");
    eprintln!();
    eprintln!("Global options:");
    eprintln!("  --config <path>                     Project file (default: ./loom.toml)");
    eprintln!("  --verbose, -v                       Debug logging (or set LOOM_LOG)");
    eprintln!();
    eprintln!("Targets:");
    eprintln!("  registration (default)  Registration source + CMake static library");
    eprintln!("  javascript, js          Node.js addon (binding.cxx, binding.gyp, package.json)");
    eprintln!("  python, py              Python extension (pybind11 CMake, pyproject.toml)");
    eprintln!();
    eprintln!("Description formats: .yaml, .yml, .json, .ild, .loom");
}

/// Flags accepted before or after the command name
#[derive(Debug, Default, PartialEq, Eq)]
struct GlobalOptions {
    verbose: bool,
    config: Option<PathBuf>,
}

/// Remove global flags from `args`, leaving command arguments in order
fn take_global_options(args: &mut Vec<String>) -> Result<GlobalOptions> {
    let mut options = GlobalOptions::default();
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.drain(..);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verbose" | "-v" => options.verbose = true,
            "--config" | "-c" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a value"))?;
                options.config = Some(PathBuf::from(path));
            }
            _ => rest.push(arg),
        }
    }
    drop(iter);
    *args = rest;
    Ok(options)
}

fn init_logging(verbose: bool) {
    // LOOM_LOG wins; --verbose only changes the fallback
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("LOOM_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let options = take_global_options(&mut args)?;
    init_logging(options.verbose);

    if args.is_empty() {
        usage();
        return Ok(());
    }

    let cmd = args.remove(0);
    let cwd = env::current_dir()?;

    match cmd.as_str() {
        "generate" | "gen" => {
            let config = ProjectConfig::load(options.config.as_deref(), &cwd)?;
            commands::run_generate(&args, &config)?;
        }
        "validate" | "check" => {
            let config = ProjectConfig::load(options.config.as_deref(), &cwd)?;
            commands::run_validate(&args, &config)?;
        }
        "info" => {
            commands::run_info(&args)?;
        }
        "help" | "--help" | "-h" => {
            usage();
        }
        _ => {
            usage();
            return Err(anyhow!("Unknown command: {}", cmd));
        }
    }

    Ok(())
}
