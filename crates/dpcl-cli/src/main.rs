//! DPCL shell.
//!
//! # Configuration
//!
//! Sources, highest priority first:
//!
//! 1. CLI arguments
//! 2. Environment variables (`DPCL_*`)
//! 3. Default values
//!
//! # Environment Variables
//!
//! - `DPCL_DEBUG`: enable debug logging (`true`/`1`)
//! - `DPCL_STEP_BUDGET`: cascade step budget
//! - `DPCL_HISTORY`: line-history file path

mod line;
mod log_writer;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dpcl_engine::{Engine, EngineConfig};
use dpcl_types::ErrorCode;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use shell::Shell;

/// DPCL, an interpreter for a declarative norm language.
#[derive(Parser, Debug)]
#[command(name = "dpcl")]
#[command(version, about, long_about = None)]
struct Args {
    /// Program file to load before the first prompt
    #[arg(short, long)]
    program: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Cascade step budget (also: DPCL_STEP_BUDGET)
    #[arg(long)]
    budget: Option<usize>,

    /// Extra import search directory (repeatable)
    #[arg(long = "import-dir")]
    import_dirs: Vec<PathBuf>,

    /// Line-history file (also: DPCL_HISTORY)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Input line to execute instead of the interactive loop
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logging: --debug > --verbose > RUST_LOG env > default "warn"
    let debug = args.debug || env_flag("DPCL_DEBUG");
    let filter = if debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let writer = log_writer::LogTee::new(open_log_file());
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer)
        .init();

    let budget = args
        .budget
        .or_else(|| {
            std::env::var("DPCL_STEP_BUDGET")
                .ok()
                .and_then(|v| v.parse().ok())
        })
        .unwrap_or(dpcl_engine::DEFAULT_STEP_BUDGET);

    let mut config = EngineConfig::default().with_step_budget(budget);
    for dir in args.import_dirs {
        config = config.with_import_dir(dir);
    }

    let mut engine = Engine::new(config);

    // A startup load failure is fatal; in-session `load` failures
    // are not.
    if let Some(program) = &args.program {
        if let Err(e) = engine.load_file(program) {
            eprintln!("error[{}]: {e}", e.code());
            std::process::exit(1);
        }
        println!("loaded {}", program.display());
        info!(path = %program.display(), "program loaded at startup");
    }

    let history = args
        .history
        .or_else(|| std::env::var("DPCL_HISTORY").ok().map(PathBuf::from))
        .or_else(|| dirs::home_dir().map(|h| h.join(".dpcl").join("history")));

    let mut shell = Shell::new(engine);
    if let Some(history) = history {
        shell = shell.with_history(history);
    }

    if args.command.is_empty() {
        let code = shell.run_interactive()?;
        if code != 0 {
            std::process::exit(code);
        }
    } else {
        let input = args.command.join(" ");
        info!(command = %input, "command mode");
        shell.execute(&input);
    }

    Ok(())
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Opens `~/.dpcl/logs/dpcl.log` for appending. `None` (non-fatal)
/// if the directory or file cannot be created.
fn open_log_file() -> Option<Arc<parking_lot::Mutex<std::fs::File>>> {
    let log_dir = dirs::home_dir()?.join(".dpcl").join("logs");
    if std::fs::create_dir_all(&log_dir).is_err() {
        return None;
    }

    let log_path = log_dir.join("dpcl.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => Some(Arc::new(parking_lot::Mutex::new(file))),
        Err(e) => {
            eprintln!("warning: cannot open log file {}: {e}", log_path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_values() {
        // Uses a name no other test sets, to stay parallel-safe.
        std::env::remove_var("DPCL_TEST_FLAG");
        assert!(!env_flag("DPCL_TEST_FLAG"));

        std::env::set_var("DPCL_TEST_FLAG", "1");
        assert!(env_flag("DPCL_TEST_FLAG"));

        std::env::set_var("DPCL_TEST_FLAG", "true");
        assert!(env_flag("DPCL_TEST_FLAG"));

        std::env::set_var("DPCL_TEST_FLAG", "no");
        assert!(!env_flag("DPCL_TEST_FLAG"));

        std::env::remove_var("DPCL_TEST_FLAG");
    }
}
