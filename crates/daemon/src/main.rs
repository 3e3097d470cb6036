// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! skein daemon (skeind)
//!
//! Long-running process that executes workflow runs: HTTP control
//! surface, bounded concurrent execution, cron scheduling, checkpointing,
//! and graceful drain on shutdown.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use skein_daemon::lifecycle::{self, Paths};
use skein_daemon::{env, DaemonConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("skeind {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("skeind {}", env!("CARGO_PKG_VERSION"));
                println!("skein daemon - executes declared workflows over HTTP and cron");
                println!();
                println!("USAGE:");
                println!("    skeind");
                println!();
                println!("Configuration is read from $SKEIN_CONFIG (TOML) when set.");
                println!("State lives under $SKEIN_STATE_DIR (default ~/.local/state/skein).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: skeind [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = DaemonConfig::load(env::config_path().as_deref())?;
    let paths = Paths::resolve()?;

    lifecycle::rotate_log_if_needed(&paths.log_path);
    let _log_guard = setup_logging(&paths)?;

    info!("starting skein daemon");
    let startup = lifecycle::start(config, paths).await?;
    lifecycle::run(startup).await?;
    Ok(())
}

/// File logging with env-filter; the guard flushes on drop.
fn setup_logging(paths: &Paths) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    std::fs::create_dir_all(&paths.state_dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}
