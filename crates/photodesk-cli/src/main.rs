//! photodesk - a command shell for photodesk projects, photos and items.
//!
//! `photodesk` with no arguments starts the interactive shell;
//! `photodesk <command> [args]` runs a single command and exits.

mod shell;

use std::path::Path;

use anyhow::{anyhow, Result};
use photodesk_core::{Config, PhotoDesk};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shell::{Command, Shell};

// ============================================================================
// Constants
// ============================================================================

/// Log file name prefix; the appender adds the date
const LOG_FILE_PREFIX: &str = "photodesk.log";

/// Initialize the tracing subscriber. Logs go to a daily file so they never
/// interleave with shell output.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=photodesk_core=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let log_dir = config.data_dir()?.join("logs");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: could not create log directory {}: {}", log_dir.display(), e);
    }
    let _guard = init_tracing(&log_dir);
    info!(api = %config.api_base_url, storage = %config.token_storage, "photodesk starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let desk = PhotoDesk::new(config)?;

    if args.is_empty() {
        Shell::new(desk, true).run().await?;
    } else {
        let command = Command::parse(&args)?;
        if let Err(e) = Shell::new(desk, false).execute(command).await {
            warn!(error = %e, "Command failed");
            return Err(anyhow!(e.user_message()));
        }
    }

    info!("photodesk shutting down");
    Ok(())
}
