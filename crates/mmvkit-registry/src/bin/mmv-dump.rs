//! mmv-dump <path>
//!
//! Maps a region file read-only and prints the decoded snapshot as JSON.
//! A region caught mid-build or mid-rebuild is re-read a few times before
//! giving up.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use mmvkit_core::protocol::Snapshot;
use mmvkit_core::{MmvError, Result};
use mmvkit_registry::region::read_file;

const ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(20);

fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: mmv-dump <path>");
        return ExitCode::from(2);
    };

    match dump(Path::new(&path)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(%path, error = %e, code = e.code().as_str(), "dump failed");
            ExitCode::FAILURE
        }
    }
}

fn dump(path: &Path) -> Result<String> {
    let mut attempt = 1;
    let snapshot = loop {
        match read_file(path).and_then(|bytes| Snapshot::decode(&bytes)) {
            Err(e) if e.is_retryable() && attempt < ATTEMPTS => {
                tracing::debug!(attempt, error = %e, "retrying");
                attempt += 1;
                std::thread::sleep(RETRY_DELAY);
            }
            other => break other?,
        }
    };
    serde_json::to_string_pretty(&snapshot)
        .map_err(|e| MmvError::InvalidFormat(format!("snapshot encoding: {e}")))
}
