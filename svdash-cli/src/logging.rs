use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// One-shot commands already print notifications to stderr
const STDERR_DEFAULT_LEVEL: &str = "warn";
const FILE_DEFAULT_LEVEL: &str = "info";

fn default_directives(level: &str) -> String {
    format!("svdash={level},svdash_core={level}")
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)))
}

/// Log to stderr. Used by the one-shot commands, quiet unless something
/// goes wrong or RUST_LOG asks for more.
pub fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter(STDERR_DEFAULT_LEVEL))
        .init();
}

/// Log to a file so the TUI screen stays clean
pub fn init_file_logging(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(filter(FILE_DEFAULT_LEVEL))
        .init();
    Ok(())
}
