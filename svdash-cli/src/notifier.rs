use std::io::Write;

use svdash_core::notify::Notificator;

/// Prints notifications to stderr, one per line
pub struct ConsoleNotificator;

impl Notificator for ConsoleNotificator {
    fn success(&self, message: &str) {
        tracing::info!(event = "notify.success", message = %message);
        let _ = writeln!(std::io::stderr(), "\x1b[32m✓\x1b[0m {}", message);
    }

    fn error(&self, message: &str) {
        tracing::warn!(event = "notify.error", message = %message);
        let _ = writeln!(std::io::stderr(), "\x1b[31m✗\x1b[0m {}", message);
    }
}
