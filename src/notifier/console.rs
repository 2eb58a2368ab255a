// notifier/console.rs

use crate::notifier::Notifier;
use std::io::Write;
use tracing::{error, info, warn};

/// Writes alerts to stderr so they reach the user, not just the log.
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    fn busy(&self, on: bool) {
        if on {
            info!("⏳ Loading...");
        } else {
            info!("Loading finished.");
        }
    }

    fn alert(&self, message: &str) {
        error!("{}", message);
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "❌ {}", message);
    }

    fn notice(&self, message: &str) {
        warn!("{}", message);
    }
}
