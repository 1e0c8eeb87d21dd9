//! Rendering of sync progress events.
//!
//! On a terminal the events drive spinners and bars; anywhere else they
//! become `tracing` records so CI logs stay readable.

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use pagesync::sync::{ProgressCallback, SyncProgress};

use self::interactive::InteractiveReporter;
use self::logging::LoggingReporter;

pub enum ProgressReporter {
    Interactive(InteractiveReporter),
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Pick bars or log lines depending on whether stdout is a terminal.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    fn handle(&self, event: SyncProgress) {
        match self {
            Self::Interactive(bars) => bars.handle(event),
            Self::Logging(log) => log.handle(event),
        }
    }

    /// A callback for the engine and providers that forwards to this reporter.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| reporter.handle(event))
    }

    /// Clear any bars left over from the last run.
    pub fn finish(&self) {
        match self {
            Self::Interactive(bars) => bars.finish(),
            Self::Logging(_) => {}
        }
    }
}
