use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;
use tokio::sync::Notify;

/// Global shutdown flag for graceful termination.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Wakes tasks parked in [`shutdown_requested`].
static SHUTDOWN_NOTIFY: OnceLock<Notify> = OnceLock::new();

fn notifier() -> &'static Notify {
    SHUTDOWN_NOTIFY.get_or_init(Notify::new)
}

/// The flag sync runs poll at item boundaries.
pub(crate) fn shutdown_flag() -> &'static AtomicBool {
    &SHUTDOWN_REQUESTED
}

/// Check if shutdown has been requested.
#[inline]
pub(crate) fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Acquire)
}

/// Resolves once shutdown has been requested.
pub(crate) async fn shutdown_requested() {
    loop {
        // Registered before the flag check so a concurrent request is not missed.
        let notified = notifier().notified();
        if is_shutdown_requested() {
            return;
        }
        notified.await;
    }
}

fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
    notifier().notify_waiters();
}

/// Set up the Ctrl+C handler for graceful shutdown.
pub(crate) fn setup_shutdown_handler() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing the current page...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing the current page");
        }

        request_shutdown();

        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }

        if is_tty {
            eprintln!("Force quit!");
        }
        std::process::exit(130);
    });
}
