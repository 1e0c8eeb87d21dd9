use std::sync::Mutex;
use std::time::Duration;

use pagesync::sync::SyncProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Bars for the phases of one run.
#[derive(Default)]
struct ProgressState {
    /// Spinner while a listing is in flight.
    spinner: Option<ProgressBar>,
    delete_bar: Option<ProgressBar>,
    import_bar: Option<ProgressBar>,
    /// Item errors seen so far.
    errors: usize,
}

/// Interactive progress reporter using indicatif.
///
/// Shows a spinner while listing, then one bar for deletes and one for
/// imports.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::ListingTarget { config, space_id } => {
                let spinner = self.spinner(&config);
                spinner.set_message(format!("Listing space {space_id}..."));
                state.spinner = Some(spinner);
            }

            SyncProgress::TargetListed { pages, .. } => {
                if let Some(spinner) = state.spinner.take() {
                    spinner.finish_with_message(format!("{pages} existing pages"));
                }
            }

            SyncProgress::DeletingPages { count } => {
                let bar = self.bar("delete", count);
                bar.set_message("Deleting...");
                state.delete_bar = Some(bar);
            }

            SyncProgress::DeletedPage { title, page_id } => {
                if let Some(bar) = &state.delete_bar {
                    bar.inc(1);
                    bar.set_message(title.unwrap_or(page_id));
                }
            }

            SyncProgress::DeleteError { page_id, error } => {
                state.errors += 1;
                if let Some(bar) = &state.delete_bar {
                    bar.inc(1);
                    bar.println(format!("  ✗ delete {page_id}: {error}"));
                }
            }

            SyncProgress::FetchingSource { provider } => {
                if let Some(bar) = state.delete_bar.take()
                    && !bar.is_finished()
                {
                    bar.finish_with_message("Deleted");
                }
                let spinner = self.spinner("source");
                spinner.set_message(format!("Listing {provider} source..."));
                state.spinner = Some(spinner);
            }

            SyncProgress::SourceListed { count } => {
                if let Some(spinner) = state.spinner.take() {
                    spinner.finish_with_message(format!("{count} documents"));
                }
                let bar = self.bar("import", count);
                bar.set_message("Importing...");
                state.import_bar = Some(bar);
            }

            SyncProgress::ImportedItem { name, .. } => {
                if let Some(bar) = &state.import_bar {
                    bar.inc(1);
                    bar.set_message(name);
                }
            }

            SyncProgress::ImportError { name, error } => {
                state.errors += 1;
                if let Some(bar) = &state.import_bar {
                    bar.inc(1);
                    bar.println(format!("  ✗ {name}: {error}"));
                }
            }

            SyncProgress::RateLimitBackoff {
                resource,
                retry_after_ms,
                attempt,
            } => {
                let line = format!(
                    "  ⏳ rate limited on {resource}, retrying in {:.1}s (attempt {attempt})",
                    retry_after_ms as f64 / 1000.0
                );
                match state.import_bar.as_ref().or(state.spinner.as_ref()) {
                    Some(bar) => bar.println(line),
                    None => {
                        self.multi.println(line).ok();
                    }
                }
            }

            SyncProgress::Cancelled {
                imported,
                remaining,
            } => {
                let message = format!("Cancelled after {imported} ({remaining} left)");
                for bar in [state.delete_bar.take(), state.import_bar.take()]
                    .into_iter()
                    .flatten()
                {
                    bar.abandon_with_message(message.clone());
                }
            }

            SyncProgress::SyncComplete {
                imported, errors, ..
            } => {
                if let Some(bar) = state.import_bar.take() {
                    bar.finish_with_message(format!("{imported} imported, {errors} errors"));
                }
            }

            _ => {}
        }
    }

    /// Finish all progress bars.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for bar in [
            state.spinner.take(),
            state.delete_bar.take(),
            state.import_bar.take(),
        ]
        .into_iter()
        .flatten()
        {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    }

    fn spinner(&self, prefix: &str) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::spinner_style());
        bar.set_prefix(format!("{prefix:12}"));
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    fn bar(&self, prefix: &str, len: usize) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(len as u64));
        bar.set_style(Self::bar_style());
        bar.set_prefix(format!("{prefix:12}"));
        bar
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
