//! Spinner feedback while a table loads.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tidy_ingest::Progress;

const TICK: Duration = Duration::from_millis(100);

/// Progress sink drawing an `indicatif` spinner on stderr.
///
/// The spinner hides itself when stderr is not a terminal.
#[derive(Debug, Clone)]
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner())
    }

    /// Uses an existing bar, e.g. a hidden one.
    #[must_use]
    pub fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        Self { bar }
    }

    /// Current spinner message.
    #[must_use]
    pub fn message(&self) -> String {
        self.bar.message()
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for SpinnerProgress {
    fn started(&self, name: &str) {
        self.bar.set_message(format!("Loading data '{name}'..."));
        self.bar.enable_steady_tick(TICK);
    }

    fn finished(&self) {
        let message = format!("{} done!", self.bar.message());
        self.bar.finish_with_message(message);
    }

    fn notice(&self, message: &str) {
        // `println` on a hidden bar drops the line.
        self.bar.suspend(|| println!("{message}"));
    }
}
