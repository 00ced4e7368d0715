//! Spinner progress display for batch commands.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use pulse_enrich::BatchProgress;

/// A single spinner line that follows the batch through its outputs.
///
/// Hidden when `quiet` is set. Log lines emitted while it ticks are printed
/// above it.
pub(crate) struct BatchSpinner {
    pb: ProgressBar,
}

impl BatchSpinner {
    pub(crate) fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("/-\\|");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }
}

impl BatchProgress for BatchSpinner {
    fn on_output(&self, current: usize, total: Option<usize>, output_id: &str) {
        let msg = match total {
            Some(total) => format!("[{}/{}] {}", current, total, output_id),
            None => format!("[{}] {}", current, output_id),
        };
        self.pb.set_message(msg);
    }

    fn on_phase(&self, message: &str) {
        let message = message.to_string();
        self.pb.suspend(|| log::debug!("{}", message));
        self.pb.set_message(message);
    }

    fn on_complete(&self, message: &str) {
        self.pb.finish_and_clear();
        log::debug!("{}", message);
    }
}

impl Drop for BatchSpinner {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}
