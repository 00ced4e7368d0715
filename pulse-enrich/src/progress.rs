//! Batch progress reporting.

/// Receives progress updates from batch runs and queue workers.
pub trait BatchProgress {
    /// Called after each output is dispatched. `total` is known only when the
    /// batch is bounded.
    fn on_output(&self, current: usize, total: Option<usize>, output_id: &str);

    /// Called when a phase of the run starts (e.g. "Fetching next chunk").
    fn on_phase(&self, message: &str);

    /// Called when the run is complete.
    fn on_complete(&self, message: &str);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn on_output(&self, _current: usize, _total: Option<usize>, _output_id: &str) {}
    fn on_phase(&self, _message: &str) {}
    fn on_complete(&self, _message: &str) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl BatchProgress for LogProgress {
    fn on_output(&self, current: usize, total: Option<usize>, output_id: &str) {
        match total {
            Some(total) if current.is_multiple_of(100) || current == total => {
                log::info!("  [{}/{}] {}", current, total, output_id);
            }
            None if current.is_multiple_of(100) => {
                log::info!("  [{}] {}", current, output_id);
            }
            _ => {}
        }
    }

    fn on_phase(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn on_complete(&self, message: &str) {
        log::info!("{}", message);
    }
}
