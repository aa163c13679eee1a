//! Status and progress callbacks.
//!
//! A presentation layer (GUI, CLI progress bar, log) implements
//! [`ProgressObserver`] and hands it to the pipeline. The core never
//! performs interactive I/O itself; it only calls these hooks.
//!
//! Calls happen at well-defined points:
//! - batch start: `report_status` and `report_progress(0, max)`
//! - after each collected unit of work: `report_progress(n, max)`
//! - batch end: `report_status`
//!
//! Progress advances in submission order (see [`crate::executor`]).

use crate::canvas::Canvas;

/// Receiver for pipeline status updates.
///
/// All methods have no-op defaults so implementors only override what they
/// display.
pub trait ProgressObserver: Send + Sync {
    /// Human-readable status line.
    fn report_status(&self, _message: &str) {}

    /// `current` of `max` units completed in the active batch.
    fn report_progress(&self, _current: usize, _max: usize) {}

    /// A freshly assembled preview canvas.
    fn render_preview(&self, _canvas: &Canvas) {}

    /// Preview canvas size and estimated full-resolution size, in pixels.
    fn report_sizes(&self, _preview: (u32, u32), _full: (u32, u32)) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {}

/// Observer that forwards updates to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn report_status(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn report_progress(&self, current: usize, max: usize) {
        tracing::debug!(current, max, "Progress");
    }

    fn render_preview(&self, canvas: &Canvas) {
        let (width, height) = canvas.dimensions();
        tracing::info!(width, height, "Preview ready");
    }

    fn report_sizes(&self, preview: (u32, u32), full: (u32, u32)) {
        tracing::info!(
            preview_width = preview.0,
            preview_height = preview.1,
            full_width = full.0,
            full_height = full.1,
            "Canvas sizes"
        );
    }
}

/// Observer that records every call, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    pub statuses: parking_lot::Mutex<Vec<String>>,
    pub progress: parking_lot::Mutex<Vec<(usize, usize)>>,
    pub previews: parking_lot::Mutex<Vec<(u32, u32)>>,
    pub sizes: parking_lot::Mutex<Vec<((u32, u32), (u32, u32))>>,
}

#[cfg(test)]
impl ProgressObserver for RecordingObserver {
    fn report_status(&self, message: &str) {
        self.statuses.lock().push(message.to_string());
    }

    fn report_progress(&self, current: usize, max: usize) {
        self.progress.lock().push((current, max));
    }

    fn render_preview(&self, canvas: &Canvas) {
        self.previews.lock().push(canvas.dimensions());
    }

    fn report_sizes(&self, preview: (u32, u32), full: (u32, u32)) {
        self.sizes.lock().push((preview, full));
    }
}
