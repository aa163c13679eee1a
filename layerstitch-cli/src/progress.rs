//! Terminal progress display.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use layerstitch::canvas::Canvas;
use layerstitch::pipeline::ProgressObserver;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Shows pipeline progress as a single `indicatif` bar.
///
/// Each batch (conversion, loading) resets the bar's length when it reports
/// `report_progress(0, max)`.
pub struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    /// Bar drawn on stderr, or hidden when `quiet`.
    pub fn new(quiet: bool) -> Self {
        let bar = ProgressBar::new(0);
        if quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for BarObserver {
    fn report_status(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn report_progress(&self, current: usize, max: usize) {
        if current == 0 {
            self.bar.reset();
        }
        self.bar.set_length(max as u64);
        self.bar.set_position(current as u64);
    }

    fn render_preview(&self, canvas: &Canvas) {
        let (width, height) = canvas.dimensions();
        self.bar
            .set_message(format!("Preview rendered ({}x{})", width, height));
    }
}

impl Drop for BarObserver {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
