//! Spinner shown while a load sequence runs. Cleared by the load report.

use crate::domain::LoadReport;
use crate::ports::LoadListener;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct LoadSpinner {
    bar: ProgressBar,
}

impl LoadSpinner {
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl LoadListener for LoadSpinner {
    fn on_load_finished(&self, _report: &LoadReport) {
        self.bar.finish_and_clear();
    }
}
