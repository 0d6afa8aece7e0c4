use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::store::Phase;

/// Spinner shown while the agent is working and nothing awaits the reviewer.
pub struct WaitSpinner {
    bar: ProgressBar,
}

impl WaitSpinner {
    pub fn new() -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Show what the agent is doing right now.
    pub fn update(&self, phase: Option<Phase>) {
        let message = match phase {
            Some(phase) => format!("Agent working: {}", style(phase.label()).yellow()),
            None => "Waiting for the agent".to_string(),
        };
        self.bar.set_message(message);
    }

    /// Print above the spinner without tearing it.
    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.println(line.as_ref());
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for WaitSpinner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaitSpinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
