//! Progress display for evaluation runs.

use crate::format::{format_duration, shorten_prefix};
use dialeval_runner::{EngineProgress, UnitOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Renders engine progress as a single indicatif bar on stderr.
///
/// Units that do not end up written or up to date are printed above the bar.
pub struct ProgressRenderer {
    bar: ProgressBar,
    started: Instant,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            started: Instant::now(),
        }
    }

    pub fn on_progress(&self, event: &EngineProgress) {
        match event {
            EngineProgress::Started { total } => {
                self.bar.set_length(*total as u64);
                self.bar.set_message("starting");
            }
            EngineProgress::UnitFinished {
                completed,
                prefix,
                outcome,
                ..
            } => {
                self.bar.set_position(*completed as u64);
                self.bar
                    .set_message(format!("{} ({})", shorten_prefix(prefix, 40), outcome.label()));
                match outcome {
                    UnitOutcome::Written { .. } | UnitOutcome::UpToDate => {}
                    other => self.bar.println(format!("  {}: {}", prefix, other)),
                }
            }
            _ => {}
        }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message(format!(
            "done in {}",
            format_duration(self.started.elapsed())
        ));
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}
