use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use sseweave::engine::orchestrator::RunSummary;
use sseweave::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Loop-assembly work seen so far in the current run.
///
/// Every `TaskStart` the engine emits opens one loop assembly over a fragment set,
/// sized by the number of candidate topologies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    loop_assemblies: u64,
    topologies_done: u64,
    topologies_total: u64,
}

impl Tally {
    fn describe(&self) -> String {
        format!(
            "loop assembly #{} | {}/{} topologies",
            self.loop_assemblies, self.topologies_done, self.topologies_total
        )
    }
}

struct BarState {
    pb: ProgressBar,
    phase: &'static str,
    tally: Tally,
}

impl BarState {
    fn spin(&self, message: String) {
        self.pb.set_style(spinner_style());
        self.pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        self.pb.set_message(message);
    }

    fn headline(&self) -> String {
        if self.tally.loop_assemblies == 0 {
            self.phase.to_string()
        } else {
            format!("{}: {}", self.phase, self.tally.describe())
        }
    }

    fn apply(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                self.phase = name;
                self.pb.reset();
                self.pb.set_length(0);
                self.spin(self.headline());
            }
            Progress::PhaseFinish => {
                self.pb.disable_steady_tick();
                self.pb.finish_with_message(self.headline());
            }
            Progress::TaskStart { total_steps } => {
                self.tally.loop_assemblies += 1;
                self.tally.topologies_total += total_steps;
                self.pb.disable_steady_tick();
                self.pb.reset();
                self.pb.set_length(total_steps);
                self.pb.set_style(bar_style());
                self.pb.set_message(self.tally.describe());
            }
            Progress::TaskIncrement => {
                self.tally.topologies_done += 1;
                self.pb.inc(1);
                self.pb.set_message(self.tally.describe());
            }
            Progress::TaskFinish => {
                // Growth carries on after a loop assembly, so fall back to the spinner.
                self.spin(self.headline());
            }
            Progress::Message(msg) => self.pb.println(format!("  {}", msg)),
        }
    }
}

/// Renders engine progress on stderr: a spinner while fragments are grown and a
/// topology bar during each loop assembly, with running counts for the whole run.
#[derive(Clone)]
pub struct CliProgressHandler {
    display: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// A handler that tracks state without drawing, used when logging is quiet.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new(0).with_style(spinner_style());
        pb.set_draw_target(target);
        pb.finish_and_clear();
        Self {
            display: Arc::new(Mutex::new(BarState {
                pb,
                phase: "Initializing",
                tally: Tally::default(),
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let display = Arc::clone(&self.display);
        Box::new(move |progress: Progress| match display.lock() {
            Ok(mut guard) => guard.apply(progress),
            Err(_) => warn!("Progress display mutex was poisoned. Cannot update progress."),
        })
    }

    /// Replaces the bar with the final counters of a run.
    pub fn show_summary(&self, summary: &RunSummary) {
        let Ok(guard) = self.display.lock() else {
            warn!("Progress display mutex was poisoned. Cannot show the run summary.");
            return;
        };
        guard.pb.disable_steady_tick();
        guard.pb.finish_with_message(summary_line(summary));
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn summary_line(summary: &RunSummary) -> String {
    format!(
        "{} searches ({} empty, {} pruned), {} loop assemblies over {} topologies, {} accepted",
        summary.search_calls,
        summary.empty_searches,
        summary.pruned_branches,
        summary.loop_assemblies,
        summary.loops.topologies_considered,
        summary.assemblies_accepted
    )
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("[{bar:30.cyan/blue}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}
