use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use poreflow::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const TICK_MS: u64 = 120;
const PERCENT_SCALE: u64 = 100;

/// Drives one percentage bar across every phase of a simulation run.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(PERCENT_SCALE)
            .with_style(Self::bar_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    if pb_guard.is_finished() {
                        pb_guard.reset();
                    }
                    pb_guard.enable_steady_tick(Duration::from_millis(TICK_MS));
                    pb_guard.set_message(name.to_string());
                }
                Progress::PhaseFinish => {}
                Progress::Percent(value) => {
                    let position = value.round().clamp(0.0, PERCENT_SCALE as f64) as u64;
                    // A finished bar only moves again after the next phase resets it.
                    if position > pb_guard.position() && !pb_guard.is_finished() {
                        pb_guard.set_position(position);
                    }
                    if position >= PERCENT_SCALE && !pb_guard.is_finished() {
                        pb_guard.disable_steady_tick();
                        pb_guard.finish_with_message("✓ Done");
                    }
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.green} {msg:<24} [{bar:40.cyan/blue}] {pos:>3}% ({secs})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key(
            "secs",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.elapsed().as_secs_f64());
            },
        )
        .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
