// src/pipeline/schedule.rs

//! Poll scheduler.
//!
//! The first cycle runs immediately. A fixed frequency keeps cycles on a
//! grid anchored at the first start; a range frequency waits a freshly drawn
//! interval after each cycle finishes.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

use crate::error::Result;
use crate::models::FrequencySpec;
use crate::pipeline::cycle::{CycleOutcome, CycleRunner};
use crate::pipeline::detect::SeenState;

/// Owns the seen-state and drives cycles forever.
pub struct PollScheduler {
    runner: CycleRunner,
    frequency: FrequencySpec,
    state: SeenState,
}

impl PollScheduler {
    pub fn new(runner: CycleRunner) -> Self {
        let frequency = runner.settings().frequency;
        Self {
            runner,
            frequency,
            state: SeenState::new(),
        }
    }

    pub fn state(&self) -> &SeenState {
        &self.state
    }

    /// Run one cycle outside the schedule.
    pub async fn run_once(&mut self) -> Result<CycleOutcome> {
        self.runner.run(&mut self.state).await
    }

    /// Run cycles until a fatal error.
    ///
    /// Only an account ban or a failed notification ends the loop.
    pub async fn run(&mut self) -> Result<()> {
        log::info!(
            "Watching {} every {}",
            self.runner.settings().target,
            self.frequency
        );
        let mut scheduled = Instant::now();

        loop {
            log::info!("Checking {}", self.runner.settings().target);
            let outcome = self.run_once().await?;
            log::info!("Cycle finished: {outcome}");

            let finished = Instant::now();
            let next = match self.frequency {
                FrequencySpec::Fixed(count, unit) => {
                    next_fixed_run(scheduled, unit.as_duration(count), finished)
                }
                FrequencySpec::Range(..) => finished + draw_interval(&self.frequency),
            };

            log::info!(
                "Next check {}",
                next_run_label(next.saturating_duration_since(finished))
            );

            sleep_until(next).await;
            scheduled = next;
        }
    }
}

/// Next slot on the fixed grid after `previous`.
///
/// When `now` is already past that slot, whole missed intervals are skipped
/// so the returned slot is at most one interval behind `now`.
pub fn next_fixed_run(previous: Instant, interval: Duration, now: Instant) -> Instant {
    let next = previous + interval;
    if next >= now || interval.is_zero() {
        return next;
    }
    let behind = now.duration_since(next);
    let missed = u32::try_from(behind.as_nanos() / interval.as_nanos()).unwrap_or(u32::MAX);
    if missed > 0 {
        log::warn!("Cycle overran, skipping {missed} scheduled runs");
    }
    next + interval * missed
}

/// Wall-clock time of the next run, or the plain wait when that time is
/// beyond what the calendar can represent.
fn next_run_label(wait: Duration) -> String {
    chrono::Duration::from_std(wait)
        .ok()
        .and_then(|wait| chrono::Local::now().checked_add_signed(wait))
        .map(|at| format!("at {}", at.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_else(|| format!("in {}s", wait.as_secs()))
}

/// Uniform draw in whole seconds from the frequency's inclusive range.
pub fn draw_interval(frequency: &FrequencySpec) -> Duration {
    let lo = frequency.min_interval().as_secs();
    let hi = frequency.max_interval().as_secs();
    Duration::from_secs(fastrand::u64(lo..=hi))
}
