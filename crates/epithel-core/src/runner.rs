//! The driving tick loop.
//!
//! [`run_simulation`] repeats, until the scheduler is idle or `max_ticks`
//! ticks have run:
//!
//! 1. execute every event due this tick;
//! 2. recompute geometry;
//! 3. advance the clock;
//! 4. record history when the tick is a multiple of `record_every`;
//! 5. promote next-tick events.
//!
//! A failing behavior aborts the run with the scheduler's error. History
//! warnings are collected into the [`RunSummary`].

use core::marker::PhantomData;

use epithel_behaviors::{BehaviorError, EventManager};
use epithel_history::{HistoryError, HistoryStore, HistoryWarning};
use epithel_types::{Geometry, TableError, Tissue};
use tracing::{debug, info, warn};

use crate::config::RunConfig;

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A behavior or the scheduler failed.
    #[error("scheduler error: {source}")]
    Behavior {
        /// The underlying scheduler error.
        #[from]
        source: BehaviorError,
    },

    /// Recording history failed.
    #[error("history error: {source}")]
    History {
        /// The underlying history error.
        #[from]
        source: HistoryError,
    },

    /// Recomputing geometry failed.
    #[error("geometry error: {source}")]
    Geometry {
        /// The underlying table error.
        #[from]
        source: TableError,
    },
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// No event is left in either queue.
    Idle,
    /// The tick limit was reached.
    MaxTicksReached,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Why the run stopped.
    pub end_reason: RunEndReason,
    /// Ticks executed by this run.
    pub ticks: u64,
    /// Events executed by this run.
    pub events: usize,
    /// History records issued by this run.
    pub records: u64,
    /// Warnings raised while recording.
    pub warnings: Vec<HistoryWarning>,
}

/// Callback invoked after each tick completes.
pub trait TickCallback {
    /// Called once the tick's events ran and history was recorded.
    fn on_tick(&mut self, tick: u64, executed: usize, tissue: &Tissue);
}

/// A no-op tick callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _tick: u64, _executed: usize, _tissue: &Tissue) {}
}

/// Drives a tissue with geometry `G`.
#[derive(Debug)]
pub struct Runner<'a, G> {
    manager: &'a mut EventManager<Tissue>,
    history: &'a mut dyn HistoryStore,
    config: &'a RunConfig,
    geometry: PhantomData<G>,
}

impl<'a, G: Geometry> Runner<'a, G> {
    /// Bind a scheduler and a history store.
    pub fn new(
        manager: &'a mut EventManager<Tissue>,
        history: &'a mut dyn HistoryStore,
        config: &'a RunConfig,
    ) -> Self {
        Self {
            manager,
            history,
            config,
            geometry: PhantomData,
        }
    }

    /// Run one tick. Returns how many events ran.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if a behavior, the geometry or the history
    /// store fails.
    pub fn step(&mut self, tissue: &mut Tissue, summary: &mut RunSummary) -> Result<usize, RunnerError> {
        let executed = self.manager.execute(tissue)?;
        G::update_all(tissue)?;
        let tick = self.manager.advance_clock()?;

        if self.is_record_tick(tick) {
            let warnings = self.history.record(tissue, Some(tick_time(tick)))?;
            summary.records = summary.records.saturating_add(1);
            summary.warnings.extend(warnings);
            debug!(tick, "History recorded");
        }

        self.manager.update();
        summary.ticks = summary.ticks.saturating_add(1);
        summary.events = summary.events.saturating_add(executed);
        Ok(executed)
    }

    /// Run until idle or until `max_ticks` ticks have run.
    ///
    /// # Errors
    ///
    /// As [`step`](Self::step).
    pub fn run(
        &mut self,
        tissue: &mut Tissue,
        callback: &mut dyn TickCallback,
    ) -> Result<RunSummary, RunnerError> {
        let mut summary = RunSummary {
            end_reason: RunEndReason::Idle,
            ticks: 0,
            events: 0,
            records: 0,
            warnings: Vec::new(),
        };
        info!(
            max_ticks = self.config.max_ticks,
            record_every = self.config.record_every,
            start_tick = self.manager.clock(),
            "Simulation starting"
        );

        loop {
            if self.manager.is_idle() {
                info!(tick = self.manager.clock(), "Scheduler idle");
                summary.end_reason = RunEndReason::Idle;
                break;
            }
            if summary.ticks >= self.config.max_ticks {
                info!(
                    tick = self.manager.clock(),
                    max_ticks = self.config.max_ticks,
                    "Tick limit reached"
                );
                summary.end_reason = RunEndReason::MaxTicksReached;
                break;
            }
            let executed = self.step(tissue, &mut summary)?;
            callback.on_tick(self.manager.clock(), executed, tissue);
        }

        self.history.flush()?;
        if !summary.warnings.is_empty() {
            warn!(count = summary.warnings.len(), "History raised warnings during the run");
        }
        Ok(summary)
    }

    const fn is_record_tick(&self, tick: u64) -> bool {
        match tick.checked_rem(self.config.record_every) {
            Some(rem) => rem == 0,
            None => false,
        }
    }
}

/// Run the simulation loop until the scheduler is idle or the tick limit
/// is reached.
///
/// # Errors
///
/// Returns [`RunnerError`] if a behavior, the geometry or the history
/// store fails. State reached before the failure is kept.
pub fn run_simulation<G: Geometry>(
    tissue: &mut Tissue,
    manager: &mut EventManager<Tissue>,
    history: &mut dyn HistoryStore,
    config: &RunConfig,
    callback: &mut dyn TickCallback,
) -> Result<RunSummary, RunnerError> {
    Runner::<G>::new(manager, history, config).run(tissue, callback)
}

/// Log the end of a run.
pub fn log_simulation_end(summary: &RunSummary) {
    info!(
        reason = ?summary.end_reason,
        ticks = summary.ticks,
        events = summary.events,
        records = summary.records,
        "Simulation ended"
    );
    if summary.ticks == 0 {
        warn!("Simulation ended with no ticks executed");
    }
}

/// Simulation time of a tick.
#[allow(clippy::cast_precision_loss)]
const fn tick_time(tick: u64) -> f64 {
    tick as f64
}
