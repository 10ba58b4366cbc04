//! Configuration and the driving tick loop for the Epithel simulation.
//!
//! This crate wires the scheduler, the geometry and the history store into
//! one loop: execute due behaviors, update geometry, advance the clock,
//! record history at the configured cadence, promote next-tick events.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from YAML into strongly-typed
//!   structs, and builders for the scheduler and the history store.
//! - [`runner`] -- [`run_simulation`] and the [`Runner`] it drives.
//!
//! [`run_simulation`]: runner::run_simulation
//! [`Runner`]: runner::Runner

pub mod config;
pub mod runner;

// Re-export primary types at crate root.
pub use config::{
    ConfigError, HistoryConfig, LoggingConfig, RunConfig, SchedulerConfig, SimulationConfig,
};
pub use runner::{
    NoOpCallback, RunEndReason, RunSummary, Runner, RunnerError, TickCallback,
    log_simulation_end, run_simulation,
};
