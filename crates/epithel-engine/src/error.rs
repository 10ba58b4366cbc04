//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: epithel_core::ConfigError,
    },

    /// Building the fixture tissue failed.
    #[error("tissue error: {source}")]
    Tissue {
        /// The underlying table error.
        #[from]
        source: epithel_types::TableError,
    },

    /// Scheduler setup failed.
    #[error("scheduler error: {source}")]
    Behavior {
        /// The underlying scheduler error.
        #[from]
        source: epithel_behaviors::BehaviorError,
    },

    /// History setup or archiving failed.
    #[error("history error: {source}")]
    History {
        /// The underlying history error.
        #[from]
        source: epithel_history::HistoryError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: epithel_core::RunnerError,
    },
}
