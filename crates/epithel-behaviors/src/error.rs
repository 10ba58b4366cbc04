//! Error types for the behavior scheduler.

use crate::event::BehaviorId;

/// Errors raised while scheduling or executing behaviors.
///
/// Behaviors return this type too; any error they raise aborts the
/// running [`execute`](crate::EventManager::execute) call.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    /// An event references a behavior that was never registered.
    #[error("unknown behavior: {0}")]
    UnknownBehavior(BehaviorId),

    /// A behavior identifier was registered twice.
    #[error("behavior already registered: {0}")]
    DuplicateBehavior(BehaviorId),

    /// A required argument was not supplied.
    #[error("behavior {behavior} is missing argument {name}")]
    MissingArgument {
        /// The behavior being invoked.
        behavior: BehaviorId,
        /// The missing argument name.
        name: String,
    },

    /// An argument had the wrong shape.
    #[error("behavior {behavior} argument {name}: {reason}")]
    InvalidArgument {
        /// The behavior being invoked.
        behavior: BehaviorId,
        /// The argument name.
        name: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// A tissue table operation failed inside a behavior.
    #[error("tissue error: {source}")]
    Tissue {
        /// The underlying table error.
        #[from]
        source: epithel_types::TableError,
    },

    /// Writing to the event log failed.
    #[error("event log error: {source}")]
    Sink {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The scheduler clock would overflow.
    #[error("scheduler clock overflow")]
    ClockOverflow,
}
