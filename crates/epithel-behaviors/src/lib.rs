//! Event-driven behavior scheduler for the Epithel simulation.
//!
//! Behaviors are deferred tasks bound to one tissue element (or to no
//! element in particular). The [`EventManager`] keeps two queues: events
//! due this tick (`current`) and events queued for the following tick
//! (`next`). Each tick the driver calls [`EventManager::execute`] to drain
//! `current`, then [`EventManager::update`] to shuffle `next` and promote it.
//!
//! A behavior "suspends" by re-queueing itself for the next tick; the
//! built-in [`wait`] behavior is the canonical example.
//!
//! # Modules
//!
//! - [`error`] -- [`BehaviorError`].
//! - [`event`] -- [`BehaviorId`], [`ElementRef`], [`EventArgs`], [`Event`].
//! - [`registry`] -- [`BehaviorRegistry`] mapping identifiers to functions.
//! - [`manager`] -- The [`EventManager`] itself.
//! - [`sink`] -- Injectable per-event log sinks.
//! - [`wait`] -- The built-in `wait` behavior.

pub mod error;
pub mod event;
pub mod manager;
pub mod registry;
pub mod sink;
pub mod wait;

// Re-export primary types at crate root.
pub use error::BehaviorError;
pub use event::{BehaviorId, ElementRef, Event, EventArgs};
pub use manager::EventManager;
pub use registry::{BehaviorFn, BehaviorRegistry};
pub use sink::{EventSink, FileSink, MemorySink};
pub use wait::wait;
