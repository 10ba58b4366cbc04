//! Time-indexed history of tissue states for the Epithel simulation.
//!
//! A history is bound to one tissue when it is created and stores that
//! tissue's state at time 0. Each `record` call stores the tracked columns
//! of every element table under a time stamp; `retrieve` rebuilds an
//! independent tissue as of any past time.
//!
//! Two variants share the same contract:
//!
//! - [`History`] keeps every snapshot in memory.
//! - [`SegmentedHistory`] rolls snapshots over into shard files and loads
//!   at most one shard per retrieval.
//!
//! # Modules
//!
//! - [`error`] -- [`HistoryError`] and [`HistoryWarning`].
//! - [`schema`] -- Which columns are tracked, and drift detection.
//! - [`records`] -- Stored snapshots and the tissue binding.
//! - [`archive`] -- The JSON archive format (full, manifest, shard).
//! - [`history`] -- The in-memory [`History`].
//! - [`segmented`] -- The sharded [`SegmentedHistory`].
//! - [`store`] -- The [`HistoryStore`] trait over both.

pub mod archive;
pub mod error;
pub mod history;
pub mod records;
pub mod schema;
pub mod segmented;
pub mod store;

// Re-export primary types at crate root.
pub use archive::{ArchiveContainer, ArchiveFile, ShardInfo};
pub use error::{HistoryError, HistoryWarning};
pub use history::{History, HistoryOptions};
pub use records::{TIME_COLUMN, TissueBinding};
pub use schema::{ExtraColumns, Snapshot, TrackedSchema};
pub use segmented::{DEFAULT_PATH, DEFAULT_SAVE_EVERY, SegmentOptions, SegmentedHistory};
pub use store::HistoryStore;
