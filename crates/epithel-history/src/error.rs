//! Error and warning types for the history store.
//!
//! Fatal conditions are [`HistoryError`] values; a failing `record` leaves
//! the stored history exactly as it was. Non-fatal conditions are
//! [`HistoryWarning`] values, emitted through `tracing` and returned to the
//! caller.

use core::fmt;
use std::path::PathBuf;

use epithel_types::{DType, ElementKind, TableError};
use tracing::warn;

/// Errors that can occur while recording, retrieving or archiving history.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A tracked column changed data type since tracking started.
    #[error("column {column} of the {kind} table was {expected}, is now {found}")]
    SchemaDrift {
        /// Element kind of the offending table.
        kind: ElementKind,
        /// The drifted column.
        column: String,
        /// Type recorded when tracking started.
        expected: DType,
        /// Type found in the live tissue.
        found: DType,
    },

    /// A tracked element kind is missing from the live tissue.
    #[error("the tissue has no {0} table")]
    MissingElementKind(ElementKind),

    /// A tracked column is missing from the live tissue.
    #[error("column {column} is missing from the {kind} table")]
    MissingColumn {
        /// Element kind of the offending table.
        kind: ElementKind,
        /// The missing column.
        column: String,
    },

    /// Nothing has been recorded.
    #[error("history is empty")]
    EmptyHistory,

    /// Every stored stamp is later than the requested one.
    #[error("no snapshot recorded at or before time {time}")]
    NoSnapshotBefore {
        /// The requested time.
        time: f64,
    },

    /// A time stamp is NaN or infinite.
    #[error("invalid time stamp: {time}")]
    InvalidTimeStamp {
        /// The rejected stamp.
        time: f64,
    },

    /// A new stamp would fall inside an already flushed shard.
    #[error("time {time} is older than the newest flushed stamp {flushed}")]
    StampBeforeFlushedShard {
        /// The rejected stamp.
        time: f64,
        /// Newest stamp already on disk.
        flushed: f64,
    },

    /// An archive file has an unexpected layout or content.
    #[error("corrupt archive {}: {reason}", path.display())]
    CorruptArchive {
        /// The offending file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Archive or shard I/O failed.
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A table operation failed.
    #[error("table error: {0}")]
    Table(#[from] TableError),
}

/// Non-fatal conditions surfaced by the history store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryWarning {
    /// A requested extra column does not exist; it is not tracked.
    UnknownColumn {
        /// Element kind the column was requested for.
        kind: ElementKind,
        /// The requested column.
        column: String,
    },

    /// A column appeared after tracking started; it is not recorded.
    UntrackedColumn {
        /// Element kind of the table.
        kind: ElementKind,
        /// The new column.
        column: String,
    },

    /// No path was given; a default one is in use.
    DefaultPath {
        /// The path in use.
        path: PathBuf,
    },

    /// The requested path already exists; a fresh one is in use.
    ExistingPath {
        /// The path that was asked for.
        requested: PathBuf,
        /// The path in use.
        used: PathBuf,
    },
}

impl HistoryWarning {
    /// Log the warning and hand it back.
    pub(crate) fn emit(self) -> Self {
        warn!(warning = %self, "History warning");
        self
    }
}

impl fmt::Display for HistoryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownColumn { kind, column } => {
                write!(f, "column {column} is not in the {kind} table and will not be tracked")
            }
            Self::UntrackedColumn { kind, column } => write!(
                f,
                "column {column} appeared in the {kind} table and will not be recorded"
            ),
            Self::DefaultPath { path } => {
                write!(f, "no path given, history is saved to {}", path.display())
            }
            Self::ExistingPath { requested, used } => write!(
                f,
                "{} already exists, history is saved to {}",
                requested.display(),
                used.display()
            ),
        }
    }
}
