//! Common interface of the history variants.

use core::fmt;
use std::path::Path;

use epithel_types::Tissue;

use crate::error::{HistoryError, HistoryWarning};
use crate::history::History;
use crate::segmented::SegmentedHistory;

/// A time-indexed store of tissue snapshots.
///
/// Lets the driving loop record into either variant through one handle.
pub trait HistoryStore: fmt::Debug {
    /// Store the tracked columns of `tissue` under `time_stamp`, or under
    /// the last used stamp plus one.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] on schema drift or storage failure; the
    /// store is unchanged on validation errors.
    fn record(&mut self, tissue: &Tissue, time_stamp: Option<f64>)
    -> Result<Vec<HistoryWarning>, HistoryError>;

    /// Rebuild the tissue as of `time`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NoSnapshotBefore`] if nothing is stored at
    /// or before `time`.
    fn retrieve(&self, time: f64) -> Result<Tissue, HistoryError>;

    /// Return the stored stamps, ascending.
    fn time_stamps(&self) -> Vec<f64>;

    /// Write the whole history to one archive file.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] or [`HistoryError::Serialization`].
    fn to_archive(&self, path: &Path) -> Result<(), HistoryError>;

    /// Persist anything still held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] or [`HistoryError::Serialization`].
    fn flush(&mut self) -> Result<(), HistoryError> {
        Ok(())
    }
}

impl HistoryStore for History {
    fn record(
        &mut self,
        tissue: &Tissue,
        time_stamp: Option<f64>,
    ) -> Result<Vec<HistoryWarning>, HistoryError> {
        Self::record(self, tissue, time_stamp)
    }

    fn retrieve(&self, time: f64) -> Result<Tissue, HistoryError> {
        Self::retrieve(self, time)
    }

    fn time_stamps(&self) -> Vec<f64> {
        Self::time_stamps(self)
    }

    fn to_archive(&self, path: &Path) -> Result<(), HistoryError> {
        Self::to_archive(self, path)
    }
}

impl HistoryStore for SegmentedHistory {
    fn record(
        &mut self,
        tissue: &Tissue,
        time_stamp: Option<f64>,
    ) -> Result<Vec<HistoryWarning>, HistoryError> {
        Self::record(self, tissue, time_stamp)
    }

    fn retrieve(&self, time: f64) -> Result<Tissue, HistoryError> {
        Self::retrieve(self, time)
    }

    fn time_stamps(&self) -> Vec<f64> {
        Self::time_stamps(self)
    }

    fn to_archive(&self, path: &Path) -> Result<(), HistoryError> {
        Self::to_archive(self, path)
    }

    fn flush(&mut self) -> Result<(), HistoryError> {
        Self::flush(self)
    }
}
