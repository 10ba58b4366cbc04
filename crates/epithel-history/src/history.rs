//! The in-memory history store.

use std::path::Path;

use epithel_types::{ElementKind, Table, Tissue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::archive::{ArchiveFile, load_records};
use crate::error::{HistoryError, HistoryWarning};
use crate::records::{RecordLog, Stamper, TissueBinding};
use crate::schema::ExtraColumns;

/// Options shared by both history variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Columns to track beyond the defaults, per element kind.
    pub extra_cols: ExtraColumns,
    /// Simulated time between stored snapshots. `None` stores every call.
    pub sample_interval: Option<f64>,
    /// Simulated time between `record` calls.
    pub dt: f64,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            extra_cols: ExtraColumns::new(),
            sample_interval: None,
            dt: 1.0,
        }
    }
}

impl HistoryOptions {
    /// Track `columns` of `kind` in addition to the defaults.
    #[must_use]
    pub fn with_extra_cols<I, S>(mut self, kind: ElementKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_cols
            .entry(kind)
            .or_default()
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Return how many `record` calls make up one stored snapshot:
    /// `round(sample_interval / dt)`, at least 1.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn stride(&self) -> u64 {
        let Some(interval) = self.sample_interval else {
            return 1;
        };
        let ratio = (interval / self.dt).round();
        if ratio.is_finite() && ratio >= 1.0 {
            // Finite and at least 1, so the cast saturates at worst.
            ratio as u64
        } else {
            1
        }
    }
}

/// Time-indexed log of tissue snapshots, held in memory.
///
/// Created from a live tissue, whose state is stored at time 0. Each
/// [`record`](Self::record) stores the tissue's tracked columns under a
/// new stamp (or replaces the snapshot of an existing stamp).
/// [`retrieve`](Self::retrieve) rebuilds the tissue as of any time.
#[derive(Debug, Clone)]
pub struct History {
    binding: TissueBinding,
    log: RecordLog,
    stamper: Stamper,
    warnings: Vec<HistoryWarning>,
}

impl History {
    /// Create a history bound to `tissue` and store its state at time 0.
    ///
    /// Requested extra columns that do not exist are reported through
    /// [`warnings`](Self::warnings) and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Table`] if the initial snapshot cannot be
    /// taken.
    pub fn new(tissue: &Tissue, options: &HistoryOptions) -> Result<Self, HistoryError> {
        let (binding, mut warnings) = TissueBinding::bind(tissue, &options.extra_cols);
        let (snapshot, capture_warnings) = binding.schema().capture(tissue)?;
        warnings.extend(capture_warnings);

        let mut log = RecordLog::default();
        log.insert(0.0, snapshot);
        info!(
            tissue = binding.identifier(),
            kinds = binding.schema().kinds().count(),
            "History started"
        );
        Ok(Self {
            binding,
            log,
            stamper: Stamper::new(0.0, options.stride()),
            warnings,
        })
    }

    /// Return the warnings raised at construction.
    pub fn warnings(&self) -> &[HistoryWarning] {
        &self.warnings
    }

    /// Return the tissue binding.
    pub const fn binding(&self) -> &TissueBinding {
        &self.binding
    }

    /// Return the most recently used time stamp.
    pub const fn time(&self) -> f64 {
        self.stamper.time()
    }

    /// Return the number of stored snapshots.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Return `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Store the tracked columns of `tissue`.
    ///
    /// Without a stamp, the last used stamp plus one is used. A stamp that
    /// is already stored has its snapshot replaced. Returns the warnings
    /// raised by this call.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SchemaDrift`] if a tracked column changed
    /// type, [`HistoryError::MissingElementKind`] /
    /// [`HistoryError::MissingColumn`] if tracked data vanished, or
    /// [`HistoryError::InvalidTimeStamp`] for a non-finite stamp. On error
    /// the history is unchanged.
    pub fn record(
        &mut self,
        tissue: &Tissue,
        time_stamp: Option<f64>,
    ) -> Result<Vec<HistoryWarning>, HistoryError> {
        let (snapshot, warnings) = self.binding.schema().capture(tissue)?;
        let stamp = self.stamper.resolve(time_stamp)?;
        if stamp.due {
            if self.log.insert(stamp.time, snapshot).is_some() {
                debug!(time = stamp.time, "Snapshot replaced");
            } else {
                debug!(time = stamp.time, "Snapshot recorded");
            }
        }
        self.stamper.commit(stamp);
        Ok(warnings)
    }

    /// Rebuild the tissue as of `time`: the latest snapshot stamped at or
    /// before it. Every table carries a `time` column.
    ///
    /// The returned tissue shares nothing with the history.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NoSnapshotBefore`] if every stamp is later
    /// than `time`.
    pub fn retrieve(&self, time: f64) -> Result<Tissue, HistoryError> {
        let (stamp, snapshot) = self
            .log
            .as_of(time)
            .ok_or(HistoryError::NoSnapshotBefore { time })?;
        Ok(self.binding.rebuild(stamp, snapshot))
    }

    /// Return every stored snapshot of one kind, concatenated, with a
    /// `time` column.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Table`] if snapshots cannot be concatenated.
    pub fn dataset(&self, kind: ElementKind) -> Result<Table, HistoryError> {
        Ok(self.log.dataset(kind)?)
    }

    /// Return the stored stamps, ascending.
    pub fn time_stamps(&self) -> Vec<f64> {
        self.log.stamps().collect()
    }

    /// Write the whole history to one archive file.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] or [`HistoryError::Serialization`].
    pub fn to_archive(&self, path: &Path) -> Result<(), HistoryError> {
        ArchiveFile::Full {
            binding: self.binding.clone(),
            container: self.log.to_container(),
        }
        .write(path)?;
        info!(path = %path.display(), snapshots = self.log.len(), "History archived");
        Ok(())
    }

    /// Load a history from a full archive or a segmented manifest.
    ///
    /// Auto stamps continue after the newest stored stamp.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::EmptyHistory`] if the archive holds no
    /// snapshot, or the errors of [`ArchiveFile::read`].
    pub fn from_archive(path: &Path) -> Result<Self, HistoryError> {
        let (binding, log) = load_records(path)?;
        let last = log.last().ok_or(HistoryError::EmptyHistory)?;
        info!(path = %path.display(), snapshots = log.len(), "History loaded");
        Ok(Self {
            binding,
            log,
            stamper: Stamper::new(last, 1),
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use epithel_types::{Scalar, three_faces_sheet};

    use super::*;

    #[test]
    fn stride_rounds_interval_over_dt() {
        let options = HistoryOptions {
            sample_interval: Some(1.0),
            dt: 0.4,
            ..HistoryOptions::default()
        };
        assert_eq!(options.stride(), 3);
        assert_eq!(HistoryOptions::default().stride(), 1);
        let tiny = HistoryOptions {
            sample_interval: Some(0.1),
            ..HistoryOptions::default()
        };
        assert_eq!(tiny.stride(), 1);
    }

    #[test]
    fn initial_state_is_stored_at_zero() {
        let sheet = three_faces_sheet().unwrap();
        let history = History::new(&sheet, &HistoryOptions::default()).unwrap();
        assert_eq!(history.time_stamps(), vec![0.0]);
        assert!(history.warnings().is_empty());
    }

    #[test]
    fn auto_stamps_follow_the_last_explicit_one() {
        let sheet = three_faces_sheet().unwrap();
        let mut history = History::new(&sheet, &HistoryOptions::default()).unwrap();
        history.record(&sheet, Some(5.0)).unwrap();
        history.record(&sheet, None).unwrap();
        assert_eq!(history.time_stamps(), vec![0.0, 5.0, 6.0]);
        assert_eq!(history.time(), 6.0);
    }

    #[test]
    fn retrieved_tables_carry_time() {
        let sheet = three_faces_sheet().unwrap();
        let mut history = History::new(&sheet, &HistoryOptions::default()).unwrap();
        history.record(&sheet, None).unwrap();
        let past = history.retrieve(1.0).unwrap();
        let verts = past.table(ElementKind::Vert).unwrap();
        assert_eq!(verts.get(0, "time").unwrap(), Scalar::Float(1.0));
    }

    #[test]
    fn cadence_skips_intermediate_calls() {
        let sheet = three_faces_sheet().unwrap();
        let options = HistoryOptions {
            sample_interval: Some(2.0),
            dt: 1.0,
            ..HistoryOptions::default()
        };
        let mut history = History::new(&sheet, &options).unwrap();
        for _ in 0..4 {
            history.record(&sheet, None).unwrap();
        }
        assert_eq!(history.time_stamps(), vec![0.0, 2.0, 4.0]);
        assert_eq!(history.time(), 4.0);

        let past = history.retrieve(1.0).unwrap();
        let verts = past.table(ElementKind::Vert).unwrap();
        assert_eq!(verts.get(0, "time").unwrap(), Scalar::Float(0.0));
    }

    #[test]
    fn nan_stamp_is_rejected_without_side_effects() {
        let sheet = three_faces_sheet().unwrap();
        let mut history = History::new(&sheet, &HistoryOptions::default()).unwrap();
        assert!(history.record(&sheet, Some(f64::NAN)).is_err());
        assert_eq!(history.len(), 1);
        assert_eq!(history.time(), 0.0);
    }
}
