//! Stored snapshots, the tissue binding, and time stamping.
//!
//! Both history variants keep their in-memory snapshots in a [`RecordLog`]:
//! an ordered map from time stamp to snapshot. Recording appends one entry
//! (or replaces the entry of an existing stamp), so the cost of a record
//! does not grow with the length of the history.

use std::collections::BTreeMap;

use epithel_types::{ElementKind, Scalar, Table, TableError, Tissue, TissueSpec};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveContainer;
use crate::error::{HistoryError, HistoryWarning};
use crate::schema::{ExtraColumns, Snapshot, TrackedSchema};

/// Name of the column holding the time stamp in retrieved tables.
pub const TIME_COLUMN: &str = "time";

/// Identity of the tissue a history is bound to.
///
/// Holds everything needed to rebuild a tissue from stored tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TissueBinding {
    identifier: String,
    coords: Vec<String>,
    specs: TissueSpec,
    schema: TrackedSchema,
}

impl TissueBinding {
    /// Bind to a live tissue, resolving the tracked schema.
    pub fn bind(tissue: &Tissue, extra_cols: &ExtraColumns) -> (Self, Vec<HistoryWarning>) {
        let (schema, warnings) = TrackedSchema::resolve(tissue, extra_cols);
        let binding = Self {
            identifier: tissue.identifier().to_owned(),
            coords: tissue.coords().to_vec(),
            specs: tissue.specs().clone(),
            schema,
        };
        (binding, warnings)
    }

    /// Return the tissue identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Return the coordinate column names.
    pub fn coords(&self) -> &[String] {
        &self.coords
    }

    /// Return the tracked schema.
    pub const fn schema(&self) -> &TrackedSchema {
        &self.schema
    }

    /// Build an independent tissue from a stored snapshot.
    pub(crate) fn rebuild(&self, time: f64, snapshot: &Snapshot) -> Tissue {
        let datasets = snapshot
            .iter()
            .map(|(&kind, table)| (kind, stamped(table, time)))
            .collect();
        Tissue::new(
            self.identifier.clone(),
            datasets,
            self.specs.clone(),
            self.coords.iter().cloned(),
        )
    }
}

/// Copy `table` with a `time` column filled with `time`.
pub(crate) fn stamped(table: &Table, time: f64) -> Table {
    let mut table = table.clone();
    table.fill_column(TIME_COLUMN, &Scalar::Float(time));
    table
}

/// Snapshots keyed by time stamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RecordLog {
    records: BTreeMap<OrderedFloat<f64>, Snapshot>,
}

impl RecordLog {
    /// Store a snapshot, replacing any snapshot with the same stamp.
    pub(crate) fn insert(&mut self, time: f64, snapshot: Snapshot) -> Option<Snapshot> {
        self.records.insert(OrderedFloat(time), snapshot)
    }

    /// Return the latest snapshot stamped at or before `time`.
    pub(crate) fn as_of(&self, time: f64) -> Option<(f64, &Snapshot)> {
        self.records
            .range(..=OrderedFloat(time))
            .next_back()
            .map(|(stamp, snapshot)| (stamp.0, snapshot))
    }

    pub(crate) fn stamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.keys().map(|stamp| stamp.0)
    }

    pub(crate) fn first(&self) -> Option<f64> {
        self.records.keys().next().map(|stamp| stamp.0)
    }

    pub(crate) fn last(&self) -> Option<f64> {
        self.records.keys().next_back().map(|stamp| stamp.0)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove the snapshot stamped `time`.
    pub(crate) fn remove(&mut self, time: f64) -> Option<Snapshot> {
        self.records.remove(&OrderedFloat(time))
    }

    /// Put back what an [`insert`](Self::insert) at `time` replaced.
    pub(crate) fn restore(&mut self, time: f64, replaced: Option<Snapshot>) {
        match replaced {
            Some(snapshot) => {
                self.insert(time, snapshot);
            }
            None => {
                self.remove(time);
            }
        }
    }

    /// Move every snapshot of `other` into this log.
    pub(crate) fn merge(&mut self, other: Self) {
        self.records.extend(other.records);
    }

    /// Split off the first `count` snapshots.
    pub(crate) fn split_first(&mut self, count: usize) -> Self {
        let Some(&pivot) = self.records.keys().nth(count) else {
            return core::mem::take(self);
        };
        let rest = self.records.split_off(&pivot);
        Self {
            records: core::mem::replace(&mut self.records, rest),
        }
    }

    /// Concatenate every snapshot of one kind, with a `time` column.
    pub(crate) fn dataset(&self, kind: ElementKind) -> Result<Table, TableError> {
        let mut accumulated = Table::default();
        for (stamp, snapshot) in &self.records {
            if let Some(table) = snapshot.get(&kind) {
                accumulated.append(&stamped(table, stamp.0))?;
            }
        }
        Ok(accumulated)
    }

    /// Lay the log out kind first, then stamp.
    pub(crate) fn to_container(&self) -> ArchiveContainer {
        let mut container = ArchiveContainer::default();
        for (stamp, snapshot) in &self.records {
            for (&kind, table) in snapshot {
                container.put(kind, stamp.0, table.clone());
            }
        }
        container
    }

    /// Regroup a container by stamp.
    pub(crate) fn from_container(container: ArchiveContainer) -> Self {
        let mut log = Self::default();
        for (kind, time, table) in container.into_entries() {
            log.records
                .entry(OrderedFloat(time))
                .or_default()
                .insert(kind, table);
        }
        log
    }
}

/// Time stamp chosen for one `record` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Stamp {
    /// The stamp.
    pub(crate) time: f64,
    /// Whether this call is stored or skipped by the sampling cadence.
    pub(crate) due: bool,
}

/// Tracks the current time and the sampling cadence.
///
/// Auto stamps continue from the last used stamp plus one. With a stride
/// of `n`, only every `n`-th call is stored. The snapshot stored when a
/// history is created counts as call 0, so stored stamps stay `n` apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Stamper {
    time: f64,
    calls: u64,
    stride: u64,
}

impl Stamper {
    pub(crate) fn new(time: f64, stride: u64) -> Self {
        Self {
            time,
            calls: 1,
            stride: stride.max(1),
        }
    }

    pub(crate) const fn time(&self) -> f64 {
        self.time
    }

    /// Pick the stamp for the next call without committing it.
    pub(crate) fn resolve(&self, requested: Option<f64>) -> Result<Stamp, HistoryError> {
        let time = requested.unwrap_or(self.time + 1.0);
        if !time.is_finite() {
            return Err(HistoryError::InvalidTimeStamp { time });
        }
        let due = self.calls.checked_rem(self.stride).is_none_or(|rem| rem == 0);
        Ok(Stamp { time, due })
    }

    pub(crate) const fn commit(&mut self, stamp: Stamp) {
        self.time = stamp.time;
        self.calls = self.calls.wrapping_add(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn snapshot(rows: usize) -> Snapshot {
        Snapshot::from([(ElementKind::Vert, Table::with_len(rows))])
    }

    #[test]
    fn as_of_picks_latest_earlier_stamp() {
        let mut log = RecordLog::default();
        log.insert(0.0, snapshot(1));
        log.insert(2.0, snapshot(2));
        assert_eq!(log.as_of(1.0).unwrap().0, 0.0);
        assert_eq!(log.as_of(2.0).unwrap().0, 2.0);
        assert_eq!(log.as_of(99.0).unwrap().0, 2.0);
        assert!(log.as_of(-1.0).is_none());
    }

    #[test]
    fn split_first_keeps_the_tail() {
        let mut log = RecordLog::default();
        for t in 0..5_u8 {
            log.insert(f64::from(t), snapshot(1));
        }
        let head = log.split_first(2);
        assert_eq!(head.stamps().collect::<Vec<_>>(), vec![0.0, 1.0]);
        assert_eq!(log.stamps().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        let all = log.split_first(10);
        assert_eq!(all.len(), 3);
        assert!(log.is_empty());
    }

    #[test]
    fn stamper_cadence_skips_calls_but_advances_time() {
        let mut stamper = Stamper::new(0.0, 2);
        let mut stored = Vec::new();
        for _ in 0..4 {
            let stamp = stamper.resolve(None).unwrap();
            if stamp.due {
                stored.push(stamp.time);
            }
            stamper.commit(stamp);
        }
        assert_eq!(stored, vec![2.0, 4.0]);
        assert_eq!(stamper.time(), 4.0);
    }

    #[test]
    fn restore_undoes_an_insert() {
        let mut log = RecordLog::default();
        log.insert(0.0, snapshot(1));

        let replaced = log.insert(1.0, snapshot(2));
        log.restore(1.0, replaced);
        assert_eq!(log.stamps().collect::<Vec<_>>(), vec![0.0]);

        let replaced = log.insert(0.0, snapshot(5));
        log.restore(0.0, replaced);
        assert_eq!(log.as_of(0.0).unwrap().1, &snapshot(1));
    }

    #[test]
    fn stamper_rejects_nan() {
        let stamper = Stamper::new(0.0, 1);
        assert!(matches!(
            stamper.resolve(Some(f64::NAN)),
            Err(HistoryError::InvalidTimeStamp { .. })
        ));
    }
}
