//! On-disk archive format.
//!
//! An archive is one JSON file. Three layouts share the same envelope,
//! distinguished by the `layout` tag:
//!
//! - `full` -- a whole history: the tissue binding plus every table.
//! - `manifest` -- a segmented history: the tissue binding plus the list of
//!   shard files, in time order.
//! - `shard` -- one segment of a segmented history.
//!
//! Tables are keyed by element kind first, then by time stamp. Files are
//! written to a `.partial` sibling and renamed into place, so a reader
//! never observes a half-written file.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use epithel_types::{ElementKind, Table};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HistoryError;
use crate::records::{RecordLog, TissueBinding};

/// Tables keyed by element kind, then by time stamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContainerRepr", into = "ContainerRepr")]
pub struct ArchiveContainer {
    datasets: BTreeMap<ElementKind, BTreeMap<OrderedFloat<f64>, Table>>,
}

impl ArchiveContainer {
    /// Store the table of one kind at one stamp, replacing any previous one.
    pub fn put(&mut self, kind: ElementKind, time: f64, table: Table) {
        self.datasets
            .entry(kind)
            .or_default()
            .insert(OrderedFloat(time), table);
    }

    /// Read the table of one kind at one stamp.
    pub fn get(&self, kind: ElementKind, time: f64) -> Option<&Table> {
        self.datasets.get(&kind)?.get(&OrderedFloat(time))
    }

    /// Return the element kinds present.
    pub fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        self.datasets.keys().copied()
    }

    /// Return every stamp present for any kind, ascending.
    pub fn stamps(&self) -> Vec<f64> {
        self.datasets
            .values()
            .flat_map(BTreeMap::keys)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|stamp| stamp.0)
            .collect()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (ElementKind, f64, Table)> {
        self.datasets.into_iter().flat_map(|(kind, tables)| {
            tables
                .into_iter()
                .map(move |(stamp, table)| (kind, stamp.0, table))
        })
    }
}

#[derive(Serialize, Deserialize)]
struct ContainerRepr {
    datasets: BTreeMap<ElementKind, Vec<StampedTable>>,
}

#[derive(Serialize, Deserialize)]
struct StampedTable {
    time: f64,
    table: Table,
}

impl From<ContainerRepr> for ArchiveContainer {
    fn from(repr: ContainerRepr) -> Self {
        let datasets = repr
            .datasets
            .into_iter()
            .map(|(kind, tables)| {
                let tables = tables
                    .into_iter()
                    .map(|entry| (OrderedFloat(entry.time), entry.table))
                    .collect();
                (kind, tables)
            })
            .collect();
        Self { datasets }
    }
}

impl From<ArchiveContainer> for ContainerRepr {
    fn from(container: ArchiveContainer) -> Self {
        let datasets = container
            .datasets
            .into_iter()
            .map(|(kind, tables)| {
                let tables = tables
                    .into_iter()
                    .map(|(stamp, table)| StampedTable {
                        time: stamp.0,
                        table,
                    })
                    .collect();
                (kind, tables)
            })
            .collect();
        Self { datasets }
    }
}

/// Location and stamps of one flushed shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardInfo {
    /// File name, relative to the manifest's directory.
    pub file: String,
    /// Stamps stored in the shard, ascending.
    pub stamps: Vec<f64>,
}

impl ShardInfo {
    /// Return the oldest stamp in the shard.
    pub fn first(&self) -> Option<f64> {
        self.stamps.first().copied()
    }

    /// Return the newest stamp in the shard.
    pub fn last(&self) -> Option<f64> {
        self.stamps.last().copied()
    }
}

/// One archive file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum ArchiveFile {
    /// A complete history in one file.
    Full {
        /// The tissue the history is bound to.
        binding: TissueBinding,
        /// Every stored table.
        container: ArchiveContainer,
    },
    /// Index of a segmented history.
    Manifest {
        /// The tissue the history is bound to.
        binding: TissueBinding,
        /// Number of snapshots per shard.
        save_every: usize,
        /// Shards in time order.
        shards: Vec<ShardInfo>,
    },
    /// One segment of a segmented history.
    Shard {
        /// The tables of this segment.
        container: ArchiveContainer,
    },
}

impl ArchiveFile {
    /// Read an archive file.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] or [`HistoryError::Serialization`].
    pub fn read(path: &Path) -> Result<Self, HistoryError> {
        let reader = BufReader::new(File::open(path)?);
        let archive = serde_json::from_reader(reader)?;
        debug!(path = %path.display(), "Archive read");
        Ok(archive)
    }

    /// Write the archive file, atomically replacing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] or [`HistoryError::Serialization`].
    pub fn write(&self, path: &Path) -> Result<(), HistoryError> {
        let mut partial = OsString::from(path.as_os_str());
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        let mut writer = BufWriter::new(File::create(&partial)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&partial, path)?;
        debug!(path = %path.display(), "Archive written");
        Ok(())
    }
}

/// Load every record of a full archive or of a segmented manifest.
pub(crate) fn load_records(path: &Path) -> Result<(TissueBinding, RecordLog), HistoryError> {
    match ArchiveFile::read(path)? {
        ArchiveFile::Full { binding, container } => {
            Ok((binding, RecordLog::from_container(container)))
        }
        ArchiveFile::Manifest {
            binding, shards, ..
        } => {
            let mut log = RecordLog::default();
            for shard in &shards {
                log.merge(read_shard(&shard_path(path, &shard.file))?);
            }
            Ok((binding, log))
        }
        ArchiveFile::Shard { .. } => Err(HistoryError::CorruptArchive {
            path: path.to_path_buf(),
            reason: "a shard cannot be opened as a history".to_owned(),
        }),
    }
}

/// Read the records of one shard file.
pub(crate) fn read_shard(path: &Path) -> Result<RecordLog, HistoryError> {
    match ArchiveFile::read(path)? {
        ArchiveFile::Shard { container } => Ok(RecordLog::from_container(container)),
        ArchiveFile::Full { .. } | ArchiveFile::Manifest { .. } => {
            Err(HistoryError::CorruptArchive {
                path: path.to_path_buf(),
                reason: "expected a shard".to_owned(),
            })
        }
    }
}

/// Resolve a shard file name against its manifest's directory.
pub(crate) fn shard_path(manifest: &Path, file: &str) -> PathBuf {
    manifest
        .parent()
        .map_or_else(|| PathBuf::from(file), |dir| dir.join(file))
}
