//! Segmented history persisted as shard files plus a manifest.
//!
//! Snapshots accumulate in memory until `save_every` of them are held,
//! then they are written to a new shard file next to the manifest and
//! dropped from memory. Shards are ordered and never overlap in time, so
//! retrieval reads at most one shard.
//!
//! Layout for a manifest at `out/history.json`:
//!
//! ```text
//! out/history.json      manifest: binding + shard list
//! out/history_0.json    first shard
//! out/history_1.json    second shard
//! ```

use std::path::{Path, PathBuf};

use epithel_types::{ElementKind, Table, Tissue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::archive::{ArchiveFile, ShardInfo, read_shard, shard_path};
use crate::error::{HistoryError, HistoryWarning};
use crate::history::HistoryOptions;
use crate::records::{RecordLog, Stamper, TissueBinding};
use crate::schema::Snapshot;

/// Manifest file used when no path is given.
pub const DEFAULT_PATH: &str = "history.json";

/// Snapshots per shard when not configured.
pub const DEFAULT_SAVE_EVERY: usize = 10;

/// Where and how often a segmented history flushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Manifest path. `None` uses [`DEFAULT_PATH`] with a warning.
    pub path: Option<PathBuf>,
    /// Snapshots held in memory before a shard is written.
    pub save_every: usize,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            path: None,
            save_every: DEFAULT_SAVE_EVERY,
        }
    }
}

/// History that rolls its snapshots over into shard files.
#[derive(Debug)]
pub struct SegmentedHistory {
    binding: TissueBinding,
    manifest: PathBuf,
    save_every: usize,
    shards: Vec<ShardInfo>,
    /// Snapshots not yet flushed.
    buffer: RecordLog,
    stamper: Stamper,
    warnings: Vec<HistoryWarning>,
}

impl SegmentedHistory {
    /// Create a segmented history bound to `tissue` and store its state at
    /// time 0.
    ///
    /// Without a path, [`DEFAULT_PATH`] is used. If the manifest path
    /// already exists, the first free `<stem><n>.<ext>` sibling is used
    /// instead. Both cases are reported through
    /// [`warnings`](Self::warnings). The manifest is written immediately.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] if the manifest cannot be written.
    pub fn new(
        tissue: &Tissue,
        options: &HistoryOptions,
        segment: &SegmentOptions,
    ) -> Result<Self, HistoryError> {
        let (manifest, mut warnings) = resolve_path(segment.path.as_deref());
        let (binding, bind_warnings) = TissueBinding::bind(tissue, &options.extra_cols);
        warnings.extend(bind_warnings);
        let (snapshot, capture_warnings) = binding.schema().capture(tissue)?;
        warnings.extend(capture_warnings);

        let mut buffer = RecordLog::default();
        buffer.insert(0.0, snapshot);
        let mut history = Self {
            binding,
            manifest,
            save_every: segment.save_every.max(1),
            shards: Vec::new(),
            buffer,
            stamper: Stamper::new(0.0, options.stride()),
            warnings,
        };
        history.write_manifest()?;
        info!(
            manifest = %history.manifest.display(),
            save_every = history.save_every,
            "Segmented history started"
        );
        history.flush_full()?;
        Ok(history)
    }

    /// Reopen a segmented manifest, or split a full archive into shards.
    ///
    /// A manifest is reopened in place. A full archive is re-laid out as a
    /// segmented history whose manifest sits next to it, named
    /// `<stem>_segments.json` (or the first free variant of that name).
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::EmptyHistory`] if nothing is stored, or
    /// the errors of [`ArchiveFile::read`].
    pub fn from_archive(path: &Path) -> Result<Self, HistoryError> {
        match ArchiveFile::read(path)? {
            ArchiveFile::Manifest {
                binding,
                save_every,
                shards,
            } => {
                let last = shards
                    .iter()
                    .rev()
                    .find_map(ShardInfo::last)
                    .ok_or(HistoryError::EmptyHistory)?;
                info!(manifest = %path.display(), shards = shards.len(), "Segmented history reopened");
                Ok(Self {
                    binding,
                    manifest: path.to_path_buf(),
                    save_every: save_every.max(1),
                    shards,
                    buffer: RecordLog::default(),
                    stamper: Stamper::new(last, 1),
                    warnings: Vec::new(),
                })
            }
            ArchiveFile::Full { binding, container } => {
                let log = RecordLog::from_container(container);
                let last = log.last().ok_or(HistoryError::EmptyHistory)?;
                let stem = path.file_stem().map_or_else(
                    || "history".to_owned(),
                    |stem| stem.to_string_lossy().into_owned(),
                );
                let (manifest, warnings) =
                    resolve_path(Some(&path.with_file_name(format!("{stem}_segments.json"))));
                let mut history = Self {
                    binding,
                    manifest,
                    save_every: DEFAULT_SAVE_EVERY,
                    shards: Vec::new(),
                    buffer: log,
                    stamper: Stamper::new(last, 1),
                    warnings,
                };
                history.flush_full()?;
                history.write_manifest()?;
                info!(
                    archive = %path.display(),
                    manifest = %history.manifest.display(),
                    "Archive split into shards"
                );
                Ok(history)
            }
            ArchiveFile::Shard { .. } => Err(HistoryError::CorruptArchive {
                path: path.to_path_buf(),
                reason: "a shard cannot be opened as a history".to_owned(),
            }),
        }
    }

    /// Return the warnings raised at construction.
    pub fn warnings(&self) -> &[HistoryWarning] {
        &self.warnings
    }

    /// Return the manifest path in use.
    pub fn path(&self) -> &Path {
        &self.manifest
    }

    /// Return the flushed shards, in time order.
    pub fn shards(&self) -> &[ShardInfo] {
        &self.shards
    }

    /// Return the tissue binding.
    pub const fn binding(&self) -> &TissueBinding {
        &self.binding
    }

    /// Return the most recently used time stamp.
    pub const fn time(&self) -> f64 {
        self.stamper.time()
    }

    /// Store the tracked columns of `tissue`; see
    /// [`History::record`](crate::History::record).
    ///
    /// A stamp that lives in a flushed shard has that shard rewritten. A
    /// new stamp older than the newest flushed stamp is rejected, which
    /// keeps shards disjoint.
    ///
    /// # Errors
    ///
    /// As [`History::record`](crate::History::record), plus
    /// [`HistoryError::StampBeforeFlushedShard`] and I/O errors from
    /// flushing. A failed call leaves the buffer, the shards and the
    /// current time as they were.
    pub fn record(
        &mut self,
        tissue: &Tissue,
        time_stamp: Option<f64>,
    ) -> Result<Vec<HistoryWarning>, HistoryError> {
        let (snapshot, warnings) = self.binding.schema().capture(tissue)?;
        let stamp = self.stamper.resolve(time_stamp)?;
        if stamp.due {
            match self.flushed_owner(stamp.time)? {
                Some(shard) => self.rewrite_shard(shard, stamp.time, snapshot)?,
                None => {
                    let replaced = self.buffer.insert(stamp.time, snapshot);
                    if let Err(err) = self.flush_full() {
                        self.buffer.restore(stamp.time, replaced);
                        return Err(err);
                    }
                    debug!(time = stamp.time, buffered = self.buffer.len(), "Snapshot recorded");
                }
            }
        }
        self.stamper.commit(stamp);
        Ok(warnings)
    }

    /// Rebuild the tissue as of `time`, loading at most one shard.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NoSnapshotBefore`] if every stamp is later
    /// than `time`, or I/O errors from reading the shard.
    pub fn retrieve(&self, time: f64) -> Result<Tissue, HistoryError> {
        if self.buffer.first().is_some_and(|first| first <= time) {
            if let Some((stamp, snapshot)) = self.buffer.as_of(time) {
                return Ok(self.binding.rebuild(stamp, snapshot));
            }
        }
        let shard = self
            .shards
            .iter()
            .rev()
            .find(|shard| shard.first().is_some_and(|first| first <= time))
            .ok_or(HistoryError::NoSnapshotBefore { time })?;
        let log = read_shard(&shard_path(&self.manifest, &shard.file))?;
        debug!(time, shard = %shard.file, "Shard loaded for retrieval");
        let (stamp, snapshot) = log
            .as_of(time)
            .ok_or(HistoryError::NoSnapshotBefore { time })?;
        Ok(self.binding.rebuild(stamp, snapshot))
    }

    /// Return the unflushed snapshots of one kind, concatenated, with a
    /// `time` column.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Table`] if snapshots cannot be concatenated.
    pub fn dataset(&self, kind: ElementKind) -> Result<Table, HistoryError> {
        Ok(self.buffer.dataset(kind)?)
    }

    /// Return every stored stamp, flushed or not, ascending.
    pub fn time_stamps(&self) -> Vec<f64> {
        self.shards
            .iter()
            .flat_map(|shard| shard.stamps.iter().copied())
            .chain(self.buffer.stamps())
            .collect()
    }

    /// Write the unflushed snapshots to a new shard and update the
    /// manifest. Does nothing when nothing is buffered.
    /// On failure the snapshots stay buffered.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] or [`HistoryError::Serialization`].
    pub fn flush(&mut self) -> Result<(), HistoryError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let shard_count = self.shards.len();
        let log = core::mem::take(&mut self.buffer);
        let result = self
            .write_shard(&log)
            .and_then(|()| self.write_manifest());
        if result.is_err() {
            self.shards.truncate(shard_count);
            self.buffer = log;
        }
        result
    }

    /// Flush and return the manifest path.
    ///
    /// # Errors
    ///
    /// As [`flush`](Self::flush).
    pub fn close(mut self) -> Result<PathBuf, HistoryError> {
        self.flush()?;
        info!(manifest = %self.manifest.display(), shards = self.shards.len(), "Segmented history closed");
        Ok(self.manifest)
    }

    /// Write every snapshot, flushed or not, to one full archive.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Io`] or [`HistoryError::Serialization`].
    pub fn to_archive(&self, path: &Path) -> Result<(), HistoryError> {
        let mut log = RecordLog::default();
        for shard in &self.shards {
            log.merge(read_shard(&shard_path(&self.manifest, &shard.file))?);
        }
        log.merge(self.buffer.clone());
        ArchiveFile::Full {
            binding: self.binding.clone(),
            container: log.to_container(),
        }
        .write(path)?;
        info!(path = %path.display(), snapshots = log.len(), "History archived");
        Ok(())
    }

    /// Flush complete shards while the buffer holds `save_every` snapshots.
    ///
    /// On failure the shard list and the buffer are put back as they were.
    fn flush_full(&mut self) -> Result<(), HistoryError> {
        let shard_count = self.shards.len();
        let mut flushed = RecordLog::default();
        let result = self.flush_heads(&mut flushed);
        if result.is_err() {
            self.shards.truncate(shard_count);
            self.buffer.merge(flushed);
        }
        result
    }

    /// Write full shards, moving their snapshots into `flushed`.
    fn flush_heads(&mut self, flushed: &mut RecordLog) -> Result<(), HistoryError> {
        let mut wrote = false;
        while self.buffer.len() >= self.save_every {
            let head = self.buffer.split_first(self.save_every);
            let written = self.write_shard(&head);
            flushed.merge(head);
            written?;
            wrote = true;
        }
        if wrote {
            self.write_manifest()?;
        }
        Ok(())
    }

    /// Return the index of the flushed shard holding `time`, or `None` if
    /// `time` is newer than everything flushed.
    fn flushed_owner(&self, time: f64) -> Result<Option<usize>, HistoryError> {
        let Some(flushed) = self.shards.last().and_then(ShardInfo::last) else {
            return Ok(None);
        };
        if time > flushed {
            return Ok(None);
        }
        self.shards
            .iter()
            .position(|shard| shard.stamps.contains(&time))
            .map(Some)
            .ok_or(HistoryError::StampBeforeFlushedShard { time, flushed })
    }

    fn rewrite_shard(&mut self, index: usize, time: f64, snapshot: Snapshot) -> Result<(), HistoryError> {
        let Some(shard) = self.shards.get(index) else {
            return Ok(());
        };
        let path = shard_path(&self.manifest, &shard.file);
        let mut log = read_shard(&path)?;
        log.insert(time, snapshot);
        ArchiveFile::Shard {
            container: log.to_container(),
        }
        .write(&path)?;
        info!(time, shard = index, "Flushed snapshot replaced");
        Ok(())
    }

    fn write_shard(&mut self, log: &RecordLog) -> Result<(), HistoryError> {
        let index = self.shards.len();
        let file = shard_file_name(&self.manifest, index);
        let stamps: Vec<f64> = log.stamps().collect();
        ArchiveFile::Shard {
            container: log.to_container(),
        }
        .write(&shard_path(&self.manifest, &file))?;
        info!(shard = index, snapshots = stamps.len(), "Shard flushed");
        self.shards.push(ShardInfo { file, stamps });
        Ok(())
    }

    fn write_manifest(&self) -> Result<(), HistoryError> {
        ArchiveFile::Manifest {
            binding: self.binding.clone(),
            save_every: self.save_every,
            shards: self.shards.clone(),
        }
        .write(&self.manifest)
    }
}

/// Pick the manifest path, warning about defaults and existing files.
fn resolve_path(requested: Option<&Path>) -> (PathBuf, Vec<HistoryWarning>) {
    let mut warnings = Vec::new();
    let requested = requested.map_or_else(
        || {
            let path = PathBuf::from(DEFAULT_PATH);
            warnings.push(HistoryWarning::DefaultPath { path: path.clone() }.emit());
            path
        },
        Path::to_path_buf,
    );
    if !requested.exists() {
        return (requested, warnings);
    }
    let used = free_sibling(&requested);
    warnings.push(
        HistoryWarning::ExistingPath {
            requested,
            used: used.clone(),
        }
        .emit(),
    );
    (used, warnings)
}

/// First `<stem><n>.<ext>` next to `path` that does not exist.
fn free_sibling(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    (0..=u32::MAX)
        .map(|n| path.with_file_name(format!("{stem}{n}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

fn shard_file_name(manifest: &Path, index: usize) -> String {
    let stem = manifest
        .file_stem()
        .map_or_else(|| "history".to_owned(), |stem| stem.to_string_lossy().into_owned());
    format!("{stem}_{index}.json")
}
