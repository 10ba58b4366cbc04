//! Per-event log sinks.
//!
//! Every executed event is logged through `tracing`. A sink attached to an
//! [`EventManager`](crate::EventManager) additionally receives one line per
//! event in the form `tick, element id, behavior`.

use core::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::info;

use crate::event::{BehaviorId, ElementRef};

/// Receives one record per executed event.
pub trait EventSink: fmt::Debug {
    /// Record that `behavior` ran on `element` at `tick`.
    fn log_event(&mut self, tick: u64, element: ElementRef, behavior: &BehaviorId) -> io::Result<()>;
}

/// Appends event lines to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl FileSink {
    /// Open (or create) `path` in append mode and write the header.
    ///
    /// The header names the element kind the scheduler works on:
    ///
    /// ```text
    /// # Started logging at 2026-01-01T00:00:00+00:00
    /// time, face index, event
    /// ```
    pub fn create(path: &Path, element: &str) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = LineWriter::new(file);
        writeln!(writer, "# Started logging at {}", Utc::now().to_rfc3339())?;
        writeln!(writer, "time, {element} index, event")?;
        info!(path = %path.display(), element, "Event log attached");
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Return the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileSink {
    fn log_event(&mut self, tick: u64, element: ElementRef, behavior: &BehaviorId) -> io::Result<()> {
        writeln!(self.writer, "{tick}, {element}, {behavior}")
    }
}

/// Buffers event lines in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of the buffered lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for MemorySink {
    fn log_event(&mut self, tick: u64, element: ElementRef, behavior: &BehaviorId) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{tick}, {element}, {behavior}"));
        Ok(())
    }
}
