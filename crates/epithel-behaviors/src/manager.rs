//! The two-queue event scheduler.
//!
//! # Tick protocol
//!
//! 1. [`EventManager::execute`] drains `current` front to back. Behaviors
//!    may queue new events through [`EventManager::append`]; those always
//!    land in `next`, never in `current`, so nothing runs twice in a tick.
//! 2. [`EventManager::update`] shuffles `next`, promotes it to `current`,
//!    and leaves `next` empty.
//!
//! # Invariants
//!
//! - `next` never holds two events with the same behavior and element.
//! - After `update`, `next` is empty.
//! - The shuffle is driven by the manager's own rng, so a seeded manager
//!   replays the same execution order.

use core::fmt;
use core::mem;
use std::collections::{HashSet, VecDeque};
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::error::BehaviorError;
use crate::event::{BehaviorId, ElementRef, Event, EventArgs};
use crate::registry::BehaviorRegistry;
use crate::sink::{EventSink, FileSink};

/// Schedules behaviors on the elements of a tissue of type `T`.
pub struct EventManager<T> {
    /// Element kind the scheduler works on (used in log headers).
    element: String,
    /// Events due this tick.
    current: VecDeque<Event>,
    /// Events queued for the next tick.
    next: VecDeque<Event>,
    /// De-duplication keys of everything in `next`.
    queued: HashSet<(BehaviorId, ElementRef)>,
    registry: BehaviorRegistry<T>,
    /// Number of completed ticks.
    clock: u64,
    rng: StdRng,
    sink: Option<Box<dyn EventSink>>,
}

impl<T> EventManager<T> {
    /// Create a manager for `element` (e.g. `"face"`).
    ///
    /// `current` starts with a single global `wait(1)` event so that the
    /// first tick is never empty; `next` starts empty.
    pub fn new(element: impl Into<String>, registry: BehaviorRegistry<T>) -> Self {
        let mut current = VecDeque::new();
        current.push_back(Event::new(BehaviorId::WAIT).with_args(EventArgs::new().arg(1)));
        Self {
            element: element.into(),
            current,
            next: VecDeque::new(),
            queued: HashSet::new(),
            registry,
            clock: 0,
            rng: StdRng::from_os_rng(),
            sink: None,
        }
    }

    /// Replace the rng with one seeded from `seed`.
    #[must_use]
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Attach a per-event log sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach a [`FileSink`] writing to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError::Sink`] if the file cannot be opened.
    pub fn with_logfile(self, path: &Path) -> Result<Self, BehaviorError> {
        let sink = FileSink::create(path, &self.element)?;
        Ok(self.with_sink(Box::new(sink)))
    }

    /// Return the element kind label.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Return the number of completed ticks.
    pub const fn clock(&self) -> u64 {
        self.clock
    }

    /// Advance the clock by one tick. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError::ClockOverflow`] past `u64::MAX`.
    pub fn advance_clock(&mut self) -> Result<u64, BehaviorError> {
        self.clock = self.clock.checked_add(1).ok_or(BehaviorError::ClockOverflow)?;
        Ok(self.clock)
    }

    /// Return the events due this tick, in execution order.
    pub const fn current_events(&self) -> &VecDeque<Event> {
        &self.current
    }

    /// Return the events queued for the next tick.
    pub const fn next_events(&self) -> &VecDeque<Event> {
        &self.next
    }

    /// Return `true` when both queues are empty.
    pub fn is_idle(&self) -> bool {
        self.current.is_empty() && self.next.is_empty()
    }

    /// Return the behavior registry.
    pub const fn registry(&self) -> &BehaviorRegistry<T> {
        &self.registry
    }

    /// Queue `event` for the next tick.
    ///
    /// Returns `false` (and drops the event) when an event with the same
    /// behavior and element is already queued, whatever its arguments.
    pub fn append(&mut self, event: Event) -> bool {
        if !self.queued.insert(event.key()) {
            debug!(
                behavior = %event.behavior,
                element_id = %event.element,
                "Duplicate event dropped"
            );
            return false;
        }
        self.next.push_back(event);
        true
    }

    /// Queue several events. Returns how many were accepted.
    pub fn extend<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = Event>,
    {
        let mut accepted: usize = 0;
        for event in events {
            if self.append(event) {
                accepted = accepted.saturating_add(1);
            }
        }
        accepted
    }

    /// Keep only the queued events matching `keep`.
    pub fn retain_next<F>(&mut self, keep: F)
    where
        F: FnMut(&Event) -> bool,
    {
        self.next.retain(keep);
        self.queued = self.next.iter().map(Event::key).collect();
    }

    /// Run every event in `current`, in order. Returns how many ran.
    ///
    /// Events queued by behaviors go to `next`. Each execution is logged
    /// as `tick, element id, behavior`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing event and returns its error. That event
    /// is consumed; the remaining events stay in `current` until the next
    /// `execute` runs them or [`update`](Self::update) discards them with
    /// a warning.
    pub fn execute(&mut self, tissue: &mut T) -> Result<usize, BehaviorError> {
        let mut executed: usize = 0;
        while let Some(event) = self.current.pop_front() {
            let behavior = self
                .registry
                .get(&event.behavior)
                .ok_or_else(|| BehaviorError::UnknownBehavior(event.behavior.clone()))?;

            info!(
                tick = self.clock,
                element_id = %event.element,
                behavior = %event.behavior,
                "Executing event"
            );
            if let Some(sink) = self.sink.as_mut() {
                sink.log_event(self.clock, event.element, &event.behavior)?;
            }

            behavior(tissue, self, event.element, &event.args)?;
            executed = executed.saturating_add(1);
        }
        Ok(executed)
    }

    /// Promote `next` to `current` in a random order and empty `next`.
    ///
    /// Events still in `current` (left behind by a failed `execute`) are
    /// discarded.
    pub fn update(&mut self) {
        if !self.current.is_empty() {
            warn!(
                tick = self.clock,
                dropped = self.current.len(),
                "Discarding unexecuted events"
            );
        }
        self.next.make_contiguous().shuffle(&mut self.rng);
        self.current = mem::take(&mut self.next);
        self.queued.clear();
        debug!(tick = self.clock, due = self.current.len(), "Queues swapped");
    }
}

impl<T> fmt::Debug for EventManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("element", &self.element)
            .field("clock", &self.clock)
            .field("current", &self.current)
            .field("next", &self.next)
            .field("registry", &self.registry)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}
