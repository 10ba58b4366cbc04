//! Registry of behaviors keyed by stable identifiers.
//!
//! Events carry a [`BehaviorId`] rather than a function reference; the
//! registry resolves the identifier at execution time. Renaming a Rust
//! function therefore never changes event identity.

use core::fmt;
use std::collections::HashMap;

use crate::error::BehaviorError;
use crate::event::{BehaviorId, ElementRef, EventArgs};
use crate::manager::EventManager;
use crate::wait::wait;

/// Signature of a behavior.
///
/// A behavior receives the tissue, the scheduler (so it can queue events
/// for the next tick), the element it was scheduled on, and its arguments.
pub type BehaviorFn<T> =
    fn(&mut T, &mut EventManager<T>, ElementRef, &EventArgs) -> Result<(), BehaviorError>;

/// Maps behavior identifiers to behavior functions.
pub struct BehaviorRegistry<T> {
    behaviors: HashMap<BehaviorId, BehaviorFn<T>>,
}

impl<T> BehaviorRegistry<T> {
    /// Create a registry holding only the built-in `wait` behavior.
    pub fn new() -> Self {
        let mut behaviors: HashMap<BehaviorId, BehaviorFn<T>> = HashMap::new();
        behaviors.insert(BehaviorId::WAIT, wait::<T>);
        Self { behaviors }
    }

    /// Create a registry with no behaviors at all.
    pub fn empty() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// Register a behavior.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError::DuplicateBehavior`] if the identifier is
    /// already taken.
    pub fn register(&mut self, id: BehaviorId, behavior: BehaviorFn<T>) -> Result<(), BehaviorError> {
        if self.behaviors.contains_key(&id) {
            return Err(BehaviorError::DuplicateBehavior(id));
        }
        self.behaviors.insert(id, behavior);
        Ok(())
    }

    /// Register a behavior, builder style.
    pub fn with(mut self, id: BehaviorId, behavior: BehaviorFn<T>) -> Result<Self, BehaviorError> {
        self.register(id, behavior)?;
        Ok(self)
    }

    /// Resolve an identifier.
    pub fn get(&self, id: &BehaviorId) -> Option<BehaviorFn<T>> {
        self.behaviors.get(id).copied()
    }

    /// Return `true` if the identifier is registered.
    pub fn contains(&self, id: &BehaviorId) -> bool {
        self.behaviors.contains_key(id)
    }

    /// Return the number of registered behaviors.
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    /// Return `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Return the registered identifiers in sorted order.
    pub fn ids(&self) -> Vec<&BehaviorId> {
        let mut ids: Vec<_> = self.behaviors.keys().collect();
        ids.sort();
        ids
    }
}

impl<T> Default for BehaviorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BehaviorRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("behaviors", &self.ids())
            .finish()
    }
}
