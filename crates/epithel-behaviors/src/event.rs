//! Events and their identity.
//!
//! An [`Event`] pairs a behavior identifier with the element it acts on and
//! the arguments to pass. Two events are the same for de-duplication
//! purposes when they share behavior and element, whatever their arguments.

use core::fmt;
use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::BehaviorError;

/// Stable identifier of a registered behavior.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BehaviorId(Cow<'static, str>);

impl BehaviorId {
    /// Identifier of the built-in [`wait`](crate::wait) behavior.
    pub const WAIT: Self = Self::from_static("wait");

    /// Create an identifier from a static name.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create an identifier from an owned name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The element an event acts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementRef {
    /// Not element-specific. Logged as `-1`.
    #[default]
    Global,
    /// A specific element, by row label.
    Element(usize),
}

impl ElementRef {
    /// Convert a raw id where any negative value means [`Self::Global`].
    pub fn from_raw(id: i64) -> Self {
        usize::try_from(id).map_or(Self::Global, Self::Element)
    }

    /// Return the element label, if any.
    pub const fn index(self) -> Option<usize> {
        match self {
            Self::Global => None,
            Self::Element(id) => Some(id),
        }
    }
}

impl From<usize> for ElementRef {
    fn from(id: usize) -> Self {
        Self::Element(id)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("-1"),
            Self::Element(id) => write!(f, "{id}"),
        }
    }
}

/// Positional and named arguments forwarded to a behavior.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventArgs {
    positional: Vec<Value>,
    keyword: Map<String, Value>,
}

impl EventArgs {
    /// Create an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a named argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Look an argument up by name first, then by position.
    pub fn lookup(&self, pos: usize, name: &str) -> Option<&Value> {
        self.keyword.get(name).or_else(|| self.positional.get(pos))
    }

    /// Read a non-negative integer argument.
    pub fn u64_arg(&self, behavior: &BehaviorId, pos: usize, name: &str) -> Result<u64, BehaviorError> {
        let value = self.require(behavior, pos, name)?;
        value.as_u64().ok_or_else(|| BehaviorError::InvalidArgument {
            behavior: behavior.clone(),
            name: name.to_owned(),
            reason: format!("expected a non-negative integer, got {value}"),
        })
    }

    /// Read a float argument (integers are accepted).
    pub fn f64_arg(&self, behavior: &BehaviorId, pos: usize, name: &str) -> Result<f64, BehaviorError> {
        let value = self.require(behavior, pos, name)?;
        value.as_f64().ok_or_else(|| BehaviorError::InvalidArgument {
            behavior: behavior.clone(),
            name: name.to_owned(),
            reason: format!("expected a number, got {value}"),
        })
    }

    fn require(&self, behavior: &BehaviorId, pos: usize, name: &str) -> Result<&Value, BehaviorError> {
        self.lookup(pos, name)
            .ok_or_else(|| BehaviorError::MissingArgument {
                behavior: behavior.clone(),
                name: name.to_owned(),
            })
    }
}

/// A deferred behavior invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The behavior to run.
    pub behavior: BehaviorId,
    /// The element it acts on.
    pub element: ElementRef,
    /// Extra arguments.
    pub args: EventArgs,
}

impl Event {
    /// Create a global event with no arguments.
    pub fn new(behavior: BehaviorId) -> Self {
        Self {
            behavior,
            element: ElementRef::Global,
            args: EventArgs::default(),
        }
    }

    /// Bind the event to an element.
    #[must_use]
    pub fn on(mut self, element: impl Into<ElementRef>) -> Self {
        self.element = element.into();
        self
    }

    /// Attach arguments.
    #[must_use]
    pub fn with_args(mut self, args: EventArgs) -> Self {
        self.args = args;
        self
    }

    /// Return the de-duplication key: behavior and element.
    pub fn key(&self) -> (BehaviorId, ElementRef) {
        (self.behavior.clone(), self.element)
    }
}
