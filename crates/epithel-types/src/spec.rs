//! Data-column specifications.
//!
//! A [`TissueSpec`] lists, per element kind, the columns a tissue is
//! expected to carry together with their default values. Specs are stored
//! as nested JSON objects:
//!
//! ```json
//! { "vert": { "x": 0.0, "y": 0.0 }, "face": { "area": 1.0, "num_sides": 6 } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::kind::ElementKind;
use crate::table::Scalar;

/// Errors that can occur when loading or saving a spec file.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// Failed to read or write the spec file.
    #[error("spec file I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse or serialize JSON.
    #[error("spec JSON error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// Refused to overwrite an existing file.
    #[error("{} exists and overwriting is prevented", path.display())]
    AlreadyExists {
        /// The existing file.
        path: PathBuf,
    },
}

/// Default column values per element kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TissueSpec(BTreeMap<ElementKind, BTreeMap<String, Scalar>>);

impl TissueSpec {
    /// Create an empty spec.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Default spec for a 2D sheet living in the `x`, `y` plane.
    pub fn planar() -> Self {
        Self::new()
            .with_column(ElementKind::Vert, "x", 0.0)
            .with_column(ElementKind::Vert, "y", 0.0)
            .with_column(ElementKind::Vert, "is_active", 1_i64)
            .with_column(ElementKind::Edge, "srce", 0_i64)
            .with_column(ElementKind::Edge, "trgt", 0_i64)
            .with_column(ElementKind::Edge, "face", 0_i64)
            .with_column(ElementKind::Edge, "dx", 0.0)
            .with_column(ElementKind::Edge, "dy", 0.0)
            .with_column(ElementKind::Edge, "length", 0.0)
            .with_column(ElementKind::Face, "x", 0.0)
            .with_column(ElementKind::Face, "y", 0.0)
            .with_column(ElementKind::Face, "area", 0.0)
            .with_column(ElementKind::Face, "perimeter", 0.0)
            .with_column(ElementKind::Face, "num_sides", 0_i64)
            .with_column(ElementKind::Face, "is_alive", 1_i64)
    }

    /// Add a column default, builder style.
    #[must_use]
    pub fn with_column(
        mut self,
        kind: ElementKind,
        name: impl Into<String>,
        default: impl Into<Scalar>,
    ) -> Self {
        self.insert(kind, name, default);
        self
    }

    /// Add or replace a column default, returning the previous one.
    pub fn insert(
        &mut self,
        kind: ElementKind,
        name: impl Into<String>,
        default: impl Into<Scalar>,
    ) -> Option<Scalar> {
        self.0
            .entry(kind)
            .or_default()
            .insert(name.into(), default.into())
    }

    /// Return the column defaults for one kind.
    pub fn columns(&self, kind: ElementKind) -> Option<&BTreeMap<String, Scalar>> {
        self.0.get(&kind)
    }

    /// Iterate over `(kind, column defaults)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ElementKind, &BTreeMap<String, Scalar>)> {
        self.0.iter().map(|(kind, cols)| (*kind, cols))
    }

    /// Load a spec from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let contents = fs::read_to_string(path)?;
        let spec = serde_json::from_str(&contents)?;
        info!(path = %path.display(), "Loaded tissue spec");
        Ok(spec)
    }

    /// Save this spec as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::AlreadyExists`] if `path` exists and `overwrite`
    /// is `false`.
    pub fn save(&self, path: &Path, overwrite: bool) -> Result<(), SpecError> {
        if !overwrite && path.is_file() {
            return Err(SpecError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
