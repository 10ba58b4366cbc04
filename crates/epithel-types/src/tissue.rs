//! The tissue object: one table per element kind.

use std::collections::BTreeMap;

use crate::kind::ElementKind;
use crate::spec::TissueSpec;
use crate::table::{Table, TableError};

/// An epithelium described by its per-kind element tables.
///
/// The tissue owns its tables outright; cloning a tissue yields a fully
/// independent copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Tissue {
    /// Human-readable identifier.
    identifier: String,
    /// Element tables keyed by kind.
    datasets: BTreeMap<ElementKind, Table>,
    /// Column defaults this tissue was built with.
    specs: TissueSpec,
    /// Names of the coordinate columns (e.g. `["x", "y"]`).
    coords: Vec<String>,
}

impl Tissue {
    /// Build a tissue from its tables, spec and coordinate axes.
    pub fn new<S: Into<String>>(
        identifier: impl Into<String>,
        datasets: BTreeMap<ElementKind, Table>,
        specs: TissueSpec,
        coords: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            datasets,
            specs,
            coords: coords.into_iter().map(Into::into).collect(),
        }
    }

    /// Return the tissue identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Return all element tables.
    pub const fn datasets(&self) -> &BTreeMap<ElementKind, Table> {
        &self.datasets
    }

    /// Return the table of one kind.
    pub fn dataset(&self, kind: ElementKind) -> Option<&Table> {
        self.datasets.get(&kind)
    }

    /// Borrow a table that must exist.
    pub fn table(&self, kind: ElementKind) -> Result<&Table, TableError> {
        self.datasets
            .get(&kind)
            .ok_or(TableError::MissingTable(kind))
    }

    /// Borrow a table that must exist, mutably.
    pub fn table_mut(&mut self, kind: ElementKind) -> Result<&mut Table, TableError> {
        self.datasets
            .get_mut(&kind)
            .ok_or(TableError::MissingTable(kind))
    }

    /// Return `true` if the tissue has a table of this kind.
    pub fn has_kind(&self, kind: ElementKind) -> bool {
        self.datasets.contains_key(&kind)
    }

    /// Iterate over the kinds present in this tissue.
    pub fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        self.datasets.keys().copied()
    }

    /// Return the number of rows of one kind (0 if absent).
    pub fn row_count(&self, kind: ElementKind) -> usize {
        self.datasets.get(&kind).map_or(0, Table::len)
    }

    /// Number of vertices.
    pub fn vert_count(&self) -> usize {
        self.row_count(ElementKind::Vert)
    }

    /// Number of half-edges.
    pub fn edge_count(&self) -> usize {
        self.row_count(ElementKind::Edge)
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.row_count(ElementKind::Face)
    }

    /// Return the column-default spec.
    pub const fn specs(&self) -> &TissueSpec {
        &self.specs
    }

    /// Return the coordinate column names.
    pub fn coords(&self) -> &[String] {
        &self.coords
    }

    /// Fill every column named in `spec` with its default value,
    /// overwriting existing values. Kinds absent from the tissue are skipped.
    pub fn set_data_columns(&mut self, spec: &TissueSpec) {
        for (kind, columns) in spec.iter() {
            let Some(table) = self.datasets.get_mut(&kind) else {
                continue;
            };
            for (name, default) in columns {
                table.fill_column(name.clone(), default);
            }
        }
    }
}
