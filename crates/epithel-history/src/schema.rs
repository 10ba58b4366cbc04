//! Which columns of which tables a history tracks.
//!
//! The schema is fixed when the history is created. Every later `record`
//! checks the live tissue against it before anything is stored.

use std::collections::{BTreeMap, BTreeSet};

use epithel_types::{DType, ElementKind, Table, Tissue};
use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, HistoryWarning};

/// Extra columns to track, per element kind.
pub type ExtraColumns = BTreeMap<ElementKind, Vec<String>>;

/// One table per element kind, as captured at one instant.
pub type Snapshot = BTreeMap<ElementKind, Table>;

/// Tracked columns with their data types, per element kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSchema {
    /// Columns copied into every snapshot.
    tracked: BTreeMap<ElementKind, BTreeMap<String, DType>>,
    /// Every column each table had when tracking started.
    known: BTreeMap<ElementKind, BTreeSet<String>>,
}

impl TrackedSchema {
    /// Derive the schema from a live tissue.
    ///
    /// Vertex, face and cell tables track the coordinate columns; the edge
    /// table tracks `srce`, `trgt`, `face` (and `cell` when the tissue has
    /// cells). `extra_cols` adds to those. Requested columns the tissue
    /// does not have are reported and skipped.
    pub fn resolve(tissue: &Tissue, extra_cols: &ExtraColumns) -> (Self, Vec<HistoryWarning>) {
        let mut schema = Self::default();
        let mut warnings = Vec::new();

        for (&kind, table) in tissue.datasets() {
            let mut columns = BTreeMap::new();
            for name in default_columns(tissue, kind) {
                if let Some(dtype) = table.dtype(&name) {
                    columns.insert(name, dtype);
                }
            }
            for name in extra_cols.get(&kind).into_iter().flatten() {
                match table.dtype(name) {
                    Some(dtype) => {
                        columns.insert(name.clone(), dtype);
                    }
                    None => warnings.push(
                        HistoryWarning::UnknownColumn {
                            kind,
                            column: name.clone(),
                        }
                        .emit(),
                    ),
                }
            }
            schema.tracked.insert(kind, columns);
            schema
                .known
                .insert(kind, table.column_names().map(str::to_owned).collect());
        }

        for (&kind, names) in extra_cols {
            if tissue.has_kind(kind) {
                continue;
            }
            for name in names {
                warnings.push(
                    HistoryWarning::UnknownColumn {
                        kind,
                        column: name.clone(),
                    }
                    .emit(),
                );
            }
        }

        (schema, warnings)
    }

    /// Return the tracked element kinds.
    pub fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        self.tracked.keys().copied()
    }

    /// Return the tracked columns of one kind with their types.
    pub fn columns(&self, kind: ElementKind) -> Option<&BTreeMap<String, DType>> {
        self.tracked.get(&kind)
    }

    /// Return `true` if `column` of `kind` is tracked.
    pub fn is_tracked(&self, kind: ElementKind, column: &str) -> bool {
        self.tracked
            .get(&kind)
            .is_some_and(|columns| columns.contains_key(column))
    }

    /// Copy the tracked columns out of the live tissue.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SchemaDrift`] if a tracked column changed
    /// type, or [`HistoryError::MissingElementKind`] /
    /// [`HistoryError::MissingColumn`] if it disappeared. Nothing is
    /// captured unless every kind passes.
    pub fn capture(&self, tissue: &Tissue) -> Result<(Snapshot, Vec<HistoryWarning>), HistoryError> {
        let mut warnings = Vec::new();
        for (&kind, columns) in &self.tracked {
            let table = tissue
                .dataset(kind)
                .ok_or(HistoryError::MissingElementKind(kind))?;
            for (name, &expected) in columns {
                let found = table.dtype(name).ok_or_else(|| HistoryError::MissingColumn {
                    kind,
                    column: name.clone(),
                })?;
                if found != expected {
                    return Err(HistoryError::SchemaDrift {
                        kind,
                        column: name.clone(),
                        expected,
                        found,
                    });
                }
            }
            let known = self.known.get(&kind);
            for name in table.column_names() {
                if !known.is_some_and(|known| known.contains(name)) {
                    warnings.push(
                        HistoryWarning::UntrackedColumn {
                            kind,
                            column: name.to_owned(),
                        }
                        .emit(),
                    );
                }
            }
        }

        let mut snapshot = Snapshot::new();
        for (&kind, columns) in &self.tracked {
            let table = tissue.table(kind)?;
            let names: Vec<&str> = columns.keys().map(String::as_str).collect();
            snapshot.insert(kind, table.select(&names)?);
        }
        Ok((snapshot, warnings))
    }
}

fn default_columns(tissue: &Tissue, kind: ElementKind) -> Vec<String> {
    match kind {
        ElementKind::Edge => {
            let mut columns: Vec<String> = ["srce", "trgt", "face"].map(str::to_owned).to_vec();
            if tissue.has_kind(ElementKind::Cell) {
                columns.push("cell".to_owned());
            }
            columns
        }
        ElementKind::Vert | ElementKind::Face | ElementKind::Cell => tissue.coords().to_vec(),
    }
}
