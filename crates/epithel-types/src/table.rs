//! Typed columnar tables with a preserved row index.
//!
//! A [`Table`] holds one [`Column`] per name, all of the same length as the
//! row index. Row labels are the element ids the rows had when they were
//! created and are never renumbered, so a snapshot of a table can be matched
//! row-for-row against the live table it was taken from.
//!
//! Columns are single-typed. Replacing a column with one of another type is
//! allowed (the live tissue is free to evolve); detecting that drift is the
//! job of the history store.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::kind::ElementKind;

/// Errors that can occur when manipulating a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// A column does not have as many values as the table has rows.
    #[error("column {column} has {found} rows, table has {expected}")]
    LengthMismatch {
        /// The offending column.
        column: String,
        /// Number of rows in the table.
        expected: usize,
        /// Number of values in the column.
        found: usize,
    },

    /// The requested column does not exist.
    #[error("column not found: {0}")]
    MissingColumn(String),

    /// The tissue has no table of the requested kind.
    #[error("no {0} table")]
    MissingTable(ElementKind),

    /// A value or column of the wrong type was supplied.
    #[error("column {column} holds {expected} values, got {found}")]
    DTypeMismatch {
        /// The offending column.
        column: String,
        /// The type the column holds.
        expected: DType,
        /// The type that was supplied.
        found: DType,
    },

    /// No row carries the requested label.
    #[error("row label not found: {0}")]
    UnknownLabel(usize),

    /// Two tables could not be concatenated.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// An integer column refers to an element that does not exist.
    #[error("column {column} holds an invalid element reference: {value}")]
    InvalidReference {
        /// The referencing column.
        column: String,
        /// The offending value.
        value: i64,
    },
}

/// The data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 64-bit signed integers.
    Int,
    /// 64-bit floats.
    Float,
    /// Booleans.
    Bool,
    /// UTF-8 strings.
    Text,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value. Non-finite values are stored as `"NaN"`, `"inf"` or
    /// `"-inf"`, so text holding exactly one of those reads back as a float.
    Float(#[serde(with = "crate::float")] f64),
    /// Text value.
    Text(String),
}

impl Scalar {
    /// Return the data type of this value.
    pub const fn dtype(&self) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::Int(_) => DType::Int,
            Self::Float(_) => DType::Float,
            Self::Text(_) => DType::Text,
        }
    }

    /// Return the value as a float if it holds one.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A single-typed column of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "lowercase")]
pub enum Column {
    /// Integer values.
    Int(Vec<i64>),
    /// Float values.
    Float(#[serde(with = "crate::float::vec")] Vec<f64>),
    /// Boolean values.
    Bool(Vec<bool>),
    /// Text values.
    Text(Vec<String>),
}

impl Column {
    /// Build a column of `len` copies of `value`.
    pub fn filled(value: &Scalar, len: usize) -> Self {
        match value {
            Scalar::Int(v) => Self::Int(vec![*v; len]),
            Scalar::Float(v) => Self::Float(vec![*v; len]),
            Scalar::Bool(v) => Self::Bool(vec![*v; len]),
            Scalar::Text(v) => Self::Text(vec![v.clone(); len]),
        }
    }

    /// Return the data type of this column.
    pub const fn dtype(&self) -> DType {
        match self {
            Self::Int(_) => DType::Int,
            Self::Float(_) => DType::Float,
            Self::Bool(_) => DType::Bool,
            Self::Text(_) => DType::Text,
        }
    }

    /// Return the number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    /// Return `true` if the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the value at row position `pos`.
    pub fn get(&self, pos: usize) -> Option<Scalar> {
        match self {
            Self::Int(v) => v.get(pos).copied().map(Scalar::Int),
            Self::Float(v) => v.get(pos).copied().map(Scalar::Float),
            Self::Bool(v) => v.get(pos).copied().map(Scalar::Bool),
            Self::Text(v) => v.get(pos).cloned().map(Scalar::Text),
        }
    }

    /// Return the values as a float slice if this is a float column.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Return the values as an integer slice if this is an integer column.
    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Overwrite the value at `pos`. Returns the supplied type on mismatch.
    fn assign(&mut self, pos: usize, value: Scalar) -> Result<(), DType> {
        let found = value.dtype();
        match (self, value) {
            (Self::Int(values), Scalar::Int(v)) => {
                if let Some(slot) = values.get_mut(pos) {
                    *slot = v;
                }
            }
            (Self::Float(values), Scalar::Float(v)) => {
                if let Some(slot) = values.get_mut(pos) {
                    *slot = v;
                }
            }
            (Self::Bool(values), Scalar::Bool(v)) => {
                if let Some(slot) = values.get_mut(pos) {
                    *slot = v;
                }
            }
            (Self::Text(values), Scalar::Text(v)) => {
                if let Some(slot) = values.get_mut(pos) {
                    *slot = v;
                }
            }
            _ => return Err(found),
        }
        Ok(())
    }

    /// Gather the values at the given row positions.
    fn take(&self, positions: &[usize]) -> Self {
        match self {
            Self::Int(v) => Self::Int(positions.iter().filter_map(|&p| v.get(p).copied()).collect()),
            Self::Float(v) => {
                Self::Float(positions.iter().filter_map(|&p| v.get(p).copied()).collect())
            }
            Self::Bool(v) => {
                Self::Bool(positions.iter().filter_map(|&p| v.get(p).copied()).collect())
            }
            Self::Text(v) => {
                Self::Text(positions.iter().filter_map(|&p| v.get(p).cloned()).collect())
            }
        }
    }

    /// Append the values of `other`. Returns the other type on mismatch.
    fn extend_from(&mut self, other: &Self) -> Result<(), DType> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.extend_from_slice(b),
            (Self::Float(a), Self::Float(b)) => a.extend_from_slice(b),
            (Self::Bool(a), Self::Bool(b)) => a.extend_from_slice(b),
            (Self::Text(a), Self::Text(b)) => a.extend_from_slice(b),
            (_, other) => return Err(other.dtype()),
        }
        Ok(())
    }
}

/// A table of elements: a row index plus named, typed columns.
///
/// Row labels need not be unique: accumulated history views concatenate
/// several snapshots of the same elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Row labels (element ids).
    index: Vec<usize>,
    /// Columns keyed by name.
    columns: BTreeMap<String, Column>,
}

impl Table {
    /// Create a table with the given row labels and no columns.
    pub const fn new(index: Vec<usize>) -> Self {
        Self {
            index,
            columns: BTreeMap::new(),
        }
    }

    /// Create a table with `len` rows labelled `0..len`.
    pub fn with_len(len: usize) -> Self {
        Self::new((0..len).collect())
    }

    /// Create a table from row labels and columns.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::LengthMismatch`] if any column length differs
    /// from the number of labels.
    pub fn from_columns<I, S>(index: Vec<usize>, columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut table = Self::new(index);
        for (name, column) in columns {
            table.set_column(name, column)?;
        }
        Ok(table)
    }

    /// Return the number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Return `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Return the row labels.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Return `true` if a column with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Return the named column.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Iterate over column names in sorted order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Iterate over `(name, column)` pairs in sorted order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    /// Return the data type of the named column.
    pub fn dtype(&self, name: &str) -> Option<DType> {
        self.columns.get(name).map(Column::dtype)
    }

    /// Insert or replace a column, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::LengthMismatch`] if the column length differs
    /// from the number of rows.
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<Option<Column>, TableError> {
        let name = name.into();
        if column.len() != self.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.len(),
                found: column.len(),
            });
        }
        Ok(self.columns.insert(name, column))
    }

    /// Insert or replace a column holding `value` on every row.
    pub fn fill_column(&mut self, name: impl Into<String>, value: &Scalar) -> Option<Column> {
        let len = self.len();
        self.columns.insert(name.into(), Column::filled(value, len))
    }

    /// Return the position of the first row carrying `label`.
    pub fn position(&self, label: usize) -> Option<usize> {
        self.index.iter().position(|&l| l == label)
    }

    /// Return the value of column `name` on the row labelled `label`.
    pub fn get(&self, label: usize, name: &str) -> Result<Scalar, TableError> {
        let column = self
            .column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_owned()))?;
        self.position(label)
            .and_then(|pos| column.get(pos))
            .ok_or(TableError::UnknownLabel(label))
    }

    /// Overwrite the value of column `name` on the row labelled `label`.
    pub fn set(
        &mut self,
        label: usize,
        name: &str,
        value: impl Into<Scalar>,
    ) -> Result<(), TableError> {
        let pos = self.position(label).ok_or(TableError::UnknownLabel(label))?;
        let column = self
            .columns
            .get_mut(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_owned()))?;
        let expected = column.dtype();
        column
            .assign(pos, value.into())
            .map_err(|found| TableError::DTypeMismatch {
                column: name.to_owned(),
                expected,
                found,
            })
    }

    /// Borrow a float column.
    pub fn floats(&self, name: &str) -> Result<&[f64], TableError> {
        let column = self
            .column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_owned()))?;
        column.as_f64().ok_or_else(|| TableError::DTypeMismatch {
            column: name.to_owned(),
            expected: DType::Float,
            found: column.dtype(),
        })
    }

    /// Borrow an integer column.
    pub fn ints(&self, name: &str) -> Result<&[i64], TableError> {
        let column = self
            .column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_owned()))?;
        column.as_i64().ok_or_else(|| TableError::DTypeMismatch {
            column: name.to_owned(),
            expected: DType::Int,
            found: column.dtype(),
        })
    }

    /// Return a copy of this table restricted to the named columns.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingColumn`] for the first absent name.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, TableError> {
        let mut selected = Self::new(self.index.clone());
        for name in names {
            let name = name.as_ref();
            let column = self
                .column(name)
                .ok_or_else(|| TableError::MissingColumn(name.to_owned()))?;
            selected.columns.insert(name.to_owned(), column.clone());
        }
        Ok(selected)
    }

    /// Return a copy holding only the rows at the given positions.
    pub fn take(&self, positions: &[usize]) -> Self {
        let index = positions
            .iter()
            .filter_map(|&p| self.index.get(p).copied())
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| (name.clone(), col.take(positions)))
            .collect();
        Self { index, columns }
    }

    /// Append the rows of `other` below the rows of this table.
    ///
    /// An empty table without columns adopts the schema of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::SchemaMismatch`] if column names differ, or
    /// [`TableError::DTypeMismatch`] if a shared column changes type.
    pub fn append(&mut self, other: &Self) -> Result<(), TableError> {
        if self.is_empty() && self.columns.is_empty() {
            self.clone_from(other);
            return Ok(());
        }
        if !self.columns.keys().eq(other.columns.keys()) {
            return Err(TableError::SchemaMismatch(format!(
                "cannot append [{}] to [{}]",
                other.column_names().collect::<Vec<_>>().join(", "),
                self.column_names().collect::<Vec<_>>().join(", "),
            )));
        }
        for (name, column) in &mut self.columns {
            if let Some(incoming) = other.columns.get(name) {
                let expected = column.dtype();
                column
                    .extend_from(incoming)
                    .map_err(|found| TableError::DTypeMismatch {
                        column: name.clone(),
                        expected,
                        found,
                    })?;
            }
        }
        self.index.extend_from_slice(&other.index);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(
            vec![3, 5, 7],
            [
                ("x", Column::Float(vec![0.0, 1.0, 2.0])),
                ("face", Column::Int(vec![0, 0, 1])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn set_column_rejects_wrong_length() {
        let mut table = sample();
        let err = table.set_column("y", Column::Float(vec![1.0])).unwrap_err();
        assert_eq!(
            err,
            TableError::LengthMismatch {
                column: "y".to_owned(),
                expected: 3,
                found: 1
            }
        );
    }

    #[test]
    fn get_and_set_by_label() {
        let mut table = sample();
        table.set(5, "x", 100.0).unwrap();
        assert_eq!(table.get(5, "x").unwrap(), Scalar::Float(100.0));
        assert_eq!(table.get(9, "x"), Err(TableError::UnknownLabel(9)));
    }

    #[test]
    fn set_rejects_wrong_dtype() {
        let mut table = sample();
        let err = table.set(3, "face", 1.5).unwrap_err();
        assert!(matches!(err, TableError::DTypeMismatch { .. }));
    }

    #[test]
    fn replacing_a_column_may_change_its_dtype() {
        let mut table = sample();
        table.fill_column("x", &Scalar::from("abc"));
        assert_eq!(table.dtype("x"), Some(DType::Text));
    }

    #[test]
    fn select_keeps_index() {
        let table = sample();
        let selected = table.select(&["face"]).unwrap();
        assert_eq!(selected.index(), &[3, 5, 7]);
        assert!(!selected.contains("x"));
        assert!(table.select(&["missing"]).is_err());
    }

    #[test]
    fn take_gathers_rows() {
        let table = sample();
        let taken = table.take(&[2, 0]);
        assert_eq!(taken.index(), &[7, 3]);
        assert_eq!(taken.floats("x").unwrap(), &[2.0, 0.0]);
    }

    #[test]
    fn append_concatenates_rows() {
        let mut table = sample();
        let other = sample();
        table.append(&other).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.ints("face").unwrap().len(), 6);
    }

    #[test]
    fn append_to_empty_adopts_schema() {
        let mut table = Table::default();
        table.append(&sample()).unwrap();
        assert_eq!(table, sample());
    }

    #[test]
    fn append_rejects_schema_mismatch() {
        let mut table = sample();
        let other = sample().select(&["x"]).unwrap();
        assert!(matches!(
            table.append(&other),
            Err(TableError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn scalar_json_is_untagged() {
        let values: Vec<Scalar> = serde_json::from_str("[1, 1.5, true, \"a\"]").unwrap();
        assert_eq!(
            values,
            vec![
                Scalar::Int(1),
                Scalar::Float(1.5),
                Scalar::Bool(true),
                Scalar::Text("a".to_owned())
            ]
        );
    }
}
