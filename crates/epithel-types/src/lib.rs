//! Shared tissue data model for the Epithel simulation.
//!
//! An epithelium is stored as one table per element kind (vertices,
//! half-edges, faces, cells). Every table keeps the row index the element
//! had when it was created, and every column carries a single data type.
//! The scheduler and the history store only rely on this tabular surface.
//!
//! # Modules
//!
//! - [`kind`] -- The [`ElementKind`] enumeration.
//! - [`table`] -- Typed columns and the [`Table`] container.
//! - [`tissue`] -- The [`Tissue`] object: per-kind tables plus spec and coordinates.
//! - [`spec`] -- Data-column specifications with JSON load/save.
//! - [`geometry`] -- The [`Geometry`] collaborator and [`PlanarGeometry`].
//! - [`generation`] -- Small fixture meshes.

mod float;
pub mod generation;
pub mod geometry;
pub mod kind;
pub mod spec;
pub mod table;
pub mod tissue;

// Re-export primary types at crate root.
pub use generation::three_faces_sheet;
pub use geometry::{Geometry, PlanarGeometry};
pub use kind::ElementKind;
pub use spec::{SpecError, TissueSpec};
pub use table::{Column, DType, Scalar, Table, TableError};
pub use tissue::Tissue;
