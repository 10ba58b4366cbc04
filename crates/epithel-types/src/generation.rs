//! Small fixture meshes.

use std::collections::BTreeMap;

use crate::geometry::{Geometry, PlanarGeometry};
use crate::kind::ElementKind;
use crate::spec::TissueSpec;
use crate::table::{Column, Table, TableError};
use crate::tissue::Tissue;

/// Vertex positions of the three-faces sheet.
const THREE_FACES_VERTS: [(f64, f64); 8] = [
    (0.0, 0.0),
    (1.0, 0.0),
    (2.0, 0.0),
    (0.0, 1.0),
    (1.0, 1.0),
    (2.0, 1.0),
    (0.5, 2.0),
    (1.5, 2.0),
];

/// Half-edges of the three-faces sheet as `(srce, trgt, face)`.
const THREE_FACES_EDGES: [(i64, i64, i64); 13] = [
    (0, 1, 0),
    (1, 4, 0),
    (4, 3, 0),
    (3, 0, 0),
    (1, 2, 1),
    (2, 5, 1),
    (5, 4, 1),
    (4, 1, 1),
    (3, 4, 2),
    (4, 5, 2),
    (5, 7, 2),
    (7, 6, 2),
    (6, 3, 2),
];

/// Build a planar sheet of two unit squares topped by a pentagon.
///
/// The sheet has 3 faces, 13 half-edges and 8 vertices, with every column
/// of [`TissueSpec::planar`] present and the geometry up to date.
pub fn three_faces_sheet() -> Result<Tissue, TableError> {
    let specs = TissueSpec::planar();

    let mut verts = Table::from_columns(
        (0..THREE_FACES_VERTS.len()).collect(),
        [
            ("x", Column::Float(THREE_FACES_VERTS.iter().map(|v| v.0).collect())),
            ("y", Column::Float(THREE_FACES_VERTS.iter().map(|v| v.1).collect())),
        ],
    )?;
    let mut edges = Table::from_columns(
        (0..THREE_FACES_EDGES.len()).collect(),
        [
            ("srce", Column::Int(THREE_FACES_EDGES.iter().map(|e| e.0).collect())),
            ("trgt", Column::Int(THREE_FACES_EDGES.iter().map(|e| e.1).collect())),
            ("face", Column::Int(THREE_FACES_EDGES.iter().map(|e| e.2).collect())),
        ],
    )?;
    let mut faces = Table::with_len(3);

    // Columns the fixture does not set explicitly take their spec default.
    for (kind, table) in [
        (ElementKind::Vert, &mut verts),
        (ElementKind::Edge, &mut edges),
        (ElementKind::Face, &mut faces),
    ] {
        if let Some(columns) = specs.columns(kind) {
            for (name, default) in columns {
                if !table.contains(name) {
                    table.fill_column(name.clone(), default);
                }
            }
        }
    }

    let mut datasets = BTreeMap::new();
    datasets.insert(ElementKind::Vert, verts);
    datasets.insert(ElementKind::Edge, edges);
    datasets.insert(ElementKind::Face, faces);

    let mut sheet = Tissue::new("three_faces", datasets, specs, ["x", "y"]);
    PlanarGeometry::update_all(&mut sheet)?;
    Ok(sheet)
}
