//! Geometry collaborators.
//!
//! A geometry recomputes every derived quantity (edge vectors, lengths,
//! centroids, areas) from the current vertex positions. The scheduler and
//! the history never call it themselves; drivers call it after mutating a
//! tissue or after retrieving a past state.

use std::collections::HashMap;

use crate::kind::ElementKind;
use crate::table::{Column, Table, TableError};
use crate::tissue::Tissue;

/// Recomputes derived geometric quantities of a tissue.
pub trait Geometry {
    /// Update all derived quantities from the current positions.
    fn update_all(tissue: &mut Tissue) -> Result<(), TableError>;
}

/// Geometry of a 2D sheet in the `x`, `y` plane.
///
/// Columns written:
///
/// | Kind | Columns |
/// |------|---------|
/// | edge | `dx`, `dy`, `length` |
/// | face | `x`, `y` (vertex centroid), `num_sides`, `perimeter`, `area` |
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarGeometry;

impl Geometry for PlanarGeometry {
    fn update_all(tissue: &mut Tissue) -> Result<(), TableError> {
        Self::update_edges(tissue)?;
        Self::update_faces(tissue)
    }
}

impl PlanarGeometry {
    /// Recompute `dx`, `dy` and `length` of every half-edge.
    pub fn update_edges(tissue: &mut Tissue) -> Result<(), TableError> {
        let verts = VertexPositions::new(tissue.table(ElementKind::Vert)?)?;
        let edges = tissue.table(ElementKind::Edge)?;
        let srce = edges.ints("srce")?;
        let trgt = edges.ints("trgt")?;

        let mut dx = Vec::with_capacity(edges.len());
        let mut dy = Vec::with_capacity(edges.len());
        let mut length = Vec::with_capacity(edges.len());
        for (&s, &t) in srce.iter().zip(trgt) {
            let (sx, sy) = verts.locate("srce", s)?;
            let (tx, ty) = verts.locate("trgt", t)?;
            let (ex, ey) = (tx - sx, ty - sy);
            dx.push(ex);
            dy.push(ey);
            length.push(ex.hypot(ey));
        }

        let edges = tissue.table_mut(ElementKind::Edge)?;
        edges.set_column("dx", Column::Float(dx))?;
        edges.set_column("dy", Column::Float(dy))?;
        edges.set_column("length", Column::Float(length))?;
        Ok(())
    }

    /// Recompute centroid, side count, perimeter and area of every face.
    ///
    /// Areas sum the triangles spanned by each half-edge and the face
    /// centroid, which is exact for star-shaped faces.
    pub fn update_faces(tissue: &mut Tissue) -> Result<(), TableError> {
        let verts = VertexPositions::new(tissue.table(ElementKind::Vert)?)?;
        let edges = tissue.table(ElementKind::Edge)?;
        let faces = tissue.table(ElementKind::Face)?;
        let face_lookup = label_lookup(faces);
        let srce = edges.ints("srce")?;
        let trgt = edges.ints("trgt")?;
        let face = edges.ints("face")?;

        let n = faces.len();
        let mut cx = vec![0.0; n];
        let mut cy = vec![0.0; n];
        let mut sides = vec![0_u32; n];
        for (&s, &f) in srce.iter().zip(face) {
            let fpos = locate(&face_lookup, "face", f)?;
            let (sx, sy) = verts.locate("srce", s)?;
            accumulate(&mut cx, fpos, sx);
            accumulate(&mut cy, fpos, sy);
            if let Some(count) = sides.get_mut(fpos) {
                *count = count.saturating_add(1);
            }
        }
        for ((x, y), &count) in cx.iter_mut().zip(cy.iter_mut()).zip(&sides) {
            if count > 0 {
                *x /= f64::from(count);
                *y /= f64::from(count);
            }
        }

        let mut perimeter = vec![0.0; n];
        let mut area = vec![0.0; n];
        for ((&s, &t), &f) in srce.iter().zip(trgt).zip(face) {
            let fpos = locate(&face_lookup, "face", f)?;
            let (sx, sy) = verts.locate("srce", s)?;
            let (tx, ty) = verts.locate("trgt", t)?;
            let (fx, fy) = (
                cx.get(fpos).copied().unwrap_or_default(),
                cy.get(fpos).copied().unwrap_or_default(),
            );
            let cross = (sx - fx).mul_add(ty - fy, -((sy - fy) * (tx - fx)));
            accumulate(&mut area, fpos, 0.5 * cross.abs());
            accumulate(&mut perimeter, fpos, (tx - sx).hypot(ty - sy));
        }

        let faces = tissue.table_mut(ElementKind::Face)?;
        faces.set_column("x", Column::Float(cx))?;
        faces.set_column("y", Column::Float(cy))?;
        faces.set_column(
            "num_sides",
            Column::Int(sides.into_iter().map(i64::from).collect()),
        )?;
        faces.set_column("perimeter", Column::Float(perimeter))?;
        faces.set_column("area", Column::Float(area))?;
        Ok(())
    }
}

/// Vertex coordinates addressed by vertex label.
struct VertexPositions<'a> {
    lookup: HashMap<usize, usize>,
    x: &'a [f64],
    y: &'a [f64],
}

impl<'a> VertexPositions<'a> {
    fn new(verts: &'a Table) -> Result<Self, TableError> {
        Ok(Self {
            lookup: label_lookup(verts),
            x: verts.floats("x")?,
            y: verts.floats("y")?,
        })
    }

    fn locate(&self, column: &str, value: i64) -> Result<(f64, f64), TableError> {
        let pos = locate(&self.lookup, column, value)?;
        Ok((
            self.x.get(pos).copied().unwrap_or_default(),
            self.y.get(pos).copied().unwrap_or_default(),
        ))
    }
}

/// Map row labels to row positions.
fn label_lookup(table: &Table) -> HashMap<usize, usize> {
    table
        .index()
        .iter()
        .enumerate()
        .map(|(pos, &label)| (label, pos))
        .collect()
}

/// Resolve an integer reference to a row position.
fn locate(lookup: &HashMap<usize, usize>, column: &str, value: i64) -> Result<usize, TableError> {
    usize::try_from(value)
        .ok()
        .and_then(|label| lookup.get(&label).copied())
        .ok_or_else(|| TableError::InvalidReference {
            column: column.to_owned(),
            value,
        })
}

fn accumulate(values: &mut [f64], pos: usize, delta: f64) {
    if let Some(v) = values.get_mut(pos) {
        *v += delta;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::generation::three_faces_sheet;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn edge_lengths_are_unit_on_the_grid() {
        let sheet = three_faces_sheet().unwrap();
        let edges = sheet.dataset(ElementKind::Edge).unwrap();
        let length = edges.floats("length").unwrap();
        assert!(close(length.first().copied().unwrap(), 1.0));
    }

    #[test]
    fn face_areas_match_polygons() {
        let sheet = three_faces_sheet().unwrap();
        let faces = sheet.dataset(ElementKind::Face).unwrap();
        let area = faces.floats("area").unwrap();
        assert!(close(area.first().copied().unwrap(), 1.0));
        assert!(close(area.get(1).copied().unwrap(), 1.0));
        assert!(close(area.get(2).copied().unwrap(), 1.5));
        assert_eq!(faces.ints("num_sides").unwrap(), &[4, 4, 5]);
    }

    #[test]
    fn moving_a_vertex_changes_derived_quantities() {
        let mut sheet = three_faces_sheet().unwrap();
        sheet
            .table_mut(ElementKind::Vert)
            .unwrap()
            .set(0, "x", -1.0)
            .unwrap();
        PlanarGeometry::update_all(&mut sheet).unwrap();
        let faces = sheet.dataset(ElementKind::Face).unwrap();
        let area = faces.floats("area").unwrap();
        assert!(area.first().copied().unwrap() > 1.0);
    }

    #[test]
    fn dangling_reference_is_reported() {
        let mut sheet = three_faces_sheet().unwrap();
        sheet
            .table_mut(ElementKind::Edge)
            .unwrap()
            .set(0, "srce", 99_i64)
            .unwrap();
        let err = PlanarGeometry::update_all(&mut sheet).unwrap_err();
        assert_eq!(
            err,
            TableError::InvalidReference {
                column: "srce".to_owned(),
                value: 99
            }
        );
    }
}
