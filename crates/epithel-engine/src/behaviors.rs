//! Behaviors shipped with the engine.

use epithel_behaviors::{
    BehaviorError, BehaviorId, BehaviorRegistry, ElementRef, Event, EventArgs, EventManager,
};
use epithel_types::{ElementKind, Tissue};

/// Identifier of [`contract`].
pub const CONTRACT: BehaviorId = BehaviorId::from_static("contract");

/// Contraction rate applied to every face at startup.
const SEED_RATE: f64 = 0.05;

/// Ticks every face contracts for at startup.
const SEED_STEPS: u64 = 5;

/// Pull the vertices of a face toward its centroid.
///
/// Arguments: `rate` (fraction of the distance covered per tick) and
/// `n_steps` (ticks left, including this one). Re-queues itself while
/// `n_steps > 1`.
pub fn contract(
    tissue: &mut Tissue,
    manager: &mut EventManager<Tissue>,
    element: ElementRef,
    args: &EventArgs,
) -> Result<(), BehaviorError> {
    let Some(face) = element.index() else {
        return Ok(());
    };
    let rate = args.f64_arg(&CONTRACT, 0, "rate")?;
    let n_steps = args.u64_arg(&CONTRACT, 1, "n_steps")?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(BehaviorError::InvalidArgument {
            behavior: CONTRACT,
            name: "rate".to_owned(),
            reason: format!("{rate} is outside [0, 1]"),
        });
    }

    let faces = tissue.table(ElementKind::Face)?;
    let cx = faces.get(face, "x")?.as_f64().unwrap_or_default();
    let cy = faces.get(face, "y")?.as_f64().unwrap_or_default();
    let verts = face_vertices(tissue, face)?;

    let keep = 1.0 - rate;
    let table = tissue.table_mut(ElementKind::Vert)?;
    for vert in verts {
        let x = table.get(vert, "x")?.as_f64().unwrap_or_default();
        let y = table.get(vert, "y")?.as_f64().unwrap_or_default();
        table.set(vert, "x", keep.mul_add(x - cx, cx))?;
        table.set(vert, "y", keep.mul_add(y - cy, cy))?;
    }

    if n_steps > 1 {
        manager.append(
            Event::new(CONTRACT)
                .on(element)
                .with_args(EventArgs::new().arg(rate).arg(n_steps.saturating_sub(1))),
        );
    }
    Ok(())
}

/// Source vertices of the half-edges bordering `face`.
fn face_vertices(tissue: &Tissue, face: usize) -> Result<Vec<usize>, BehaviorError> {
    let edges = tissue.table(ElementKind::Edge)?;
    let faces = edges.ints("face")?;
    let srce = edges.ints("srce")?;
    Ok(faces
        .iter()
        .zip(srce)
        .filter(|&(&f, _)| usize::try_from(f).is_ok_and(|f| f == face))
        .filter_map(|(_, &s)| usize::try_from(s).ok())
        .collect())
}

/// Registry holding `wait` and the engine's behaviors.
pub fn registry() -> Result<BehaviorRegistry<Tissue>, BehaviorError> {
    BehaviorRegistry::new().with(CONTRACT, contract)
}

/// One contraction per face.
pub fn seed_events(tissue: &Tissue) -> Vec<Event> {
    tissue
        .dataset(ElementKind::Face)
        .map(|faces| {
            faces
                .index()
                .iter()
                .map(|&face| {
                    Event::new(CONTRACT)
                        .on(face)
                        .with_args(EventArgs::new().kwarg("rate", SEED_RATE).kwarg("n_steps", SEED_STEPS))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use epithel_types::{Geometry, PlanarGeometry, three_faces_sheet};

    use super::*;

    fn area(tissue: &Tissue, face: usize) -> f64 {
        tissue
            .table(ElementKind::Face)
            .unwrap()
            .get(face, "area")
            .unwrap()
            .as_f64()
            .unwrap()
    }

    #[test]
    fn contract_shrinks_the_face_and_requeues() {
        let mut sheet = three_faces_sheet().unwrap();
        let mut manager = EventManager::new("face", registry().unwrap()).seeded(0);
        let before = area(&sheet, 2);

        let args = EventArgs::new().arg(0.1).arg(2);
        contract(&mut sheet, &mut manager, ElementRef::Element(2), &args).unwrap();
        PlanarGeometry::update_all(&mut sheet).unwrap();

        assert!(area(&sheet, 2) < before);
        assert_eq!(manager.next_events().len(), 1);
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let mut sheet = three_faces_sheet().unwrap();
        let mut manager = EventManager::new("face", registry().unwrap());
        let args = EventArgs::new().arg(1.5).arg(1);
        let err = contract(&mut sheet, &mut manager, ElementRef::Element(0), &args).unwrap_err();
        assert!(matches!(err, BehaviorError::InvalidArgument { .. }));
    }

    #[test]
    fn every_face_gets_a_seed_event() {
        let sheet = three_faces_sheet().unwrap();
        assert_eq!(seed_events(&sheet).len(), 3);
    }
}
