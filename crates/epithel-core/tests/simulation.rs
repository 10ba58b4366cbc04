//! End-to-end run: YAML config, scheduler, geometry and segmented history.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use epithel_behaviors::{
    BehaviorError, BehaviorId, BehaviorRegistry, ElementRef, Event, EventArgs, EventManager,
};
use epithel_core::{NoOpCallback, RunEndReason, SimulationConfig, TickCallback, run_simulation};
use epithel_history::History;
use epithel_types::{ElementKind, PlanarGeometry, Scalar, Tissue, three_faces_sheet};

const SHIFT: BehaviorId = BehaviorId::from_static("shift");

/// Moves vertex `element` up by `dy` for `n_steps` ticks.
fn shift(
    tissue: &mut Tissue,
    manager: &mut EventManager<Tissue>,
    element: ElementRef,
    args: &EventArgs,
) -> Result<(), BehaviorError> {
    let Some(vert) = element.index() else {
        return Ok(());
    };
    let dy = args.f64_arg(&SHIFT, 0, "dy")?;
    let n_steps = args.u64_arg(&SHIFT, 1, "n_steps")?;
    let verts = tissue.table_mut(ElementKind::Vert)?;
    let y = verts.get(vert, "y")?.as_f64().unwrap_or_default();
    verts.set(vert, "y", y + dy)?;
    if n_steps > 1 {
        manager.append(
            Event::new(SHIFT)
                .on(element)
                .with_args(EventArgs::new().arg(dy).arg(n_steps.saturating_sub(1))),
        );
    }
    Ok(())
}

#[derive(Default)]
struct Areas(Vec<f64>);

impl TickCallback for Areas {
    fn on_tick(&mut self, _tick: u64, _executed: usize, tissue: &Tissue) {
        let area = tissue
            .table(ElementKind::Face)
            .unwrap()
            .get(2, "area")
            .unwrap()
            .as_f64()
            .unwrap();
        self.0.push(area);
    }
}

fn config(dir: &std::path::Path) -> SimulationConfig {
    let yaml = format!(
        "
scheduler:
  element: vert
  seed: 11
  logfile: {log}
history:
  extra_cols:
    face: [area]
  path: {manifest}
  save_every: 2
run:
  max_ticks: 10
",
        log = dir.join("events.log").display(),
        manifest = dir.join("history.json").display(),
    );
    SimulationConfig::parse(&yaml).unwrap()
}

#[test]
fn configured_run_records_a_growing_face() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let registry = BehaviorRegistry::new().with(SHIFT, shift).unwrap();
    let mut manager = config.scheduler.build_manager(registry).unwrap();
    manager.append(
        Event::new(SHIFT)
            .on(6_usize)
            .with_args(EventArgs::new().kwarg("dy", 0.5).kwarg("n_steps", 3)),
    );

    let mut sheet = three_faces_sheet().unwrap();
    let (mut store, warnings) = config.history.build_store(&sheet).unwrap();
    assert!(warnings.is_empty());

    let mut areas = Areas::default();
    let summary = run_simulation::<PlanarGeometry>(
        &mut sheet,
        &mut manager,
        store.as_mut(),
        &config.run,
        &mut areas,
    )
    .unwrap();

    assert_eq!(summary.end_reason, RunEndReason::Idle);
    assert_eq!(summary.ticks, 4);
    // Areas grow on ticks 2..=4 only.
    assert_eq!(areas.0.len(), 4);
    assert!(areas.0[1] > areas.0[0]);
    assert!(areas.0[3] > areas.0[2]);

    // Vertex 6 started at y = 2 and moved three times.
    assert_eq!(
        sheet.table(ElementKind::Vert).unwrap().get(6, "y").unwrap(),
        Scalar::Float(3.5)
    );
    let first = store.retrieve(1.0).unwrap();
    assert_eq!(
        first.table(ElementKind::Vert).unwrap().get(6, "y").unwrap(),
        Scalar::Float(2.0)
    );

    // Everything was flushed: the manifest reopens as a full history.
    let reloaded = History::from_archive(&dir.path().join("history.json")).unwrap();
    assert_eq!(reloaded.time_stamps(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);

    let log = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
    assert!(log.contains("time, vert index, event"));
    assert_eq!(log.lines().filter(|line| line.ends_with(", shift")).count(), 3);
}

#[test]
fn failing_behavior_aborts_the_run() {
    let mut sheet = three_faces_sheet().unwrap();
    let registry = BehaviorRegistry::new().with(SHIFT, shift).unwrap();
    let mut manager = EventManager::new("vert", registry).seeded(1);
    // Missing `dy`.
    manager.append(Event::new(SHIFT).on(0_usize));
    let mut history = History::new(&sheet, &epithel_history::HistoryOptions::default()).unwrap();

    let err = run_simulation::<PlanarGeometry>(
        &mut sheet,
        &mut manager,
        &mut history,
        &SimulationConfig::default().run,
        &mut NoOpCallback,
    )
    .unwrap_err();
    assert!(err.to_string().contains("missing argument dy"));
    // Tick 1 completed and was recorded before the failure.
    assert_eq!(history.time_stamps(), vec![0.0, 1.0]);
}
