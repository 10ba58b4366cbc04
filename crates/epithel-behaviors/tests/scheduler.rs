//! Integration tests for the two-queue scheduler driving a real tissue.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use epithel_behaviors::{
    BehaviorError, BehaviorId, BehaviorRegistry, ElementRef, Event, EventArgs, EventManager,
    MemorySink,
};
use epithel_types::{ElementKind, Scalar, Tissue, three_faces_sheet};

const KILL: BehaviorId = BehaviorId::from_static("kill");
const RESPAWN: BehaviorId = BehaviorId::from_static("respawn");
const FAIL: BehaviorId = BehaviorId::from_static("fail");

/// Marks the face dead.
fn kill(
    tissue: &mut Tissue,
    _manager: &mut EventManager<Tissue>,
    element: ElementRef,
    _args: &EventArgs,
) -> Result<(), BehaviorError> {
    let Some(face) = element.index() else {
        return Ok(());
    };
    tissue
        .table_mut(ElementKind::Face)?
        .set(face, "is_alive", 0_i64)?;
    Ok(())
}

/// Re-queues itself on the same element every time it runs.
fn respawn(
    _tissue: &mut Tissue,
    manager: &mut EventManager<Tissue>,
    element: ElementRef,
    _args: &EventArgs,
) -> Result<(), BehaviorError> {
    manager.append(Event::new(RESPAWN).on(element));
    Ok(())
}

fn fail(
    _tissue: &mut Tissue,
    _manager: &mut EventManager<Tissue>,
    _element: ElementRef,
    _args: &EventArgs,
) -> Result<(), BehaviorError> {
    Err(BehaviorError::InvalidArgument {
        behavior: FAIL,
        name: "always".to_owned(),
        reason: "this behavior always fails".to_owned(),
    })
}

fn registry() -> BehaviorRegistry<Tissue> {
    BehaviorRegistry::new()
        .with(KILL, kill)
        .and_then(|r| r.with(RESPAWN, respawn))
        .and_then(|r| r.with(FAIL, fail))
        .unwrap()
}

fn wait_steps(manager: &EventManager<Tissue>) -> Vec<u64> {
    manager
        .next_events()
        .iter()
        .filter(|event| event.behavior == BehaviorId::WAIT)
        .map(|event| event.args.u64_arg(&BehaviorId::WAIT, 0, "n_steps").unwrap())
        .collect()
}

#[test]
fn wait_chain_counts_down_and_stops() {
    let mut sheet = three_faces_sheet().unwrap();
    let mut manager = EventManager::new("face", registry()).seeded(1);
    manager.execute(&mut sheet).unwrap();

    manager.append(
        Event::new(BehaviorId::WAIT)
            .on(0_usize)
            .with_args(EventArgs::new().kwarg("n_steps", 3)),
    );
    manager.update();

    manager.execute(&mut sheet).unwrap();
    assert_eq!(wait_steps(&manager), vec![2]);
    manager.update();

    manager.execute(&mut sheet).unwrap();
    assert_eq!(wait_steps(&manager), vec![1]);
    manager.update();

    manager.execute(&mut sheet).unwrap();
    assert!(wait_steps(&manager).is_empty());
    manager.update();
    assert!(manager.is_idle());
}

#[test]
fn behavior_mutates_the_tissue() {
    let mut sheet = three_faces_sheet().unwrap();
    let mut manager = EventManager::new("face", registry()).seeded(1);
    manager.append(Event::new(KILL).on(1_usize));
    manager.update();
    assert_eq!(manager.execute(&mut sheet).unwrap(), 1);

    let faces = sheet.table(ElementKind::Face).unwrap();
    assert_eq!(faces.get(1, "is_alive").unwrap(), Scalar::Int(0));
    assert_eq!(faces.get(0, "is_alive").unwrap(), Scalar::Int(1));
}

#[test]
fn self_requeue_runs_once_per_tick() {
    let mut sheet = three_faces_sheet().unwrap();
    let mut manager = EventManager::new("face", registry()).seeded(1);
    manager.execute(&mut sheet).unwrap();
    manager.append(Event::new(RESPAWN).on(2_usize));
    manager.update();

    for _ in 0..3 {
        assert_eq!(manager.execute(&mut sheet).unwrap(), 1);
        assert_eq!(manager.next_events().len(), 1);
        manager.update();
    }
}

#[test]
fn seeded_managers_replay_the_same_order() {
    let orders: Vec<Vec<ElementRef>> = [7_u64, 7]
        .iter()
        .map(|&seed| {
            let mut sheet = three_faces_sheet().unwrap();
            let mut manager = EventManager::new("face", registry()).seeded(seed);
            manager.execute(&mut sheet).unwrap();
            manager.extend((0..20_usize).map(|face| Event::new(RESPAWN).on(face)));
            manager.update();
            manager
                .current_events()
                .iter()
                .map(|event| event.element)
                .collect()
        })
        .collect();

    assert_eq!(orders[0], orders[1]);
    let mut sorted = orders[0].clone();
    sorted.sort();
    let expected: Vec<ElementRef> = (0..20_usize).map(ElementRef::Element).collect();
    assert_eq!(sorted, expected);
    assert_ne!(orders[0], expected);
}

#[test]
fn failing_behavior_aborts_execute() {
    let mut sheet = three_faces_sheet().unwrap();
    let mut manager = EventManager::new("face", registry()).seeded(1);
    manager.execute(&mut sheet).unwrap();
    manager.append(Event::new(FAIL).on(0_usize));
    manager.update();
    manager.append(Event::new(KILL).on(0_usize));

    let err = manager.execute(&mut sheet).unwrap_err();
    assert!(matches!(err, BehaviorError::InvalidArgument { .. }));
    assert!(manager.current_events().is_empty());
    assert_eq!(manager.next_events().len(), 1);
}

#[test]
fn every_execution_is_logged_to_the_sink() {
    let mut sheet = three_faces_sheet().unwrap();
    let sink = MemorySink::new();
    let mut manager = EventManager::new("face", registry())
        .seeded(1)
        .with_sink(Box::new(sink.clone()));
    manager.execute(&mut sheet).unwrap();
    manager.advance_clock().unwrap();
    manager.append(Event::new(KILL).on(2_usize));
    manager.update();
    manager.execute(&mut sheet).unwrap();

    assert_eq!(sink.lines(), vec!["0, -1, wait".to_owned(), "1, 2, kill".to_owned()]);
}

#[test]
fn logfile_gets_header_and_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");
    let mut sheet = three_faces_sheet().unwrap();
    let mut manager = EventManager::new("face", registry())
        .seeded(1)
        .with_logfile(&path)
        .unwrap();
    manager.execute(&mut sheet).unwrap();
    drop(manager);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "time, face index, event");
    assert_eq!(lines[2], "0, -1, wait");
}
