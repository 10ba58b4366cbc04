//! Integration tests for the segmented history store.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::path::Path;

use epithel_history::{
    ArchiveFile, History, HistoryError, HistoryOptions, HistoryStore, HistoryWarning,
    SegmentOptions, SegmentedHistory, TIME_COLUMN,
};
use epithel_types::{ElementKind, Scalar, Tissue, three_faces_sheet};

fn sheet() -> Tissue {
    three_faces_sheet().expect("fixture builds")
}

fn segment(path: &Path, save_every: usize) -> SegmentOptions {
    SegmentOptions {
        path: Some(path.to_path_buf()),
        save_every,
    }
}

fn options() -> HistoryOptions {
    HistoryOptions::default().with_extra_cols(ElementKind::Edge, ["dx"])
}

fn stamp_of(tissue: &Tissue, kind: ElementKind) -> Scalar {
    tissue.table(kind).unwrap().get(0, TIME_COLUMN).unwrap()
}

#[test]
fn shards_roll_over_at_save_every() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let sheet = sheet();
    let mut history = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 2)).unwrap();
    for i in 1..=5_u8 {
        history.record(&sheet, Some(f64::from(i))).unwrap();
    }

    // Stamps 0..=5 in shards of two.
    assert_eq!(history.shards().len(), 3);
    assert_eq!(history.shards()[1].stamps, vec![2.0, 3.0]);
    assert!(dir.path().join("out_0.json").exists());
    assert!(dir.path().join("out_2.json").exists());
    assert_eq!(history.time_stamps(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn retrieval_reads_the_owning_shard() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let sheet = sheet();
    let mut history = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 2)).unwrap();
    for i in [2.0, 4.0, 6.0] {
        history.record(&sheet, Some(i)).unwrap();
    }

    for (requested, expected) in [(0.0, 0.0), (1.0, 0.0), (2.0, 2.0), (5.0, 4.0), (9.0, 6.0)] {
        let past = history.retrieve(requested).unwrap();
        for kind in sheet.kinds() {
            assert_eq!(past.row_count(kind), sheet.row_count(kind));
            assert_eq!(stamp_of(&past, kind), Scalar::Float(expected));
        }
    }
    assert!(history.retrieve(-0.5).is_err());
}

#[test]
fn flushed_stamp_is_rewritten_and_older_new_stamps_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let mut sheet = sheet();
    let mut history = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 2)).unwrap();
    history.record(&sheet, Some(2.0)).unwrap();
    history.record(&sheet, Some(4.0)).unwrap();
    assert_eq!(history.shards().len(), 1);

    sheet
        .table_mut(ElementKind::Vert)
        .unwrap()
        .set(0, "x", 9.0)
        .unwrap();
    history.record(&sheet, Some(2.0)).unwrap();
    let past = history.retrieve(2.0).unwrap();
    assert_eq!(
        past.table(ElementKind::Vert).unwrap().get(0, "x").unwrap(),
        Scalar::Float(9.0)
    );

    let err = history.record(&sheet, Some(1.0)).unwrap_err();
    assert!(matches!(err, HistoryError::StampBeforeFlushedShard { .. }));
    assert_eq!(history.time_stamps(), vec![0.0, 2.0, 4.0]);
}

#[test]
fn existing_path_warns_and_moves_aside() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let sheet = sheet();

    let first = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 2)).unwrap();
    assert!(first.warnings().is_empty());
    assert_eq!(first.path(), manifest);

    let second = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 2)).unwrap();
    assert_eq!(second.path(), dir.path().join("out0.json"));
    assert!(matches!(
        second.warnings(),
        [HistoryWarning::ExistingPath { .. }]
    ));
}

#[test]
fn failed_shard_write_keeps_buffer_and_time() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let sheet = sheet();
    let mut history = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 2)).unwrap();
    history.record(&sheet, Some(1.0)).unwrap();
    history.record(&sheet, Some(2.0)).unwrap();

    // A directory where the next shard's temporary file goes.
    let blocker = dir.path().join("out_1.json.partial");
    std::fs::create_dir(&blocker).unwrap();
    let err = history.record(&sheet, Some(3.0)).unwrap_err();
    assert!(matches!(err, HistoryError::Io(_)));
    assert_eq!(history.time_stamps(), vec![0.0, 1.0, 2.0]);
    assert_eq!(history.time(), 2.0);
    assert_eq!(history.shards().len(), 1);
    assert_eq!(stamp_of(&history.retrieve(2.5).unwrap(), ElementKind::Face), Scalar::Float(2.0));

    std::fs::remove_dir(&blocker).unwrap();
    history.record(&sheet, Some(3.0)).unwrap();
    assert_eq!(history.shards().len(), 2);
    assert_eq!(history.shards()[1].stamps, vec![2.0, 3.0]);
    assert_eq!(history.time_stamps(), vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn failed_flush_keeps_the_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let sheet = sheet();
    let mut history = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 4)).unwrap();
    history.record(&sheet, Some(1.0)).unwrap();

    let blocker = dir.path().join("out_0.json.partial");
    std::fs::create_dir(&blocker).unwrap();
    assert!(history.flush().is_err());
    assert!(history.shards().is_empty());
    assert_eq!(history.time_stamps(), vec![0.0, 1.0]);

    std::fs::remove_dir(&blocker).unwrap();
    history.flush().unwrap();
    assert_eq!(history.shards()[0].stamps, vec![0.0, 1.0]);
}

#[test]
fn drift_is_rejected_without_touching_shards() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let mut sheet = sheet();
    let extra = HistoryOptions::default().with_extra_cols(ElementKind::Face, ["area"]);
    let mut history = SegmentedHistory::new(&sheet, &extra, &segment(&manifest, 2)).unwrap();
    history.record(&sheet, None).unwrap();
    history.record(&sheet, None).unwrap();
    let stamps = history.time_stamps();

    sheet
        .table_mut(ElementKind::Face)
        .unwrap()
        .fill_column("area", &Scalar::from("abc"));
    assert!(matches!(
        history.record(&sheet, None),
        Err(HistoryError::SchemaDrift { .. })
    ));
    assert_eq!(history.time_stamps(), stamps);
}

#[test]
fn manifest_reopens_with_every_stamp() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let sheet = sheet();
    let mut history = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 2)).unwrap();
    for _ in 0..3 {
        history.record(&sheet, None).unwrap();
    }
    let path = history.close().unwrap();
    assert!(matches!(
        ArchiveFile::read(&path).unwrap(),
        ArchiveFile::Manifest { .. }
    ));

    let reopened = SegmentedHistory::from_archive(&path).unwrap();
    assert_eq!(reopened.time_stamps(), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(reopened.time(), 3.0);

    let in_memory = History::from_archive(&path).unwrap();
    assert_eq!(in_memory.time_stamps(), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(
        in_memory.retrieve(2.0).unwrap(),
        reopened.retrieve(2.0).unwrap()
    );
}

#[test]
fn full_archive_opens_as_segmented() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("test.json");
    let sheet = sheet();
    let options = HistoryOptions::default().with_extra_cols(ElementKind::Face, ["area"]);
    let mut history = History::new(&sheet, &options).unwrap();
    for _ in 0..3 {
        history.record(&sheet, None).unwrap();
    }
    history.to_archive(&archive).unwrap();

    let segmented = SegmentedHistory::from_archive(&archive).unwrap();
    assert_eq!(segmented.path(), dir.path().join("test_segments.json"));
    let past = segmented.retrieve(2.0).unwrap();
    assert_eq!(past.vert_count(), sheet.vert_count());
    assert_eq!(past, history.retrieve(2.0).unwrap());
}

#[test]
fn segmented_archive_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("out.json");
    let archive = dir.path().join("full.json");
    let sheet = sheet();
    let mut history = SegmentedHistory::new(&sheet, &options(), &segment(&manifest, 3)).unwrap();
    for _ in 0..4 {
        history.record(&sheet, None).unwrap();
    }
    history.to_archive(&archive).unwrap();

    let full = History::from_archive(&archive).unwrap();
    assert_eq!(full.time_stamps(), history.time_stamps());
    for stamp in history.time_stamps() {
        assert_eq!(full.retrieve(stamp).unwrap(), history.retrieve(stamp).unwrap());
    }
}

#[test]
fn trait_object_drives_either_store() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = sheet();
    let stores: Vec<Box<dyn HistoryStore>> = vec![
        Box::new(History::new(&sheet, &options()).unwrap()),
        Box::new(
            SegmentedHistory::new(&sheet, &options(), &segment(&dir.path().join("s.json"), 2))
                .unwrap(),
        ),
    ];
    for mut store in stores {
        store.record(&sheet, None).unwrap();
        store.record(&sheet, None).unwrap();
        store.flush().unwrap();
        assert_eq!(store.time_stamps(), vec![0.0, 1.0, 2.0]);
        assert_eq!(store.retrieve(1.5).unwrap().face_count(), 3);
    }
}
