//! Landing copies and the change-detection gate.

use std::fs;
use stockflow::bronze::LandingCopier;
use stockflow::detect::ChangeDetector;
use stockflow::testing::fixtures::set_mtime;
use stockflow::testing::DataLayout;
use tempfile::TempDir;

#[test]
fn copying_twice_yields_identical_landing_files() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_raw_defaults();
    let copier = LandingCopier::new(layout.raw_dir(), layout.landing_dir(), "csv");

    let first = copier.copy_all().unwrap();
    let snapshot: Vec<_> = first
        .files
        .iter()
        .map(|f| fs::read(layout.landing_dir().join(&f.file_name)).unwrap())
        .collect();

    let second = copier.copy_all().unwrap();
    assert_eq!(first, second);
    for (file, bytes) in second.files.iter().zip(&snapshot) {
        assert_eq!(&fs::read(layout.landing_dir().join(&file.file_name)).unwrap(), bytes);
        assert_eq!(
            &fs::read(layout.raw_dir().join(&file.file_name)).unwrap(),
            bytes
        );
    }
}

#[test]
fn gate_with_unset_watermark_depends_only_on_presence() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.create_raw_dir();
    let detector = ChangeDetector::new(layout.raw_dir(), "csv");

    assert!(!detector.check(None).unwrap().should_run);

    let path = layout.write_raw("only.csv", "a\n1\n");
    set_mtime(&path, 1.0);
    assert!(detector.check(None).unwrap().should_run);
}

#[test]
fn gate_with_watermark_is_strictly_newer() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    let times = [100.0, 300.0, 200.0];
    for (i, t) in times.iter().enumerate() {
        let path = layout.write_raw(&format!("t{i}.csv"), "a\n1\n");
        set_mtime(&path, *t);
    }
    let detector = ChangeDetector::new(layout.raw_dir(), "csv");

    for (watermark, expected) in [(50.0, true), (299.5, true), (300.0, false), (1e9, false)] {
        let decision = detector.check(Some(watermark)).unwrap();
        assert_eq!(decision.should_run, expected, "watermark {watermark}");
        assert_eq!(decision.latest_modified, Some(300.0));
        assert_eq!(decision.file_count, 3);
    }
}

#[test]
fn gate_never_writes() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_raw_defaults();
    ChangeDetector::new(layout.raw_dir(), "csv")
        .check(None)
        .unwrap();
    assert!(!layout.landing_dir().exists());
    assert_eq!(fs::read_dir(layout.raw_dir()).unwrap().count(), 3);
}
