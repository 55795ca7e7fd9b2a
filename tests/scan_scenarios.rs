use std::fs;
use std::io::BufReader;
use std::path::Path;

use flashscan::api::FlashScanner;
use flashscan::config::{OutputTarget, ScanSettings};
use flashscan::core::scan::{
    collapse, read_records, DetectionRecord, FileSink, Frame, Geometry, MemorySource, ResultSink,
    SaveList, ScanError, StopReason,
};

const BACKGROUND: [u8; 3] = [30, 30, 30];
const FLASH: [u8; 3] = [255, 200, 0];

fn frame(index: u64, lit: bool) -> Frame {
    let mut f = Frame::filled(32, 24, BACKGROUND, index);
    if lit {
        f.fill_rect(10, 8, 8, 6, FLASH);
    }
    f
}

fn write_sequence(dir: &Path, count: u64, lit: &[u64]) {
    for i in 0..count {
        let image = frame(i, lit.contains(&i)).into_rgb_image().unwrap();
        image.save(dir.join(format!("frame_{:03}.png", i))).unwrap();
    }
}

fn region() -> Geometry {
    "8x6+10+8".parse().unwrap()
}

#[test]
fn test_image_sequence_to_results_file() {
    let frames = tempfile::tempdir().unwrap();
    write_sequence(frames.path(), 10, &[3, 7]);
    let out = tempfile::tempdir().unwrap();
    let results = out.path().join("saves.csv");

    let scanner = FlashScanner::create(ScanSettings::default());
    let summary = scanner
        .scan(frames.path(), region(), &OutputTarget::File(results.clone()))
        .unwrap();

    assert_eq!(summary.stop, StopReason::Completed);
    assert_eq!(summary.frames_processed, 10);
    assert_eq!(summary.detections, 2);
    assert_eq!(
        fs::read_to_string(&results).unwrap(),
        "frame;value\n3;255.0\n7;255.0\n"
    );
}

#[test]
fn test_no_triggers_leaves_only_header() {
    let frames = tempfile::tempdir().unwrap();
    write_sequence(frames.path(), 4, &[]);
    let out = tempfile::tempdir().unwrap();
    let results = out.path().join("saves.csv");

    let scanner = FlashScanner::create(ScanSettings::default());
    let summary = scanner
        .scan(frames.path(), region(), &OutputTarget::File(results.clone()))
        .unwrap();

    assert_eq!(summary.detections, 0);
    assert_eq!(fs::read_to_string(&results).unwrap(), "frame;value\n");
}

#[test]
fn test_start_frame_skips_earlier_flashes() {
    let frames = tempfile::tempdir().unwrap();
    write_sequence(frames.path(), 10, &[3, 7]);
    let out = tempfile::tempdir().unwrap();
    let results = out.path().join("saves.csv");

    let scanner = FlashScanner::create(ScanSettings {
        start_frame: 5,
        ..Default::default()
    });
    let summary = scanner
        .scan(frames.path(), region(), &OutputTarget::File(results.clone()))
        .unwrap();

    assert_eq!(summary.frames_processed, 5);
    assert_eq!(
        fs::read_to_string(&results).unwrap(),
        "frame;value\n7;255.0\n"
    );
}

#[test]
fn test_region_outside_frame_creates_no_output() {
    let frames = tempfile::tempdir().unwrap();
    write_sequence(frames.path(), 2, &[]);
    let out = tempfile::tempdir().unwrap();
    let results = out.path().join("saves.csv");

    let scanner = FlashScanner::create(ScanSettings::default());
    let err = scanner
        .scan(
            frames.path(),
            Geometry::new(20, 20, 20, 10),
            &OutputTarget::File(results.clone()),
        )
        .unwrap_err();

    assert!(matches!(err, ScanError::Config(_)));
    assert!(!results.exists());
}

#[test]
fn test_source_fault_keeps_earlier_records_on_disk() {
    let frames = (0..8).map(|i| frame(i, i == 1 || i == 3)).collect();
    let mut source = MemorySource::new(frames).unwrap().with_fault_at(4);
    let out = tempfile::tempdir().unwrap();
    let results = out.path().join("saves.csv");
    let mut sink = FileSink::create(&results).unwrap();

    let scanner = FlashScanner::create(ScanSettings::default());
    let err = scanner
        .scan_source(&mut source, region(), &mut sink)
        .unwrap_err();
    sink.close().unwrap();

    assert!(matches!(err, ScanError::SourceFault { frame_index: 4, .. }));
    assert_eq!(
        fs::read_to_string(&results).unwrap(),
        "frame;value\n1;255.0\n3;255.0\n"
    );
}

#[test]
fn test_results_collapse_into_save_list() {
    let frames = (0..12).map(|i| frame(i, matches!(i, 2 | 3 | 4 | 9))).collect();
    let mut source = MemorySource::new(frames).unwrap();
    let mut records: Vec<DetectionRecord> = Vec::new();

    let scanner = FlashScanner::create(ScanSettings::default());
    scanner
        .scan_source(&mut source, region(), &mut records)
        .unwrap();

    let text: String = std::iter::once("frame;value".to_string())
        .chain(records.iter().map(|r| r.to_line()))
        .map(|l| l + "\n")
        .collect();
    let parsed = read_records(BufReader::new(text.as_bytes())).unwrap();
    assert_eq!(parsed, records);

    let events = collapse(&parsed, 1);
    assert_eq!(events.len(), 2);
    assert_eq!((events[0].first_frame, events[0].last_frame), (2, 4));

    let saves = SaveList::from_events(&events, 3.0);
    assert_eq!(saves.saves, vec![2, 9]);
    assert_eq!(saves.seconds, vec![2.0 / 3.0, 3.0]);
}
