// Summaries of logs written by a monitoring run

use rtspmon::core::monitor::{parser, CsvLogWriter};
use rtspmon::core::report::report_file;
use tempfile::TempDir;

#[test]
fn test_report_matches_live_aggregates() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stream_log.csv");

    let lines = [
        "frame=  25 fps= 25 q=-1.0 speed=1.00x",
        "[rtsp @ 0x1] RTP: missed 2 packets",
        "frame=  50 fps= 24 q=-1.0 speed=0.98x",
        "[h264 @ 0x2] concealing 100 DC, 100 AC, 100 MV errors in P frame",
        "[rtsp @ 0x1] max delay reached. need to consume packet",
        "[rtsp @ 0x1] RTP: missed 1 packets",
        "frame=  75 fps= 26 q=-1.0 speed=1.02x",
    ];

    let mut log = CsvLogWriter::open(&path).unwrap();
    for line in lines {
        log.append(&parser::parse(line)).unwrap();
    }
    log.close().unwrap();

    let report = report_file(&path).unwrap();
    assert_eq!(report.rows, 7);
    assert_eq!(report.fps_samples, 3);
    assert_eq!(report.max_delay_events, 1);
    assert_eq!(report.decode_error_lines, 1);
    assert_eq!(report.decode_errors.total(), 300);
    assert_eq!(report.summary.cumulative_missed_packets, 3);
    assert!((report.summary.average_fps - 25.0).abs() < 1e-9);
    assert!((report.summary.average_speed - 1.0).abs() < 1e-9);
    assert!(report.first_timestamp.is_some());
}

#[test]
fn test_report_on_missing_log_fails() {
    let temp_dir = TempDir::new().unwrap();
    assert!(report_file(temp_dir.path().join("absent.csv")).is_err());
}

#[test]
fn test_report_on_header_only_log() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.csv");
    CsvLogWriter::open(&path).unwrap().close().unwrap();

    let report = report_file(&path).unwrap();
    assert_eq!(report.rows, 0);
    assert_eq!(report.first_timestamp, None);
    assert_eq!(report.summary.average_fps, 0.0);
}
