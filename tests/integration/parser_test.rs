// Integration tests for line parsing and aggregation working together

use rtspmon::core::monitor::{parser, LineClass, RawLine, StatsAggregator, SPEED_WINDOW};

#[test]
fn test_well_formed_fps_is_extracted_exactly() {
    for value in ["0", "1", "12.5", "25.0", "29.97", "59.94", "120"] {
        let line = format!("frame= 1 fps={} q=-1.0", value);
        let expected: f64 = value.parse().unwrap();
        assert_eq!(parser::parse(&line).fps(), Some(expected), "line {:?}", line);
    }
}

#[test]
fn test_lines_without_fps_token() {
    for line in [
        "Input #0, rtsp, from 'rtsp://example/stream':",
        "  Duration: N/A, start: 0.000000, bitrate: N/A",
        "Stream #0:0: Video: h264 (High), yuv420p, 1920x1080, 25 fps, 25 tbr",
        "Press [q] to stop, [?] for help",
    ] {
        assert_eq!(parser::parse(line).fps(), None, "line {:?}", line);
    }
}

#[test]
fn test_missed_packets_sum_within_session() {
    let stats = StatsAggregator::new();
    stats.update(&parser::parse("[rtsp @ 0x1] RTP: missed 3 packets"));
    stats.update(&parser::parse("frame= 10 fps= 25.0 speed=1.0x"));
    stats.update(&parser::parse("[rtsp @ 0x1] RTP: missed 2 packets"));
    assert_eq!(stats.snapshot(1.0, String::new()).cumulative_missed_packets, 5);
}

#[test]
fn test_sixty_speeds_keep_last_fifty() {
    let stats = StatsAggregator::new();
    let speeds: Vec<f64> = (0..60).map(|i| 0.5 + i as f64 * 0.01).collect();
    for speed in &speeds {
        stats.update(&parser::parse(&format!("speed={}x", speed)));
    }

    assert_eq!(stats.speed_window_len(), SPEED_WINDOW);
    let expected = speeds[10..].iter().sum::<f64>() / 50.0;
    let actual = stats.snapshot(1.0, String::new()).average_speed;
    assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
}

#[test]
fn test_average_fps_of_ten_twenty_thirty() {
    let stats = StatsAggregator::new();
    for fps in [10, 20, 30] {
        stats.update(&parser::parse(&format!("fps={}", fps)));
    }
    assert_eq!(stats.snapshot(1.0, String::new()).average_fps, 20.0);
}

#[test]
fn test_line_reporting_everything_at_once() {
    let record = parser::parse(
        "fps=24 speed=0.9x missed 7 packets max delay reached concealing 1 DC, 2 AC, 3 MV errors",
    );
    assert_eq!(record.fps(), Some(24.0));
    assert_eq!(record.speed(), Some(0.9));
    assert_eq!(record.missed_packets(), Some(7));
    assert!(record.max_delay());
    let errs = record.decode_errors().unwrap();
    assert_eq!((errs.dc, errs.ac, errs.mv), (1, 2, 3));

    let raw = RawLine::new(String::new(), record.raw_line().to_string());
    assert_eq!(raw.class, LineClass::Error);
}
