// End-to-end session tests against a scripted stand-in for ffmpeg

#![cfg(unix)]

use rtspmon::core::monitor::{
    read_log, LineClass, MonitorConfig, MonitorEvent, MonitorSession, SessionOptions,
    SessionState, SupervisorOptions,
};
use rtspmon::MonitorError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const PROGRESS: &str =
    "frame= 120 fps= 25.0 q=-1.0 size=N/A time=00:00:05.00 bitrate=N/A speed=1.02x";
const MAX_DELAY: &str = "[rtsp @ 0x55d1c8e0] max delay reached. need to consume packet";

fn fake_probe(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-ffmpeg");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn test_options() -> SessionOptions {
    SessionOptions {
        snapshot_period: Duration::from_millis(100),
        supervisor: SupervisorOptions {
            launch_grace: Duration::from_millis(200),
            stop_timeout: Duration::from_secs(2),
        },
    }
}

/// Collect events until `done` matches one of them or the timeout passes
fn collect_until<F>(
    rx: &mut rtspmon::core::monitor::EventReceiver,
    timeout: Duration,
    mut done: F,
) -> Vec<MonitorEvent>
where
    F: FnMut(&MonitorEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    while Instant::now() < deadline {
        match rx.try_recv() {
            Ok(event) => {
                let finished = done(&event);
                events.push(event);
                if finished {
                    break;
                }
            }
            Err(_) => thread::sleep(Duration::from_millis(10)),
        }
    }
    events
}

fn raw_texts(events: &[MonitorEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::RawLine(raw) => Some(raw.text.clone()),
            _ => None,
        })
        .collect()
}

fn states(events: &[MonitorEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

#[test]
fn test_sample_lines_are_published_and_logged() {
    let dir = TempDir::new().unwrap();
    let probe = fake_probe(
        dir.path(),
        &format!(
            "printf '%s\\r' '{}' >&2\necho '{}' >&2\nexec sleep 30",
            PROGRESS, MAX_DELAY
        ),
    );
    let log_path = dir.path().join("stream_log.csv");

    let (mut session, mut rx) = MonitorSession::new(test_options()).unwrap();
    session
        .start(
            &MonitorConfig::new("rtsp://camera.local/stream")
                .with_executable(&probe)
                .with_log_path(&log_path),
        )
        .unwrap();
    assert!(session.is_running());

    let mut seen = 0;
    let events = collect_until(&mut rx, Duration::from_secs(5), |e| {
        if matches!(e, MonitorEvent::RawLine(_)) {
            seen += 1;
        }
        seen == 2
    });

    let raws: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::RawLine(raw) => Some(raw.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(raws.len(), 2);
    assert_eq!(raws[0].text, PROGRESS);
    assert_eq!(raws[0].class, LineClass::Fps);
    assert_eq!(raws[1].text, MAX_DELAY);
    assert_eq!(raws[1].class, LineClass::Error);

    let stats = session.aggregator();
    assert_eq!(stats.fps_count(), 1);
    assert!((stats.fps_sum() - 25.0).abs() < 1e-9);

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);

    let rows = read_log(&log_path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].fps, Some(25.0));
    assert_eq!(rows[0].speed, Some(1.02));
    assert!(!rows[0].max_delay_reached);
    assert!(rows[1].max_delay_reached);
    assert_eq!(rows[1].fps, None);
}

#[test]
fn test_extra_args_reach_the_probe() {
    let dir = TempDir::new().unwrap();
    let probe = fake_probe(dir.path(), "echo \"args: $*\" >&2\nexec sleep 30");

    let (mut session, mut rx) = MonitorSession::new(test_options()).unwrap();
    session
        .start(
            &MonitorConfig::new("rtsp://cam/stream")
                .with_executable(&probe)
                .with_log_path(dir.path().join("log.csv"))
                .with_extra_args("-rtsp_transport tcp"),
        )
        .unwrap();

    let events = collect_until(&mut rx, Duration::from_secs(5), |e| {
        matches!(e, MonitorEvent::RawLine(_))
    });
    session.stop();

    assert_eq!(
        raw_texts(&events),
        vec!["args: -i rtsp://cam/stream -rtsp_transport tcp -f null -".to_string()]
    );
}

#[test]
fn test_probe_exiting_during_startup_is_launch_error() {
    let dir = TempDir::new().unwrap();
    let probe = fake_probe(
        dir.path(),
        "echo 'rtsp://cam/stream: Invalid data found when processing input' >&2\nexit 1",
    );

    let (mut session, mut rx) = MonitorSession::new(test_options()).unwrap();
    let result = session.start(
        &MonitorConfig::new("rtsp://cam/stream")
            .with_executable(&probe)
            .with_log_path(dir.path().join("log.csv")),
    );

    match result {
        Err(MonitorError::Launch { diagnostics, .. }) => {
            assert!(diagnostics.contains("Invalid data found"), "{}", diagnostics);
        }
        other => panic!("expected launch error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(session.state(), SessionState::Idle);

    let events = collect_until(&mut rx, Duration::from_millis(300), |_| false);
    assert_eq!(
        states(&events),
        vec![SessionState::Starting, SessionState::Failed, SessionState::Idle]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        MonitorEvent::Diagnostic { message, .. } if message.contains("Invalid data found")
    )));
    assert!(raw_texts(&events).is_empty());
}

#[test]
fn test_stop_terminates_probe_and_reports_states() {
    let dir = TempDir::new().unwrap();
    let probe = fake_probe(dir.path(), "exec sleep 30");

    let (mut session, mut rx) = MonitorSession::new(test_options()).unwrap();
    session
        .start(
            &MonitorConfig::new("rtsp://cam/stream")
                .with_executable(&probe)
                .with_log_path(dir.path().join("log.csv")),
        )
        .unwrap();

    let started = Instant::now();
    session.stop();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(session.state(), SessionState::Idle);

    let events = collect_until(&mut rx, Duration::from_millis(300), |_| false);
    let states = states(&events);
    assert_eq!(
        &states[..2],
        &[SessionState::Starting, SessionState::Running]
    );
    assert_eq!(
        &states[states.len() - 2..],
        &[SessionState::Stopping, SessionState::Idle]
    );
    assert!(events.iter().any(|e| matches!(e, MonitorEvent::Stopped)));

    // Second stop is a no-op
    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(collect_until(&mut rx, Duration::from_millis(100), |_| false).is_empty());
}

#[test]
fn test_stop_kills_probe_ignoring_sigterm() {
    let dir = TempDir::new().unwrap();
    let probe = fake_probe(dir.path(), "trap '' TERM\nwhile true; do sleep 0.1; done");

    let mut options = test_options();
    options.supervisor.stop_timeout = Duration::from_millis(300);

    let (mut session, _rx) = MonitorSession::new(options).unwrap();
    session
        .start(
            &MonitorConfig::new("rtsp://cam/stream")
                .with_executable(&probe)
                .with_log_path(dir.path().join("log.csv")),
        )
        .unwrap();

    let started = Instant::now();
    session.stop();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_stop_reaches_processes_started_by_wrapper() {
    let dir = TempDir::new().unwrap();
    // Wrapper script: `sleep` runs as a child holding stderr, not via exec
    let probe = fake_probe(dir.path(), "echo 'fps=25' >&2\nsleep 8\necho done >&2");

    let (mut session, mut rx) = MonitorSession::new(test_options()).unwrap();
    session
        .start(
            &MonitorConfig::new("rtsp://cam/stream")
                .with_executable(&probe)
                .with_log_path(dir.path().join("log.csv")),
        )
        .unwrap();
    collect_until(&mut rx, Duration::from_secs(5), |e| {
        matches!(e, MonitorEvent::RawLine(_))
    });

    let started = Instant::now();
    session.stop();
    let took = started.elapsed();
    assert!(took < Duration::from_secs(3), "stop took {:?}", took);
    assert_eq!(session.state(), SessionState::Idle);

    let events = collect_until(&mut rx, Duration::from_millis(200), |_| false);
    assert!(!raw_texts(&events).contains(&"done".to_string()));
}

#[test]
fn test_launch_failure_with_background_child_returns_promptly() {
    let dir = TempDir::new().unwrap();
    let probe = fake_probe(
        dir.path(),
        "echo 'Connection refused' >&2\nsleep 8 &\nexit 1",
    );

    let (mut session, _rx) = MonitorSession::new(test_options()).unwrap();
    let started = Instant::now();
    let result = session.start(
        &MonitorConfig::new("rtsp://cam/stream")
            .with_executable(&probe)
            .with_log_path(dir.path().join("log.csv")),
    );
    let took = started.elapsed();

    assert!(took < Duration::from_secs(3), "start took {:?}", took);
    match result {
        Err(MonitorError::Launch { diagnostics, .. }) => {
            assert!(diagnostics.contains("Connection refused"), "{}", diagnostics);
        }
        other => panic!("expected launch error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_probe_ending_on_its_own_returns_to_idle() {
    let dir = TempDir::new().unwrap();
    let probe = fake_probe(
        dir.path(),
        "echo 'frame=1 fps=30 speed=1.0x' >&2\nsleep 1\necho 'frame=2 fps=10 speed=1.0x' >&2",
    );

    let (mut session, mut rx) = MonitorSession::new(test_options()).unwrap();
    session
        .start(
            &MonitorConfig::new("rtsp://cam/stream")
                .with_executable(&probe)
                .with_log_path(dir.path().join("log.csv")),
        )
        .unwrap();

    let events = collect_until(&mut rx, Duration::from_secs(5), |e| {
        matches!(e, MonitorEvent::StateChanged(SessionState::Idle))
    });

    let stopped = events
        .iter()
        .position(|e| matches!(e, MonitorEvent::Stopped))
        .expect("Stopped event");
    assert!(!events[stopped..]
        .iter()
        .any(|e| matches!(e, MonitorEvent::Snapshot(_))));
    assert_eq!(states(&events).last(), Some(&SessionState::Idle));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(raw_texts(&events).len(), 2);

    let snapshots: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Snapshot(s) => Some(s.clone()),
            _ => None,
        })
        .collect();
    assert!(!snapshots.is_empty());
    for pair in snapshots.windows(2) {
        assert!(pair[1].elapsed_seconds > pair[0].elapsed_seconds);
    }
    assert!(session.series().len() >= snapshots.len());
    assert_eq!(session.aggregator().snapshot(0.0, String::new()).average_fps, 20.0);

    // The series stops growing once the session is idle
    thread::sleep(Duration::from_millis(150));
    let settled = session.series().len();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(session.series().len(), settled);
}

#[test]
fn test_start_replaces_running_session() {
    let dir = TempDir::new().unwrap();
    let first_dir = dir.path().join("first");
    let second_dir = dir.path().join("second");
    fs::create_dir_all(&first_dir).unwrap();
    fs::create_dir_all(&second_dir).unwrap();

    let first = fake_probe(&first_dir, "echo 'fps=50' >&2\nexec sleep 30");
    let second = fake_probe(&second_dir, "exec sleep 30");

    let (mut session, mut rx) = MonitorSession::new(test_options()).unwrap();
    session
        .start(
            &MonitorConfig::new("rtsp://cam/one")
                .with_executable(&first)
                .with_log_path(dir.path().join("one.csv")),
        )
        .unwrap();
    collect_until(&mut rx, Duration::from_secs(5), |e| {
        matches!(e, MonitorEvent::RawLine(_))
    });
    assert_eq!(session.aggregator().fps_count(), 1);

    session
        .start(
            &MonitorConfig::new("rtsp://cam/two")
                .with_executable(&second)
                .with_log_path(dir.path().join("two.csv")),
        )
        .unwrap();

    assert!(session.is_running());
    // Counters start over for the new session
    assert_eq!(session.aggregator().fps_count(), 0);

    let events = collect_until(&mut rx, Duration::from_millis(300), |_| false);
    let states = states(&events);
    assert_eq!(
        &states[..],
        &[
            SessionState::Stopping,
            SessionState::Idle,
            SessionState::Starting,
            SessionState::Running
        ]
    );

    session.stop();
    assert_eq!(read_log(dir.path().join("one.csv")).unwrap().len(), 1);
    assert!(read_log(dir.path().join("two.csv")).unwrap().is_empty());
}
