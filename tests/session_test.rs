// Integration tests for the lap session pipeline
//
// Drives the public collector API the way the live command wires it:
// session events in, monitor outputs plus a raw recording out, then replays
// the recording through a fresh engine and compares the results.

use std::sync::mpsc;
use std::thread;

use lapmeter::engine::{
    ControlCommand, MonitorConfig, MonitorOutput, RawPulse, SessionEvent, run_session,
};
use lapmeter::replay::replay_recording;
use lapmeter::transport::Frame;
use lapmeter::writer::write_recording;

fn pulse(data: &str, timestamp_ms: u64) -> SessionEvent {
    SessionEvent::Pulse(RawPulse {
        data: data.to_string(),
        from: "10.0.0.7:8888".to_string(),
        timestamp_ms,
    })
}

/// A short session: a baseline pulse followed by four laps.
fn worked_example_events() -> Vec<SessionEvent> {
    vec![
        SessionEvent::Command(ControlCommand::Start),
        pulse("0.5", 10_000),
        pulse("0.4", 11_000),
        pulse("0.6", 11_900),
        pulse("0.5", 13_000),
        pulse("0.3", 13_950),
    ]
}

fn expected_best_window() -> f64 {
    let d1 = 1000.0 + 0.4;
    let d2 = 900.0 + 0.6;
    let d3 = 1100.0 + 0.5;
    let d4 = 950.0 + 0.3;
    d1 + d2 + d3 - d1 + d4
}

fn run_events(
    events: Vec<SessionEvent>,
    recorder: Option<mpsc::Sender<Frame>>,
) -> (Vec<MonitorOutput>, Option<lapmeter::engine::SessionSummary>) {
    let (event_tx, event_rx) = mpsc::channel();
    let (output_tx, output_rx) = mpsc::channel();
    for event in events {
        event_tx.send(event).unwrap();
    }
    drop(event_tx);
    let summary = run_session(event_rx, output_tx, recorder, MonitorConfig::default()).unwrap();
    (output_rx.iter().collect(), summary)
}

#[test]
fn test_worked_example_end_to_end() {
    let (outputs, summary) = run_events(worked_example_events(), None);

    // one baseline followed by one snapshot per lap
    assert_eq!(outputs.len(), 5);
    assert!(matches!(outputs[0], MonitorOutput::Baseline { .. }));
    let last = match &outputs[4] {
        MonitorOutput::Lap(snapshot) => snapshot,
        other => panic!("expected a lap snapshot, got {:?}", other),
    };

    assert_eq!(last.lap_count, 4);
    assert_eq!(last.window.size, 3);
    assert!(last.window.has_enough_data);
    assert_eq!(last.window.combinations.len(), 2);
    assert_eq!(last.window.best_duration_ms, Some(expected_best_window()));
    // the sliding window beat the opening one
    assert!(!last.window.combinations[0].is_best);
    assert!(last.window.combinations[1].is_best);
    assert_eq!(last.window.combinations[1].start_lap, 2);
    assert_eq!(last.window.combinations[1].end_lap, 4);

    let summary = summary.unwrap();
    assert_eq!(summary.total_laps, 4);
    assert_eq!(summary.velocity_points, 4);
}

#[test]
fn test_record_then_replay_round_trip() {
    let workdir = tempfile::tempdir().unwrap();
    let recording_path = workdir.path().join("session.jsonl");

    let mut events = worked_example_events();
    // raw garbage is recorded too and must replay the same way
    events.insert(4, pulse("garbage", 12_000));

    let (recorder_tx, recorder_rx) = mpsc::channel();
    let writer_path = recording_path.clone();
    let writer = thread::spawn(move || write_recording(&writer_path, recorder_rx));

    let (live_outputs, live_summary) = run_events(events, Some(recorder_tx));
    writer.join().unwrap().unwrap();

    let report = replay_recording(&recording_path, MonitorConfig::default()).unwrap();
    assert_eq!(report.dropped_pulses, 1);
    assert_eq!(report.snapshot.lap_count, 4);
    assert_eq!(
        report.snapshot.window.best_duration_ms,
        Some(expected_best_window())
    );

    // the replay reproduces the live session lap for lap
    let live_last = match live_outputs.last().unwrap() {
        MonitorOutput::Lap(snapshot) => snapshot,
        other => panic!("expected a lap snapshot, got {:?}", other),
    };
    assert_eq!(report.snapshot.laps, live_last.laps);
    assert_eq!(report.summary, live_summary);
}

#[test]
fn test_reset_mid_session_restarts_calibration() {
    let events = vec![
        SessionEvent::Command(ControlCommand::Start),
        pulse("0.5", 1_000),
        pulse("0.5", 2_000),
        SessionEvent::Command(ControlCommand::Reset),
        SessionEvent::Command(ControlCommand::Start),
        pulse("0.5", 5_000),
        pulse("0.5", 6_000),
    ];
    let (outputs, summary) = run_events(events, None);

    assert_eq!(outputs.len(), 5);
    assert!(matches!(outputs[0], MonitorOutput::Baseline { .. }));
    assert!(matches!(outputs[1], MonitorOutput::Lap(_)));
    assert!(matches!(outputs[2], MonitorOutput::SessionReset));
    // the pulse after reset is a baseline again, not lap 2
    assert!(matches!(
        outputs[3],
        MonitorOutput::Baseline {
            timestamp_ms: 5_000
        }
    ));
    match &outputs[4] {
        MonitorOutput::Lap(snapshot) => {
            assert_eq!(snapshot.lap_count, 1);
            assert_eq!(snapshot.latest_lap.as_ref().unwrap().lap_number, 1);
        }
        other => panic!("expected a lap snapshot, got {:?}", other),
    }
    assert_eq!(summary.unwrap().total_laps, 1);
}

#[test]
fn test_window_size_command_rebuilds_live() {
    let mut events = worked_example_events();
    events.push(SessionEvent::Command(ControlCommand::SetWindowSize {
        window_laps: 2,
    }));
    events.push(pulse("0.5", 15_000));
    let (outputs, _) = run_events(events, None);

    let last = match outputs.last().unwrap() {
        MonitorOutput::Lap(snapshot) => snapshot,
        other => panic!("expected a lap snapshot, got {:?}", other),
    };
    assert_eq!(last.window.size, 2);
    // five laps with a window of two laps make four combinations
    assert_eq!(last.window.combinations.len(), 4);
}
