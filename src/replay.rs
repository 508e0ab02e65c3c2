use std::path::PathBuf;

use log::{info, warn};

use crate::engine::{LapEngine, MonitorConfig, SessionEvent, SessionSummary, Snapshot, ingest};
use crate::errors::MonitorError;
use crate::transport::Frame;

/// Outcome of replaying a recorded session file.
pub struct ReplayReport {
    pub snapshot: Snapshot,
    pub summary: Option<SessionSummary>,
    pub dropped_pulses: usize,
}

/// Re-runs the engine over a JSON Lines recording of session frames.
///
/// Pulses are re-validated on the way in, so a recording containing raw
/// garbage replays the same way the live session handled it. Recordings
/// without control frames are started implicitly.
pub fn replay_recording(
    source_file: &PathBuf,
    config: MonitorConfig,
) -> Result<ReplayReport, MonitorError> {
    if !source_file.exists() {
        return Err(MonitorError::InvalidRecordingFile {
            path: format!("{:?}", source_file),
        });
    }
    let frames = serde_jsonlines::json_lines(source_file)
        .map_err(|e| MonitorError::RecordingLoadError { source: e })?
        .collect::<Result<Vec<Frame>, std::io::Error>>()
        .map_err(|e| MonitorError::RecordingLoadError { source: e })?;

    let mut engine = LapEngine::new(config);
    engine.start();
    let mut dropped_pulses = 0usize;
    for frame in frames {
        match frame.into_event() {
            SessionEvent::Pulse(pulse) => {
                if !engine.is_monitoring() {
                    continue;
                }
                match ingest::validate(&pulse) {
                    Ok(validated) => {
                        engine.process_pulse(validated);
                    }
                    Err(e) => {
                        dropped_pulses += 1;
                        warn!("invalid recorded pulse dropped: {}", e);
                    }
                }
            }
            SessionEvent::Command(command) => {
                engine.apply_command(command);
            }
        }
    }
    info!(
        "replayed {:?}: {} laps, {} invalid pulses dropped",
        source_file,
        engine.lap_count(),
        dropped_pulses
    );
    Ok(ReplayReport {
        snapshot: engine.snapshot(),
        summary: engine.summary(),
        dropped_pulses,
    })
}
