use std::sync::mpsc::{Receiver, Sender};

use log::{debug, warn};

use crate::errors::MonitorError;
use crate::transport::Frame;

use super::{MonitorConfig, MonitorOutput, SessionEvent, SessionSummary, ingest, session::LapEngine};

/// Drains session events in arrival order and drives the lap engine.
///
/// Pulses and commands share one channel, so a command can never interleave
/// with a half-processed pulse. Every event is teed to the optional recorder
/// before processing; the recording is the raw session log, so invalid
/// pulses are kept and re-validated on replay. Returns the session summary
/// once every sender has been dropped.
pub fn run_session(
    events: Receiver<SessionEvent>,
    output_sender: Sender<MonitorOutput>,
    recorder_sender: Option<Sender<Frame>>,
    config: MonitorConfig,
) -> Result<Option<SessionSummary>, MonitorError> {
    let mut engine = LapEngine::new(config);
    let mut recorder = recorder_sender;

    for event in &events {
        if let Some(sender) = &recorder {
            // recording is best-effort; a dead recorder stops the tee only
            if sender.send(Frame::from_event(&event)).is_err() {
                warn!("session recorder is gone, recording stopped");
                recorder = None;
            }
        }
        match event {
            SessionEvent::Pulse(pulse) => {
                if !engine.is_monitoring() {
                    debug!("monitoring is off, pulse from {} dropped", pulse.from);
                    continue;
                }
                let validated = match ingest::validate(&pulse) {
                    Ok(validated) => validated,
                    Err(e) => {
                        warn!("invalid pulse from {} dropped: {}", pulse.from, e);
                        continue;
                    }
                };
                if let Some(output) = engine.process_pulse(validated) {
                    output_sender.send(output)?;
                }
            }
            SessionEvent::Command(command) => {
                if let Some(output) = engine.apply_command(command) {
                    output_sender.send(output)?;
                }
            }
        }
    }
    Ok(engine.summary())
}
