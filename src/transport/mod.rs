pub mod client;
pub mod mock;
pub mod relay;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::engine::{ControlCommand, RawPulse, SessionEvent};

/// Frames exchanged between the relay and dashboard clients, and the line
/// format of session recordings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Raw measurement text exactly as the device sent it
    Pulse {
        data: String,
        from: String,
        timestamp_ms: u64,
    },
    Control { command: ControlCommand },
}

impl Frame {
    pub fn from_event(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::Pulse(pulse) => Frame::Pulse {
                data: pulse.data.clone(),
                from: pulse.from.clone(),
                timestamp_ms: pulse.timestamp_ms,
            },
            SessionEvent::Command(command) => Frame::Control {
                command: command.clone(),
            },
        }
    }

    pub fn into_event(self) -> SessionEvent {
        match self {
            Frame::Pulse {
                data,
                from,
                timestamp_ms,
            } => SessionEvent::Pulse(RawPulse {
                data,
                from,
                timestamp_ms,
            }),
            Frame::Control { command } => SessionEvent::Command(command),
        }
    }
}

pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
