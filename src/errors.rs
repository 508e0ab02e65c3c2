// Error types for lapmeter

use crate::engine::MonitorOutput;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

/// Rejection reasons for a raw pulse value. These are recovered locally by
/// the ingestion gate: the pulse is dropped and logged, never fatal.
#[derive(Debug, Snafu, Clone, PartialEq)]
pub enum ValidationError {
    #[snafu(display("Pulse value is not a number: {raw:?}"))]
    NotANumber { raw: String },
    #[snafu(display("Pulse value is not finite: {value}"))]
    NonFinite { value: f64 },
    #[snafu(display("Pulse value must be greater than zero: {value}"))]
    NonPositive { value: f64 },
}

#[derive(Debug, Snafu)]
pub enum MonitorError {
    // Errors for the pulse relay
    #[snafu(display("Unable to bind relay socket"))]
    RelayBindError { source: io::Error },
    #[snafu(display("WebSocket transport error"))]
    WebSocketError {
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[snafu(display("Gave up reconnecting to the relay after {attempts} attempts"))]
    ReconnectAttemptsExhausted { attempts: u32 },
    #[snafu(display("Unable to open mock pulse socket"))]
    MockSocketError { source: io::Error },

    // Errors while feeding session outputs to sinks
    #[snafu(display("Error broadcasting session output"))]
    OutputBroadcastError {
        source: Box<SendError<MonitorOutput>>,
    },

    // Control surface errors; the prior configuration stays in effect
    #[snafu(display("Window size must be at least 1 lap, got {value}"))]
    InvalidWindowSize { value: usize },
    #[snafu(display("Invalid physical constants: {reason}"))]
    InvalidConstants { reason: String },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Errors for the session recorder
    #[snafu(display("Error writing session recording"))]
    WriterError { source: io::Error },

    // Recording replay errors
    #[snafu(display("Invalid recording file: {path}"))]
    InvalidRecordingFile { path: String },
    #[snafu(display("Error loading recording file"))]
    RecordingLoadError { source: io::Error },
}

impl From<SendError<MonitorOutput>> for MonitorError {
    fn from(value: SendError<MonitorOutput>) -> Self {
        MonitorError::OutputBroadcastError {
            source: Box::new(value),
        }
    }
}
