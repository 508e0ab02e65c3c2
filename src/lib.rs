// Library interface for lapmeter
// This allows integration tests to access internal modules

pub mod config;
pub mod engine;
pub mod errors;
pub mod replay;
pub mod transport;
pub mod writer;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::{
    ControlCommand, LapEngine, MonitorConfig, MonitorOutput, PhysicalConstants, RawPulse,
    SessionEvent, Snapshot,
};
pub use errors::{MonitorError, ValidationError};
pub use transport::Frame;
