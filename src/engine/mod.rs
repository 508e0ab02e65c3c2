pub(crate) mod collector;
pub mod ingest;
pub mod session;
pub mod velocity;
pub mod window;

pub use collector::run_session;
pub use session::LapEngine;

use serde::{Deserialize, Serialize};
use uom::si::f64::Velocity;
use uom::si::velocity::meter_per_second;

use crate::errors::MonitorError;

/// Physical constants used to derive speed from a raw measurement.
///
/// `l_mm / t_ms` comes out in meters per second because millimeters over
/// milliseconds cancel to m/s.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhysicalConstants {
    /// Calibration length of the measured segment, millimeters
    pub l_mm: f64,
    /// Sensor wheel radius
    pub r1: f64,
    /// Driven wheel radius
    pub r2: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            l_mm: 3.0,
            r1: 0.035,
            r2: 15.0,
        }
    }
}

impl PhysicalConstants {
    pub fn validate(&self) -> Result<(), MonitorError> {
        for (name, value) in [("L", self.l_mm), ("R1", self.r1), ("R2", self.r2)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MonitorError::InvalidConstants {
                    reason: format!("{name} must be a positive finite number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Tunable parameters read by the engine on every computation. Changes take
/// effect on the next pulse; already-recorded laps are never recomputed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// Best-combination window size, laps
    pub window_laps: usize,
    /// How many lap records a snapshot carries for the detail view
    pub lap_display_limit: usize,
    /// How many velocity samples a snapshot carries for the chart
    pub velocity_display_limit: usize,
    pub constants: PhysicalConstants,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_laps: 3,
            lap_display_limit: 1000,
            velocity_display_limit: 100,
            constants: PhysicalConstants::default(),
        }
    }
}

/// One raw measurement event as delivered by the transport, before
/// validation. `data` is the measurement text exactly as the device sent it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RawPulse {
    pub data: String,
    pub from: String,
    pub timestamp_ms: u64,
}

/// A pulse that passed validation: a finite, positive measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValidatedPulse {
    pub value_ms: f64,
    pub timestamp_ms: u64,
}

/// One completed measurement interval, derived from two consecutive pulses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapRecord {
    /// Sequential lap number starting at 1, gapless within a session
    pub lap_number: u64,
    /// Wall-clock interval since the previous pulse plus the raw measurement
    pub duration_ms: f64,
    /// The originating sensor measurement for this lap
    pub raw_measurement_ms: f64,
    /// Wall-clock interval since the previous pulse
    pub interval_ms: f64,
    /// Capture time, epoch milliseconds
    pub timestamp_ms: u64,
}

/// Speed estimate derived from one raw measurement.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VelocitySample {
    pub timestamp_ms: u64,
    pub raw_measurement_ms: f64,
    /// Primary velocity over the calibration length, m/s
    pub v1_mps: f64,
    /// Wheel-ratio scaled velocity, m/s
    pub v2_mps: f64,
}

impl VelocitySample {
    pub fn primary_velocity(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.v1_mps)
    }

    pub fn scaled_velocity(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.v2_mps)
    }
}

/// A contiguous run of `size` laps evaluated for minimum total duration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WindowCombo {
    pub start_lap: u64,
    pub end_lap: u64,
    pub total_duration_ms: f64,
    pub is_best: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WindowSnapshot {
    pub size: usize,
    pub has_enough_data: bool,
    /// Total duration of the most recent `size` laps
    pub recent_total_ms: Option<f64>,
    pub best_duration_ms: Option<f64>,
    pub combinations: Vec<WindowCombo>,
}

/// Immutable summary of the engine state, emitted once per recorded lap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Laps recorded since the session started; not capped by display limits
    pub lap_count: u64,
    pub total_duration_ms: f64,
    pub latest_lap: Option<LapRecord>,
    /// None when the latest lap produced a non-finite derivation
    pub latest_velocity: Option<VelocitySample>,
    /// Detail view records, capped to the display limit from the oldest end
    pub laps: Vec<LapRecord>,
    /// Chart series, capped to the velocity display limit
    pub velocity_series: Vec<VelocitySample>,
    pub window: WindowSnapshot,
}

/// Aggregate statistics over the whole session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub total_laps: u64,
    pub total_duration_ms: f64,
    pub avg_lap_ms: f64,
    pub fastest_lap_ms: f64,
    pub slowest_lap_ms: f64,
    pub velocity_points: usize,
}

/// Commands accepted by the engine's control surface. Also the payload of
/// control frames exchanged with the relay.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    Start,
    Stop,
    Reset,
    SetWindowSize { window_laps: usize },
    SetConstants { constants: PhysicalConstants },
}

/// Everything the session event loop reacts to, in arrival order.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Pulse(RawPulse),
    Command(ControlCommand),
}

/// What the engine emits to presentation and recording sinks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MonitorOutput {
    /// First accepted pulse of a session; establishes the time baseline
    /// without recording a lap
    Baseline { timestamp_ms: u64 },
    Lap(Box<Snapshot>),
    SessionReset,
}
