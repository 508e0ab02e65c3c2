use itertools::Itertools;
use itertools::MinMaxResult;
use log::{debug, info, warn};

use crate::errors::MonitorError;

use super::{
    ControlCommand, LapRecord, MonitorConfig, MonitorOutput, PhysicalConstants, SessionSummary,
    Snapshot, ValidatedPulse, VelocitySample, velocity, window::WindowStats,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No session running
    Idle,
    /// Session started, waiting for the baseline pulse
    Calibrating,
    /// Steady state, every accepted pulse completes a lap
    Recording,
    /// Monitoring suspended, lap history retained
    Paused,
}

/// Stateful incremental aggregator turning validated pulses into lap
/// records, velocity samples, and the sliding-window statistic.
///
/// The first pulse of a session only establishes the time baseline; each
/// later pulse records a lap with `duration = interval + raw measurement`
/// (the additive combination is how the sensor reports time, not a bug) and
/// emits an immutable snapshot.
pub struct LapEngine {
    state: EngineState,
    config: MonitorConfig,
    last_pulse_time_ms: Option<u64>,
    laps: Vec<LapRecord>,
    durations: Vec<f64>,
    total_duration_ms: f64,
    velocity_series: Vec<VelocitySample>,
    latest_velocity: Option<VelocitySample>,
    window: WindowStats,
}

impl LapEngine {
    pub fn new(config: MonitorConfig) -> Self {
        let window = WindowStats::new(config.window_laps);
        Self {
            state: EngineState::Idle,
            config,
            last_pulse_time_ms: None,
            laps: Vec::new(),
            durations: Vec::new(),
            total_duration_ms: 0.0,
            velocity_series: Vec::new(),
            latest_velocity: None,
            window,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn lap_count(&self) -> u64 {
        self.laps.len() as u64
    }

    /// Pulses are only recorded while calibrating or recording; anything
    /// arriving outside those states is dropped by the ingestion gate.
    pub fn is_monitoring(&self) -> bool {
        matches!(self.state, EngineState::Calibrating | EngineState::Recording)
    }

    pub fn start(&mut self) {
        match self.state {
            EngineState::Calibrating | EngineState::Recording => {}
            EngineState::Paused if self.last_pulse_time_ms.is_some() => {
                self.state = EngineState::Recording;
                info!("monitoring resumed after {} laps", self.laps.len());
            }
            _ => {
                self.state = EngineState::Calibrating;
                info!("monitoring started, waiting for baseline pulse");
            }
        }
    }

    pub fn stop(&mut self) {
        if self.is_monitoring() {
            self.state = EngineState::Paused;
            info!("monitoring paused after {} laps", self.laps.len());
        }
    }

    /// Clears all accumulated session data. Configuration is untouched.
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.last_pulse_time_ms = None;
        self.laps.clear();
        self.durations.clear();
        self.total_duration_ms = 0.0;
        self.velocity_series.clear();
        self.latest_velocity = None;
        self.window.reset();
        info!("session reset, all lap data cleared");
    }

    pub fn set_window_size(&mut self, window_laps: usize) -> Result<(), MonitorError> {
        if window_laps < 1 {
            return Err(MonitorError::InvalidWindowSize { value: window_laps });
        }
        self.config.window_laps = window_laps;
        self.window.rebuild(&self.durations, window_laps);
        info!("best-combination window set to {} laps", window_laps);
        Ok(())
    }

    pub fn set_constants(&mut self, constants: PhysicalConstants) -> Result<(), MonitorError> {
        constants.validate()?;
        self.config.constants = constants;
        Ok(())
    }

    /// Applies a control command, returning any output sinks should see.
    /// Invalid configuration commands are rejected here and the prior
    /// configuration stays in effect.
    pub fn apply_command(&mut self, command: ControlCommand) -> Option<MonitorOutput> {
        match command {
            ControlCommand::Start => {
                self.start();
                None
            }
            ControlCommand::Stop => {
                self.stop();
                None
            }
            ControlCommand::Reset => {
                self.reset();
                Some(MonitorOutput::SessionReset)
            }
            ControlCommand::SetWindowSize { window_laps } => {
                if let Err(e) = self.set_window_size(window_laps) {
                    warn!("window size change rejected: {}", e);
                }
                None
            }
            ControlCommand::SetConstants { constants } => {
                if let Err(e) = self.set_constants(constants) {
                    warn!("constants change rejected: {}", e);
                }
                None
            }
        }
    }

    /// Feeds one validated pulse through the state machine. Returns None
    /// when the engine is not monitoring.
    pub fn process_pulse(&mut self, pulse: ValidatedPulse) -> Option<MonitorOutput> {
        match self.state {
            EngineState::Idle | EngineState::Paused => None,
            EngineState::Calibrating => {
                // baseline only: no lap record, no snapshot
                self.last_pulse_time_ms = Some(pulse.timestamp_ms);
                self.state = EngineState::Recording;
                info!(
                    "baseline pulse t={} ms received, recording from the next pulse",
                    pulse.value_ms
                );
                Some(MonitorOutput::Baseline {
                    timestamp_ms: pulse.timestamp_ms,
                })
            }
            EngineState::Recording => Some(MonitorOutput::Lap(Box::new(self.record_lap(pulse)))),
        }
    }

    fn record_lap(&mut self, pulse: ValidatedPulse) -> Snapshot {
        // Recording is only reachable after a baseline pulse
        let last = self.last_pulse_time_ms.unwrap_or(pulse.timestamp_ms);
        let interval_ms = pulse.timestamp_ms.saturating_sub(last) as f64;
        self.last_pulse_time_ms = Some(pulse.timestamp_ms);

        let lap_number = self.laps.len() as u64 + 1;
        let duration_ms = interval_ms + pulse.value_ms;
        let record = LapRecord {
            lap_number,
            duration_ms,
            raw_measurement_ms: pulse.value_ms,
            interval_ms,
            timestamp_ms: pulse.timestamp_ms,
        };
        self.total_duration_ms += duration_ms;
        self.durations.push(duration_ms);
        self.laps.push(record);
        debug!("lap {} completed in {:.3} ms", lap_number, duration_ms);

        self.latest_velocity =
            velocity::derive(pulse.value_ms, pulse.timestamp_ms, &self.config.constants);
        match &self.latest_velocity {
            Some(sample) => {
                self.velocity_series.push(sample.clone());
                let cap = self.config.velocity_display_limit;
                if self.velocity_series.len() > cap {
                    self.velocity_series
                        .drain(..self.velocity_series.len() - cap);
                }
            }
            None => debug!(
                "velocity sample for t={} ms discarded, lap kept",
                pulse.value_ms
            ),
        }

        self.window.push(&self.durations);
        self.snapshot()
    }

    pub fn snapshot(&self) -> Snapshot {
        let display_from = self
            .laps
            .len()
            .saturating_sub(self.config.lap_display_limit);
        Snapshot {
            lap_count: self.laps.len() as u64,
            total_duration_ms: self.total_duration_ms,
            latest_lap: self.laps.last().cloned(),
            latest_velocity: self.latest_velocity.clone(),
            laps: self.laps[display_from..].to_vec(),
            velocity_series: self.velocity_series.clone(),
            window: self.window.snapshot(),
        }
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        let (fastest, slowest) = match self
            .durations
            .iter()
            .minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(duration) => (*duration, *duration),
            MinMaxResult::MinMax(min, max) => (*min, *max),
        };
        Some(SessionSummary {
            total_laps: self.laps.len() as u64,
            total_duration_ms: self.total_duration_ms,
            avg_lap_ms: self.total_duration_ms / self.laps.len() as f64,
            fastest_lap_ms: fastest,
            slowest_lap_ms: slowest,
            velocity_points: self.velocity_series.len(),
        })
    }
}
