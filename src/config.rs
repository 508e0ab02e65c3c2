use log::warn;
use serde::{Deserialize, Serialize};

use crate::engine::{MonitorConfig, PhysicalConstants};
use crate::errors::MonitorError;

const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:8080";
pub const DEFAULT_UDP_ADDR: &str = "0.0.0.0:8888";
pub const DEFAULT_WS_ADDR: &str = "0.0.0.0:8080";

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct AppConfig {
    /// Relay endpoint the live dashboard connects to
    pub relay_url: String,
    /// UDP address the relay listens on for sensor datagrams
    pub udp_bind_addr: String,
    /// TCP address the relay serves WebSocket dashboards on
    pub ws_bind_addr: String,
    pub window_laps: usize,
    pub lap_display_limit: usize,
    pub velocity_display_limit: usize,
    pub constants: PhysicalConstants,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            udp_bind_addr: DEFAULT_UDP_ADDR.to_string(),
            ws_bind_addr: DEFAULT_WS_ADDR.to_string(),
            window_laps: 3,
            lap_display_limit: 1000,
            velocity_display_limit: 100,
            constants: PhysicalConstants::default(),
        }
    }
}

impl AppConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join("lapmeter").join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return None;
        }
        let file = std::fs::File::open(&config_path).ok()?;
        match serde_json::from_reader(file) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(
                    "could not parse config file {:?}, using defaults: {}",
                    config_path, e
                );
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), MonitorError> {
        let config_path = dirs::config_dir()
            .ok_or(MonitorError::NoConfigDir)?
            .join("lapmeter")
            .join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            std::fs::create_dir_all(config_path.parent().unwrap())
                .map_err(|e| MonitorError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| MonitorError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self).map_err(|e| MonitorError::ConfigSerializeError { source: e })
    }

    /// The engine-facing slice of the configuration.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            window_laps: self.window_laps,
            lap_display_limit: self.lap_display_limit,
            velocity_display_limit: self.velocity_display_limit,
            constants: self.constants.clone(),
        }
    }
}
