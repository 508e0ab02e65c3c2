use std::time::Duration;

use log::{debug, info};
use tokio::net::UdpSocket;

use crate::errors::MonitorError;

/// Measurement pattern cycled by the generator, milliseconds. Deterministic
/// so end-to-end runs are reproducible.
const PULSE_PATTERN_MS: [f64; 8] = [42.5, 61.0, 38.2, 55.7, 47.1, 69.4, 33.8, 51.3];

/// Sends `count` fake sensor pulses to a relay's UDP ingress, one every
/// `interval_ms` milliseconds.
pub async fn send_mock_pulses(
    target: &str,
    count: usize,
    interval_ms: u64,
) -> Result<(), MonitorError> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| MonitorError::MockSocketError { source: e })?;
    socket
        .connect(target)
        .await
        .map_err(|e| MonitorError::MockSocketError { source: e })?;
    info!(
        "sending {} mock pulses to {} every {} ms",
        count, target, interval_ms
    );

    for i in 0..count {
        let value = PULSE_PATTERN_MS[i % PULSE_PATTERN_MS.len()];
        socket
            .send(format!("{value}").as_bytes())
            .await
            .map_err(|e| MonitorError::MockSocketError { source: e })?;
        debug!("mock pulse {} of {}: {} ms", i + 1, count, value);
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
    Ok(())
}
