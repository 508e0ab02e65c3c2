use super::{PhysicalConstants, VelocitySample};

/// Derives a velocity sample from one raw measurement.
///
/// `v1 = L / t` over the calibration length, `v2 = v1 * R2 / R1` scaled by
/// the wheel radius ratio. Returns None when either value is NaN or
/// non-finite so a poisoned number never reaches aggregates or charts.
pub fn derive(
    raw_measurement_ms: f64,
    timestamp_ms: u64,
    constants: &PhysicalConstants,
) -> Option<VelocitySample> {
    let v1 = constants.l_mm / raw_measurement_ms;
    let v2 = v1 * constants.r2 / constants.r1;
    if !v1.is_finite() || !v2.is_finite() {
        return None;
    }
    Some(VelocitySample {
        timestamp_ms,
        raw_measurement_ms,
        v1_mps: v1,
        v2_mps: v2,
    })
}
