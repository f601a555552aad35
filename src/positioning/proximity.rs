//! Single-beacon and weighted-centroid estimators.

use crate::{
    constants::Mode,
    error::PipelineError,
    geometry::Point,
    map::MapRegistry,
    positioning::{PositioningResult, RangedReading, RssiReading, corridor, resolve_readings},
};

fn signal_factor(rssi: i32) -> f64 {
    ((rssi as f64 + 100.0) / 50.0).clamp(0.0, 1.0)
}

fn strongest<'a, 'b>(readings: &'b [RangedReading<'a>]) -> &'b RangedReading<'a> {
    readings
        .iter()
        .max_by_key(|reading| reading.rssi)
        .expect("estimators are only called with at least one ranged reading")
}

fn check_input(
    readings: &[RssiReading],
    resolved: &[RangedReading<'_>],
) -> Result<(), PipelineError> {
    if readings.is_empty() {
        return Err(PipelineError::InsufficientInput);
    }
    if resolved.is_empty() {
        return Err(PipelineError::UnresolvableBeacons);
    }
    Ok(())
}

/// The strongest resolvable beacon's coordinates are taken as the user's
/// position.
pub fn proximity(
    registry: &MapRegistry,
    readings: &[RssiReading],
) -> Result<PositioningResult, PipelineError> {
    let resolved = resolve_readings(registry, readings);
    check_input(readings, &resolved)?;

    let best = strongest(&resolved);
    Ok(PositioningResult {
        location: best.beacon.location(),
        mode: Mode::Proximity,
        confidence: signal_factor(best.rssi).max(0.05),
        nearest_beacon: Some(best.beacon.mac.clone()),
        nearest_room: Some(registry.room_for(&best.beacon.mac)),
        estimated_distance_m: best.distance_m,
    })
}

/// Centroid of the resolvable beacons, weighted by signal strength and
/// pulled back into the walkable region. The strongest beacon is still
/// reported as auxiliary information.
pub fn weighted_proximity(
    registry: &MapRegistry,
    readings: &[RssiReading],
) -> Result<PositioningResult, PipelineError> {
    let resolved = resolve_readings(registry, readings);
    check_input(readings, &resolved)?;

    let mut x_weighted = 0.0;
    let mut y_weighted = 0.0;
    let mut weight_sum = 0.0;
    for reading in &resolved {
        let weight = 10_f64.powf((reading.rssi as f64 + 100.0) / 20.0);
        x_weighted += reading.beacon.x * weight;
        y_weighted += reading.beacon.y * weight;
        weight_sum += weight;
    }

    let centroid = Point::new(x_weighted / weight_sum, y_weighted / weight_sum);
    let location = corridor::apply_soft_constraint(centroid);

    let best = strongest(&resolved);
    let beacon_factor = (resolved.len() as f64 / 4.0).min(1.0);
    let confidence = (0.4 * beacon_factor + 0.6 * signal_factor(best.rssi)).max(0.05);

    Ok(PositioningResult {
        location,
        mode: Mode::Weighted,
        confidence,
        nearest_beacon: Some(best.beacon.mac.clone()),
        nearest_room: Some(registry.room_for(&best.beacon.mac)),
        estimated_distance_m: best.distance_m,
    })
}
