pub mod corridor;
pub mod orchestrator;
pub mod proximity;
pub mod ranging;
pub mod trilateration;

use crate::{
    constants::{MIN_VALID_RSSI, Mode},
    geometry::Point,
    map::{Beacon, MapRegistry},
};

/// A single beacon observation as reported by the client.
#[derive(Debug, Clone)]
pub struct RssiReading {
    pub beacon_id: String,
    pub rssi: i32,
}

/// A reading resolved against the registry and converted to a distance.
#[derive(Debug, Clone)]
pub struct RangedReading<'a> {
    pub beacon: &'a Beacon,
    pub rssi: i32,
    pub distance_m: f64,
}

/// Output of one estimator run. Estimators return `Err` instead of an
/// invalid result, so a `PositioningResult` always carries a real location
/// with positive confidence.
#[derive(Debug, Clone)]
pub struct PositioningResult {
    pub location: Point,
    pub mode: Mode,
    pub confidence: f64,
    pub nearest_beacon: Option<String>,
    pub nearest_room: Option<String>,
    pub estimated_distance_m: f64,
}

/// Drop readings that are too weak or name no known beacon, and range the
/// survivors.
pub(crate) fn resolve_readings<'a>(
    registry: &'a MapRegistry,
    readings: &[RssiReading],
) -> Vec<RangedReading<'a>> {
    readings
        .iter()
        .filter(|reading| reading.rssi >= MIN_VALID_RSSI)
        .filter_map(|reading| {
            registry.resolve(&reading.beacon_id).map(|beacon| RangedReading {
                beacon,
                rssi: reading.rssi,
                distance_m: ranging::distance_meters(reading.rssi),
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn reading(beacon_id: &str, rssi: i32) -> RssiReading {
    RssiReading {
        beacon_id: beacon_id.to_string(),
        rssi,
    }
}
