//! RSSI to distance conversion.
//!
//! Log-distance path-loss model with a piecewise-adaptive exponent: near
//! readings see mostly free air, far readings have passed through more
//! walls and furniture, so the exponent grows as the signal weakens.
//!
//! Below the far threshold the curve is anchored at the threshold's ranged
//! value and the steeper exponent applies to the remaining signal drop.
//! Re-evaluating the whole formula with the jumped exponent would make a
//! weaker signal range *shorter* right at the threshold; the estimate must
//! stay continuous and monotone non-increasing in RSSI.

use crate::constants::{
    BASE_PATH_LOSS_EXPONENT, FAR_RSSI, MAX_DISTANCE_M, MIN_DISTANCE_M, NEAR_RSSI,
    RANGING_CALIBRATION, TX_POWER_DBM,
};

pub fn path_loss_exponent(rssi: i32) -> f64 {
    let rssi = rssi as f64;
    if rssi >= NEAR_RSSI {
        BASE_PATH_LOSS_EXPONENT
    } else if rssi >= FAR_RSSI {
        BASE_PATH_LOSS_EXPONENT + 0.5 * (NEAR_RSSI - rssi) / (NEAR_RSSI - FAR_RSSI)
    } else {
        BASE_PATH_LOSS_EXPONENT + 0.8
    }
}

/// Estimated distance in metres, clamped to the usable beacon range.
pub fn distance_meters(rssi: i32) -> f64 {
    let n = path_loss_exponent(rssi);
    let rssi = rssi as f64;
    let distance = if rssi >= FAR_RSSI {
        RANGING_CALIBRATION * 10_f64.powf((TX_POWER_DBM - rssi) / (10.0 * n))
    } else {
        // n is the far exponent here; it governs only the drop below the
        // threshold, on top of the distance ranged at the threshold itself.
        let at_far = RANGING_CALIBRATION
            * 10_f64.powf((TX_POWER_DBM - FAR_RSSI) / (10.0 * (BASE_PATH_LOSS_EXPONENT + 0.5)));
        at_far * 10_f64.powf((FAR_RSSI - rssi) / (10.0 * n))
    };
    distance.clamp(MIN_DISTANCE_M, MAX_DISTANCE_M)
}
