//! RSSI-weighted nonlinear least-squares position solver.
//!
//! Ranged circles from indoor RSSI rarely intersect cleanly, so instead of
//! a closed-form three-circle solution the estimator minimizes the weighted
//! squared range residuals by gradient descent, seeded with a weighted
//! centroid and run with an adaptive learning rate. Strong beacons carry
//! exponentially more weight than weak ones.

use crate::{
    constants::{
        CONVERGENCE_STEP_PX, INITIAL_LEARNING_RATE, MAX_SOLVER_BEACONS, MAX_SOLVER_ITERATIONS,
        MIN_TRILATERATION_CONFIDENCE, Mode, PIXELS_PER_METER,
    },
    error::PipelineError,
    geometry::Point,
    map::MapRegistry,
    positioning::{PositioningResult, RangedReading, RssiReading, corridor, resolve_readings},
};

pub fn trilaterate(
    registry: &MapRegistry,
    readings: &[RssiReading],
) -> Result<PositioningResult, PipelineError> {
    if readings.is_empty() {
        return Err(PipelineError::InsufficientInput);
    }

    let mut resolved = resolve_readings(registry, readings);
    if resolved.is_empty() {
        return Err(PipelineError::UnresolvableBeacons);
    }
    if resolved.len() < 3 {
        return Err(PipelineError::InsufficientInput);
    }

    resolved.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    let used = &resolved[..resolved.len().min(MAX_SOLVER_BEACONS)];

    let location = corridor::apply_soft_constraint(solve(used, seed(used)));

    let confidence = confidence(used);
    if confidence <= MIN_TRILATERATION_CONFIDENCE {
        return Err(PipelineError::LowConfidence(confidence));
    }

    let best = used
        .iter()
        .max_by_key(|reading| reading.rssi)
        .ok_or_else(|| PipelineError::Internal("empty solver input".to_string()))?;

    Ok(PositioningResult {
        location,
        mode: Mode::Trilateration,
        confidence,
        nearest_beacon: Some(best.beacon.mac.clone()),
        nearest_room: Some(registry.room_for(&best.beacon.mac)),
        estimated_distance_m: best.distance_m,
    })
}

/// Weighted-centroid starting point: strong and near beacons dominate.
fn seed(readings: &[RangedReading<'_>]) -> Point {
    let mut x = 0.0;
    let mut y = 0.0;
    let mut weight_sum = 0.0;
    for reading in readings {
        let weight = 10_f64.powf((reading.rssi as f64 + 100.0) / 30.0)
            / reading.distance_m.max(0.5).powi(2);
        x += reading.beacon.x * weight;
        y += reading.beacon.y * weight;
        weight_sum += weight;
    }
    Point::new(x / weight_sum, y / weight_sum)
}

fn solve(readings: &[RangedReading<'_>], seed: Point) -> Point {
    let mut p = seed;
    let mut learning_rate = INITIAL_LEARNING_RATE;
    let mut previous_rss = f64::INFINITY;

    for _ in 0..MAX_SOLVER_ITERATIONS {
        let mut gradient_x = 0.0;
        let mut gradient_y = 0.0;
        let mut weight_sum = 0.0;
        let mut rss = 0.0;

        for reading in readings {
            let expected_px = reading.distance_m * PIXELS_PER_METER;
            // Floor the actual distance so the direction term stays finite
            // when the estimate sits on top of a beacon.
            let actual_px = p.distance_to(&reading.beacon.location()).max(1.0);
            let residual = actual_px - expected_px;
            let weight = 10_f64.powf((reading.rssi as f64 + 90.0) / 25.0);

            rss += weight * residual * residual;
            gradient_x += weight * residual * (p.x - reading.beacon.x) / actual_px;
            gradient_y += weight * residual * (p.y - reading.beacon.y) / actual_px;
            weight_sum += weight;
        }

        gradient_x /= weight_sum;
        gradient_y /= weight_sum;

        if rss > previous_rss {
            learning_rate *= 0.5;
        } else if rss < previous_rss * 0.9 {
            learning_rate = (learning_rate * 1.1).min(1.0);
        }
        previous_rss = rss;

        let step_x = learning_rate * gradient_x;
        let step_y = learning_rate * gradient_y;
        p = Point::new(p.x - step_x, p.y - step_y);

        if step_x.hypot(step_y) < CONVERGENCE_STEP_PX {
            break;
        }
    }

    p
}

/// Blend of beacon count, strongest signal and geometric spread of the
/// anchors. Three well-spread strong beacons already score high; many weak
/// clustered ones do not.
fn confidence(readings: &[RangedReading<'_>]) -> f64 {
    let beacon_factor = (readings.len() as f64 / 5.0).min(1.0);

    let strongest = readings
        .iter()
        .map(|reading| reading.rssi)
        .max()
        .unwrap_or(i32::MIN);
    let signal_factor = ((strongest as f64 + 100.0) / 50.0).clamp(0.0, 1.0);

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for reading in readings {
        min_x = min_x.min(reading.beacon.x);
        min_y = min_y.min(reading.beacon.y);
        max_x = max_x.max(reading.beacon.x);
        max_y = max_y.max(reading.beacon.y);
    }
    let diagonal = (max_x - min_x).hypot(max_y - min_y);
    let spread_factor = (diagonal / 200.0).min(1.0);

    0.3 * beacon_factor + 0.4 * signal_factor + 0.3 * spread_factor
}
