//! Mode dispatch and the per-session smoothing pipeline.
//!
//! Raw estimates jump around with every multipath flutter. The pipeline
//! tames them in a fixed order: jitter gate, speed clamp, adaptive EMA,
//! jitter-buffer averaging, and finally snap-to-route when the session is
//! navigating. Navigation mode trades smoothness for responsiveness so the
//! marker keeps up with a walking user.

use std::{collections::VecDeque, sync::Arc};

use crate::{
    constants::{
        HYBRID_TRILATERATION_CONFIDENCE, JITTER_BUFFER_SIZE, MAX_SPEED_PX_S, MIN_DELTA_T_S, Mode,
        MOVEMENT_SPEED_THRESHOLD_PX_S,
    },
    error::PipelineError,
    geometry::Point,
    map::MapRegistry,
    positioning::{
        PositioningResult, RssiReading, proximity, resolve_readings, trilateration,
    },
    routing::snap::snap_to_route,
};

/// Per-session smoothing state. Exclusively owned by the session that
/// created it.
#[derive(Debug, Default)]
pub struct PositionFilter {
    last: Option<Point>,
    last_update_ms: i64,
    jitter: VecDeque<Point>,
}

impl PositionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_location(&self) -> Option<Point> {
        self.last
    }

    fn buffered_mean(&self) -> Option<Point> {
        if self.jitter.is_empty() {
            return None;
        }
        let n = self.jitter.len() as f64;
        let (sx, sy) = self
            .jitter
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }

    fn push_jitter(&mut self, p: Point) {
        if self.jitter.len() == JITTER_BUFFER_SIZE {
            self.jitter.pop_front();
        }
        self.jitter.push_back(p);
    }
}

/// Smoothing parameters differ between free roaming and active navigation.
#[derive(Debug, Clone, Copy)]
struct SmoothingProfile {
    alpha_moving: f64,
    alpha_static: f64,
    min_move_px: f64,
    use_jitter_buffer: bool,
}

impl SmoothingProfile {
    fn select(navigation: bool) -> Self {
        if navigation {
            SmoothingProfile {
                alpha_moving: 0.75,
                alpha_static: 0.35,
                min_move_px: 4.0,
                use_jitter_buffer: false,
            }
        } else {
            SmoothingProfile {
                alpha_moving: 0.50,
                alpha_static: 0.15,
                min_move_px: 6.0,
                use_jitter_buffer: true,
            }
        }
    }
}

/// The pipeline's answer for one location request.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Result whose location is the emitted (possibly snapped) position.
    pub result: PositioningResult,
    /// Smoothed position before snap-to-route; route planning starts here.
    pub fresh: Point,
    pub snapped: bool,
}

pub struct Orchestrator {
    registry: Arc<MapRegistry>,
}

impl Orchestrator {
    pub fn new(registry: Arc<MapRegistry>) -> Self {
        Orchestrator { registry }
    }

    /// Run estimation, smoothing and snap for one request.
    ///
    /// `route` is the session's currently active route, used for snapping;
    /// `navigation` switches the smoothing profile. `now_ms` is passed in
    /// so the filter state stays deterministic under test.
    pub fn calculate(
        &self,
        readings: &[RssiReading],
        mode: Mode,
        filter: &mut PositionFilter,
        navigation: bool,
        route: Option<&[Point]>,
        now_ms: i64,
    ) -> Result<PipelineOutput, PipelineError> {
        let raw = self.dispatch(readings, mode)?;

        let (fresh, advanced) = smooth(filter, raw.location, now_ms, navigation);

        let snap = route
            .filter(|route| route.len() >= 2)
            .and_then(|route| snap_to_route(fresh, route));
        let snapped = snap.is_some();
        let emitted = snap.unwrap_or(fresh);

        if advanced {
            filter.last = Some(emitted);
            filter.last_update_ms = now_ms;
        }

        Ok(PipelineOutput {
            result: PositioningResult {
                location: emitted,
                ..raw
            },
            fresh,
            snapped,
        })
    }

    fn dispatch(
        &self,
        readings: &[RssiReading],
        mode: Mode,
    ) -> Result<PositioningResult, PipelineError> {
        match mode {
            Mode::Proximity => proximity::proximity(&self.registry, readings),
            Mode::Weighted => proximity::weighted_proximity(&self.registry, readings),
            Mode::Trilateration => trilateration::trilaterate(&self.registry, readings)
                .or_else(|error| {
                    if error.is_recoverable() {
                        proximity::weighted_proximity(&self.registry, readings)
                    } else {
                        Err(error)
                    }
                }),
            Mode::Hybrid => self.dispatch_hybrid(readings),
        }
    }

    fn dispatch_hybrid(&self, readings: &[RssiReading]) -> Result<PositioningResult, PipelineError> {
        let usable = resolve_readings(&self.registry, readings).len();
        match usable {
            0 => {
                if readings.is_empty() {
                    Err(PipelineError::InsufficientInput)
                } else {
                    Err(PipelineError::UnresolvableBeacons)
                }
            }
            1 => proximity::proximity(&self.registry, readings),
            2 => proximity::weighted_proximity(&self.registry, readings),
            _ => match trilateration::trilaterate(&self.registry, readings) {
                Ok(result) if result.confidence > HYBRID_TRILATERATION_CONFIDENCE => Ok(result),
                Ok(_) => proximity::weighted_proximity(&self.registry, readings),
                Err(error) if error.is_recoverable() => {
                    proximity::weighted_proximity(&self.registry, readings)
                }
                Err(error) => Err(error),
            },
        }
    }
}

/// Steps 1-6 of the smoothing pipeline. Returns the smoothed point and
/// whether the filter state may advance; a jitter-gated request holds the
/// previous state.
fn smooth(
    filter: &mut PositionFilter,
    raw: Point,
    now_ms: i64,
    navigation: bool,
) -> (Point, bool) {
    let profile = SmoothingProfile::select(navigation);

    let last = match filter.last {
        // First fix: nothing to smooth against.
        None => return (raw, true),
        Some(last) => last,
    };

    let dt = (((now_ms - filter.last_update_ms) as f64) / 1000.0).max(MIN_DELTA_T_S);
    let delta = raw.distance_to(&last);
    let speed = delta / dt;

    // Sub-threshold movement is indistinguishable from multipath jitter;
    // hold the previous position instead of wobbling.
    if delta < profile.min_move_px {
        let held = if profile.use_jitter_buffer {
            filter.buffered_mean().unwrap_or(last)
        } else {
            last
        };
        return (held, false);
    }

    // A step faster than a person can walk is radio noise; keep the
    // direction but cap the magnitude.
    let target = if speed > MAX_SPEED_PX_S {
        let scale = MAX_SPEED_PX_S * dt / delta;
        Point::new(last.x + (raw.x - last.x) * scale, last.y + (raw.y - last.y) * scale)
    } else {
        raw
    };

    let alpha = if speed > MOVEMENT_SPEED_THRESHOLD_PX_S {
        profile.alpha_moving
    } else {
        profile.alpha_static
    };
    let smoothed = Point::new(
        alpha * target.x + (1.0 - alpha) * last.x,
        alpha * target.y + (1.0 - alpha) * last.y,
    );

    if profile.use_jitter_buffer {
        filter.push_jitter(smoothed);
        let final_point = filter.buffered_mean().unwrap_or(smoothed);
        (final_point, true)
    } else {
        filter.jitter.clear();
        (smoothed, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positioning::reading;

    fn registry() -> Arc<MapRegistry> {
        Arc::new(
            MapRegistry::from_records(vec![
                (
                    "08:92:72:87:9C:72".to_string(),
                    789.0,
                    184.0,
                    "157".to_string(),
                ),
                (
                    "08:92:72:87:8D:D6".to_string(),
                    232.0,
                    185.0,
                    "167".to_string(),
                ),
                (
                    "08:92:72:87:8F:3B".to_string(),
                    400.0,
                    200.0,
                    "165".to_string(),
                ),
                (
                    "08:92:72:87:91:77".to_string(),
                    600.0,
                    200.0,
                    "161".to_string(),
                ),
                (
                    "08:92:72:87:90:5C".to_string(),
                    500.0,
                    260.0,
                    "150".to_string(),
                ),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn hybrid_uses_proximity_for_a_single_beacon() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let out = orchestrator
            .calculate(
                &[reading("08:92:72:87:9C:72", -55)],
                Mode::Hybrid,
                &mut filter,
                false,
                None,
                1_000,
            )
            .unwrap();
        assert_eq!(out.result.mode, Mode::Proximity);
        assert_eq!(out.result.location, Point::new(789.0, 184.0));
    }

    #[test]
    fn hybrid_uses_weighted_for_two_beacons() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let out = orchestrator
            .calculate(
                &[
                    reading("08:92:72:87:8D:D6", -60),
                    reading("08:92:72:87:9C:72", -70),
                ],
                Mode::Hybrid,
                &mut filter,
                false,
                None,
                1_000,
            )
            .unwrap();
        assert_eq!(out.result.mode, Mode::Weighted);
    }

    #[test]
    fn hybrid_trilaterates_three_strong_beacons() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let out = orchestrator
            .calculate(
                &[
                    reading("08:92:72:87:8F:3B", -55),
                    reading("08:92:72:87:91:77", -60),
                    reading("08:92:72:87:90:5C", -58),
                ],
                Mode::Hybrid,
                &mut filter,
                false,
                None,
                1_000,
            )
            .unwrap();
        assert_eq!(out.result.mode, Mode::Trilateration);
        assert!(out.result.confidence > HYBRID_TRILATERATION_CONFIDENCE);
    }

    #[test]
    fn first_fix_passes_through_unsmoothed() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let out = orchestrator
            .calculate(
                &[reading("08:92:72:87:9C:72", -55)],
                Mode::Proximity,
                &mut filter,
                false,
                None,
                1_000,
            )
            .unwrap();
        assert_eq!(out.result.location, Point::new(789.0, 184.0));
        assert_eq!(filter.last_location(), Some(Point::new(789.0, 184.0)));
    }

    #[test]
    fn identical_requests_converge_to_a_fixed_point() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let readings = [reading("08:92:72:87:9C:72", -55)];

        let first = orchestrator
            .calculate(&readings, Mode::Proximity, &mut filter, false, None, 1_000)
            .unwrap();
        let second = orchestrator
            .calculate(&readings, Mode::Proximity, &mut filter, false, None, 1_000)
            .unwrap();
        let third = orchestrator
            .calculate(&readings, Mode::Proximity, &mut filter, false, None, 1_000)
            .unwrap();

        assert_eq!(first.result.location, second.result.location);
        assert_eq!(second.result.location, third.result.location);
    }

    #[test]
    fn speed_clamp_bounds_the_emitted_step() {
        let mut filter = PositionFilter::new();
        filter.last = Some(Point::new(0.0, 0.0));
        filter.last_update_ms = 0;

        let (smoothed, advanced) = smooth(&mut filter, Point::new(1000.0, 0.0), 1_000, false);
        assert!(advanced);
        // dt = 1s, step capped at 90 px, then EMA halves it and the jitter
        // buffer holds only this sample.
        assert!(smoothed.x <= MAX_SPEED_PX_S + 1e-9, "got {}", smoothed.x);
        assert_eq!(smoothed.y, 0.0);
    }

    #[test]
    fn jitter_gate_holds_position_without_advancing_state() {
        let mut filter = PositionFilter::new();
        filter.last = Some(Point::new(500.0, 225.0));
        filter.last_update_ms = 1_000;

        let (held, advanced) = smooth(&mut filter, Point::new(502.0, 225.0), 2_000, false);
        assert!(!advanced);
        assert_eq!(held, Point::new(500.0, 225.0));
        assert_eq!(filter.last_update_ms, 1_000);
    }

    #[test]
    fn navigation_mode_skips_the_jitter_buffer() {
        let mut filter = PositionFilter::new();
        filter.last = Some(Point::new(500.0, 225.0));
        filter.last_update_ms = 0;
        filter.push_jitter(Point::new(490.0, 225.0));

        let (smoothed, advanced) = smooth(&mut filter, Point::new(530.0, 225.0), 1_000, true);
        assert!(advanced);
        assert!(filter.jitter.is_empty());
        // speed 30 px/s > movement threshold: alpha 0.75.
        assert!((smoothed.x - 522.5).abs() < 1e-9);
    }

    #[test]
    fn active_route_snaps_the_emitted_position() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let route = vec![Point::new(245.0, 225.0), Point::new(760.0, 225.0)];

        // Readings put the centroid near (500, 250); the first fix passes
        // through smoothing untouched and then snaps onto the route.
        let out = orchestrator
            .calculate(
                &[
                    reading("08:92:72:87:8F:3B", -60),
                    reading("08:92:72:87:90:5C", -55),
                ],
                Mode::Weighted,
                &mut filter,
                true,
                Some(&route),
                1_000,
            )
            .unwrap();

        assert!(out.snapped);
        assert_eq!(out.result.location.y, 225.0);
        assert!(out.fresh.y > 225.0);
        // The committed state is the emitted, snapped position.
        assert_eq!(filter.last_location(), Some(out.result.location));
    }

    #[test]
    fn trilateration_mode_falls_back_to_weighted_on_low_confidence() {
        // Clustered, weak anchors solve but score below the confidence
        // floor; the dispatcher degrades to the weighted centroid.
        let registry = Arc::new(
            MapRegistry::from_records(vec![
                (
                    "44:44:44:44:44:01".to_string(),
                    500.0,
                    220.0,
                    "150".to_string(),
                ),
                (
                    "44:44:44:44:44:02".to_string(),
                    505.0,
                    225.0,
                    "150".to_string(),
                ),
                (
                    "44:44:44:44:44:03".to_string(),
                    510.0,
                    220.0,
                    "150".to_string(),
                ),
            ])
            .unwrap(),
        );
        let orchestrator = Orchestrator::new(registry);
        let mut filter = PositionFilter::new();
        let out = orchestrator
            .calculate(
                &[
                    reading("44:44:44:44:44:01", -88),
                    reading("44:44:44:44:44:02", -89),
                    reading("44:44:44:44:44:03", -88),
                ],
                Mode::Trilateration,
                &mut filter,
                false,
                None,
                1_000,
            )
            .unwrap();
        assert_eq!(out.result.mode, Mode::Weighted);
    }

    #[test]
    fn explicit_trilateration_with_too_few_readings_is_an_error() {
        // Two usable readings cannot trilaterate; an explicit request must
        // surface the failure instead of silently degrading.
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let result = orchestrator.calculate(
            &[
                reading("08:92:72:87:8F:3B", -62),
                reading("08:92:72:87:91:77", -64),
            ],
            Mode::Trilateration,
            &mut filter,
            false,
            None,
            1_000,
        );
        assert!(matches!(result, Err(PipelineError::InsufficientInput)));
        assert_eq!(filter.last_location(), None);
    }

    #[test]
    fn explicit_trilateration_with_unknown_beacons_is_an_error() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let result = orchestrator.calculate(
            &[
                reading("AA:AA:AA:AA:AA:01", -55),
                reading("AA:AA:AA:AA:AA:02", -60),
                reading("AA:AA:AA:AA:AA:03", -58),
            ],
            Mode::Trilateration,
            &mut filter,
            false,
            None,
            1_000,
        );
        assert!(matches!(result, Err(PipelineError::UnresolvableBeacons)));
    }

    #[test]
    fn a_navigation_walk_stays_on_route_and_under_the_speed_limit() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let route = vec![Point::new(245.0, 225.0), Point::new(1550.0, 225.0)];

        // Walk east past three beacons, one fix per second.
        let legs: [(&str, i64); 3] = [
            ("08:92:72:87:8F:3B", 1_000),
            ("08:92:72:87:91:77", 2_000),
            ("08:92:72:87:9C:72", 3_000),
        ];

        let mut previous: Option<(Point, i64)> = None;
        for (beacon, now_ms) in legs {
            let out = orchestrator
                .calculate(
                    &[reading(beacon, -55)],
                    Mode::Proximity,
                    &mut filter,
                    true,
                    Some(&route),
                    now_ms,
                )
                .unwrap();

            assert!(out.snapped);
            assert_eq!(out.result.location.y, 225.0);
            if let Some((last, last_ms)) = previous {
                let dt = (now_ms - last_ms) as f64 / 1000.0;
                let speed = out.result.location.distance_to(&last) / dt;
                assert!(speed <= MAX_SPEED_PX_S + 1e-9, "speed {speed}");
            }
            previous = Some((out.result.location, now_ms));
        }
    }

    #[test]
    fn errors_leave_filter_state_untouched() {
        let orchestrator = Orchestrator::new(registry());
        let mut filter = PositionFilter::new();
        let result = orchestrator.calculate(&[], Mode::Hybrid, &mut filter, false, None, 1_000);
        assert!(matches!(result, Err(PipelineError::InsufficientInput)));
        assert_eq!(filter.last_location(), None);
    }
}
