//! Projection of a position estimate onto the active route.

use crate::{
    constants::SNAP_TO_ROUTE_THRESHOLD_PX,
    geometry::{Point, project_onto_segment},
};

/// Nearest point of the route polyline, if the estimate is close enough to
/// plausibly be on it. Beyond the threshold the user is considered
/// off-route and the estimate passes through untouched.
pub fn snap_to_route(p: Point, route: &[Point]) -> Option<Point> {
    if route.len() < 2 {
        return None;
    }

    let mut best: Option<(Point, f64)> = None;
    for segment in route.windows(2) {
        let foot = project_onto_segment(p, segment[0], segment[1]);
        let distance = p.distance_to(&foot);
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((foot, distance));
        }
    }

    best.filter(|(_, distance)| *distance <= SNAP_TO_ROUTE_THRESHOLD_PX)
        .map(|(foot, _)| foot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Vec<Point> {
        vec![
            Point::new(245.0, 225.0),
            Point::new(760.0, 225.0),
            Point::new(760.0, 400.0),
        ]
    }

    #[test]
    fn nearby_point_snaps_onto_the_segment() {
        let snapped = snap_to_route(Point::new(500.0, 250.0), &route()).unwrap();
        assert_eq!(snapped, Point::new(500.0, 225.0));
    }

    #[test]
    fn snap_picks_the_closest_segment() {
        let snapped = snap_to_route(Point::new(750.0, 350.0), &route()).unwrap();
        assert_eq!(snapped, Point::new(760.0, 350.0));
    }

    #[test]
    fn distant_point_is_off_route() {
        assert!(snap_to_route(Point::new(500.0, 300.0), &route()).is_none());
    }

    #[test]
    fn snapped_point_is_never_farther_than_the_threshold() {
        let samples = [
            Point::new(245.0, 200.0),
            Point::new(300.0, 270.0),
            Point::new(760.0, 225.0),
            Point::new(800.0, 390.0),
        ];
        for p in samples {
            if let Some(s) = snap_to_route(p, &route()) {
                assert!(p.distance_to(&s) <= SNAP_TO_ROUTE_THRESHOLD_PX);
            }
        }
    }

    #[test]
    fn short_routes_never_snap() {
        assert!(snap_to_route(Point::new(500.0, 225.0), &[]).is_none());
        assert!(snap_to_route(Point::new(500.0, 225.0), &[Point::new(500.0, 226.0)]).is_none());
    }
}
