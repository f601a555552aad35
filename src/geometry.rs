use std::fmt;

use serde::Serialize;

/// A 2D point on the floor-plan pixel grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Perpendicular foot of `p` on the segment `a`-`b`, clamped to the
/// segment. A degenerate segment projects onto its single point.
pub fn project_onto_segment(p: Point, a: Point, b: Point) -> Point {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Point::new(a.x + t * dx, a.y + t * dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
    }

    #[test]
    fn projection_falls_inside_segment() {
        let foot = project_onto_segment(
            Point::new(500.0, 250.0),
            Point::new(245.0, 225.0),
            Point::new(760.0, 225.0),
        );
        assert_eq!(foot, Point::new(500.0, 225.0));
    }

    #[test]
    fn projection_clamps_to_endpoints() {
        let a = Point::new(100.0, 100.0);
        let b = Point::new(200.0, 100.0);
        assert_eq!(project_onto_segment(Point::new(50.0, 90.0), a, b), a);
        assert_eq!(project_onto_segment(Point::new(250.0, 90.0), a, b), b);
    }

    #[test]
    fn degenerate_segment_projects_onto_its_point() {
        let a = Point::new(10.0, 10.0);
        assert_eq!(project_onto_segment(Point::new(99.0, 99.0), a, a), a);
    }
}
